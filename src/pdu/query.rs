//! query_sm, cancel_sm and replace_sm bodies.

use bytes::{BufMut, BytesMut};

use super::{get_cstr, get_u8, put_cstr, BodyError, EncodeError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySm {
    pub message_id: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
}

impl QuerySm {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "message_id", &self.message_id, 64)?;
        buf.put_u8(self.source_addr_ton);
        buf.put_u8(self.source_addr_npi);
        put_cstr(buf, "source_addr", &self.source_addr, 20)
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            message_id: get_cstr(buf, "message_id")?,
            source_addr_ton: get_u8(buf, "source_addr_ton")?,
            source_addr_npi: get_u8(buf, "source_addr_npi")?,
            source_addr: get_cstr(buf, "source_addr")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySmResp {
    pub message_id: String,
    pub final_date: String,
    pub message_state: u8,
    pub error_code: u8,
}

impl QuerySmResp {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "message_id", &self.message_id, 64)?;
        put_cstr(buf, "final_date", &self.final_date, 16)?;
        buf.put_u8(self.message_state);
        buf.put_u8(self.error_code);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            message_id: get_cstr(buf, "message_id")?,
            final_date: get_cstr(buf, "final_date")?,
            message_state: get_u8(buf, "message_state")?,
            error_code: get_u8(buf, "error_code")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelSm {
    pub service_type: String,
    pub message_id: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub dest_addr_ton: u8,
    pub dest_addr_npi: u8,
    pub dest_addr: String,
}

impl CancelSm {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "service_type", &self.service_type, 5)?;
        put_cstr(buf, "message_id", &self.message_id, 64)?;
        buf.put_u8(self.source_addr_ton);
        buf.put_u8(self.source_addr_npi);
        put_cstr(buf, "source_addr", &self.source_addr, 20)?;
        buf.put_u8(self.dest_addr_ton);
        buf.put_u8(self.dest_addr_npi);
        put_cstr(buf, "destination_addr", &self.dest_addr, 20)
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            service_type: get_cstr(buf, "service_type")?,
            message_id: get_cstr(buf, "message_id")?,
            source_addr_ton: get_u8(buf, "source_addr_ton")?,
            source_addr_npi: get_u8(buf, "source_addr_npi")?,
            source_addr: get_cstr(buf, "source_addr")?,
            dest_addr_ton: get_u8(buf, "dest_addr_ton")?,
            dest_addr_npi: get_u8(buf, "dest_addr_npi")?,
            dest_addr: get_cstr(buf, "destination_addr")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaceSm {
    pub message_id: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Vec<u8>,
}

impl ReplaceSm {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "message_id", &self.message_id, 64)?;
        buf.put_u8(self.source_addr_ton);
        buf.put_u8(self.source_addr_npi);
        put_cstr(buf, "source_addr", &self.source_addr, 20)?;
        put_cstr(buf, "schedule_delivery_time", &self.schedule_delivery_time, 16)?;
        put_cstr(buf, "validity_period", &self.validity_period, 16)?;
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.sm_default_msg_id);
        if self.short_message.len() > 254 {
            return Err(EncodeError::MessageTooLong {
                max: 254,
                actual: self.short_message.len(),
            });
        }
        buf.put_u8(self.short_message.len() as u8);
        buf.put_slice(&self.short_message);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        let message_id = get_cstr(buf, "message_id")?;
        let source_addr_ton = get_u8(buf, "source_addr_ton")?;
        let source_addr_npi = get_u8(buf, "source_addr_npi")?;
        let source_addr = get_cstr(buf, "source_addr")?;
        let schedule_delivery_time = get_cstr(buf, "schedule_delivery_time")?;
        let validity_period = get_cstr(buf, "validity_period")?;
        let registered_delivery = get_u8(buf, "registered_delivery")?;
        let sm_default_msg_id = get_u8(buf, "sm_default_msg_id")?;
        let len = get_u8(buf, "sm_length")? as usize;
        if buf.len() < len {
            return Err(BodyError::Truncated("short_message"));
        }
        let short_message = buf[..len].to_vec();
        bytes::Buf::advance(buf, len);
        Ok(Self {
            message_id,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            sm_default_msg_id,
            short_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_sm_resp_round_trips() {
        let resp = QuerySmResp {
            message_id: "msg-1".into(),
            final_date: String::new(),
            message_state: 2,
            error_code: 0,
        };
        let mut buf = BytesMut::new();
        resp.encode(&mut buf).unwrap();
        let mut slice = &buf[..];
        assert_eq!(QuerySmResp::parse(&mut slice).unwrap(), resp);
    }

    #[test]
    fn replace_sm_round_trips() {
        let replace = ReplaceSm {
            message_id: "msg-2".into(),
            source_addr: "12345".into(),
            short_message: b"updated".to_vec(),
            ..ReplaceSm::default()
        };
        let mut buf = BytesMut::new();
        replace.encode(&mut buf).unwrap();
        let mut slice = &buf[..];
        assert_eq!(ReplaceSm::parse(&mut slice).unwrap(), replace);
    }

    #[test]
    fn cancel_sm_rejects_long_message_id() {
        let cancel = CancelSm {
            message_id: "x".repeat(65),
            ..CancelSm::default()
        };
        let mut buf = BytesMut::new();
        assert!(cancel.encode(&mut buf).is_err());
    }
}
