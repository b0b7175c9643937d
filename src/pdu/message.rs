//! Message submission and delivery bodies.

use bytes::{BufMut, BytesMut};

use super::tlv::TlvMap;
use super::{get_cstr, get_u8, get_u32, put_cstr, BodyError, EncodeError};

const MAX_SHORT_MESSAGE: usize = 254;

fn put_short_message(buf: &mut BytesMut, message: &[u8]) -> Result<(), EncodeError> {
    if message.len() > MAX_SHORT_MESSAGE {
        return Err(EncodeError::MessageTooLong {
            max: MAX_SHORT_MESSAGE,
            actual: message.len(),
        });
    }
    buf.put_u8(message.len() as u8);
    buf.put_slice(message);
    Ok(())
}

fn get_short_message(buf: &mut &[u8]) -> Result<Vec<u8>, BodyError> {
    let len = get_u8(buf, "sm_length")? as usize;
    if buf.len() < len {
        return Err(BodyError::Truncated("short_message"));
    }
    let message = buf[..len].to_vec();
    bytes::Buf::advance(buf, len);
    Ok(message)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitSm {
    pub service_type: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub dest_addr_ton: u8,
    pub dest_addr_npi: u8,
    pub dest_addr: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Vec<u8>,
    pub tlvs: TlvMap,
}

impl SubmitSm {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "service_type", &self.service_type, 5)?;
        buf.put_u8(self.source_addr_ton);
        buf.put_u8(self.source_addr_npi);
        put_cstr(buf, "source_addr", &self.source_addr, 20)?;
        buf.put_u8(self.dest_addr_ton);
        buf.put_u8(self.dest_addr_npi);
        put_cstr(buf, "destination_addr", &self.dest_addr, 20)?;
        buf.put_u8(self.esm_class);
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.priority_flag);
        put_cstr(buf, "schedule_delivery_time", &self.schedule_delivery_time, 16)?;
        put_cstr(buf, "validity_period", &self.validity_period, 16)?;
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.replace_if_present);
        buf.put_u8(self.data_coding);
        buf.put_u8(self.sm_default_msg_id);
        put_short_message(buf, &self.short_message)?;
        self.tlvs.encode(buf);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            service_type: get_cstr(buf, "service_type")?,
            source_addr_ton: get_u8(buf, "source_addr_ton")?,
            source_addr_npi: get_u8(buf, "source_addr_npi")?,
            source_addr: get_cstr(buf, "source_addr")?,
            dest_addr_ton: get_u8(buf, "dest_addr_ton")?,
            dest_addr_npi: get_u8(buf, "dest_addr_npi")?,
            dest_addr: get_cstr(buf, "destination_addr")?,
            esm_class: get_u8(buf, "esm_class")?,
            protocol_id: get_u8(buf, "protocol_id")?,
            priority_flag: get_u8(buf, "priority_flag")?,
            schedule_delivery_time: get_cstr(buf, "schedule_delivery_time")?,
            validity_period: get_cstr(buf, "validity_period")?,
            registered_delivery: get_u8(buf, "registered_delivery")?,
            replace_if_present: get_u8(buf, "replace_if_present_flag")?,
            data_coding: get_u8(buf, "data_coding")?,
            sm_default_msg_id: get_u8(buf, "sm_default_msg_id")?,
            short_message: get_short_message(buf)?,
            tlvs: TlvMap::parse(buf)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitSmResp {
    pub message_id: String,
    pub tlvs: TlvMap,
}

impl SubmitSmResp {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "message_id", &self.message_id, 64)?;
        self.tlvs.encode(buf);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            message_id: get_cstr(buf, "message_id")?,
            tlvs: TlvMap::parse(buf)?,
        })
    }
}

/// Destination entry for submit_multi: either a single SME address or the
/// name of a pre-provisioned distribution list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestAddress {
    Sme { ton: u8, npi: u8, addr: String },
    DistributionList(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitMulti {
    pub service_type: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub dest_addresses: Vec<DestAddress>,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Vec<u8>,
    pub tlvs: TlvMap,
}

impl SubmitMulti {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "service_type", &self.service_type, 5)?;
        buf.put_u8(self.source_addr_ton);
        buf.put_u8(self.source_addr_npi);
        put_cstr(buf, "source_addr", &self.source_addr, 20)?;
        buf.put_u8(self.dest_addresses.len() as u8);
        for dest in &self.dest_addresses {
            match dest {
                DestAddress::Sme { ton, npi, addr } => {
                    buf.put_u8(0x01);
                    buf.put_u8(*ton);
                    buf.put_u8(*npi);
                    put_cstr(buf, "destination_addr", addr, 20)?;
                }
                DestAddress::DistributionList(name) => {
                    buf.put_u8(0x02);
                    put_cstr(buf, "dl_name", name, 20)?;
                }
            }
        }
        buf.put_u8(self.esm_class);
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.priority_flag);
        put_cstr(buf, "schedule_delivery_time", &self.schedule_delivery_time, 16)?;
        put_cstr(buf, "validity_period", &self.validity_period, 16)?;
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.replace_if_present);
        buf.put_u8(self.data_coding);
        buf.put_u8(self.sm_default_msg_id);
        put_short_message(buf, &self.short_message)?;
        self.tlvs.encode(buf);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        let service_type = get_cstr(buf, "service_type")?;
        let source_addr_ton = get_u8(buf, "source_addr_ton")?;
        let source_addr_npi = get_u8(buf, "source_addr_npi")?;
        let source_addr = get_cstr(buf, "source_addr")?;
        let number_of_dests = get_u8(buf, "number_of_dests")?;
        let mut dest_addresses = Vec::with_capacity(number_of_dests as usize);
        for _ in 0..number_of_dests {
            let flag = get_u8(buf, "dest_flag")?;
            let dest = match flag {
                0x02 => DestAddress::DistributionList(get_cstr(buf, "dl_name")?),
                _ => DestAddress::Sme {
                    ton: get_u8(buf, "dest_addr_ton")?,
                    npi: get_u8(buf, "dest_addr_npi")?,
                    addr: get_cstr(buf, "destination_addr")?,
                },
            };
            dest_addresses.push(dest);
        }
        Ok(Self {
            service_type,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            dest_addresses,
            esm_class: get_u8(buf, "esm_class")?,
            protocol_id: get_u8(buf, "protocol_id")?,
            priority_flag: get_u8(buf, "priority_flag")?,
            schedule_delivery_time: get_cstr(buf, "schedule_delivery_time")?,
            validity_period: get_cstr(buf, "validity_period")?,
            registered_delivery: get_u8(buf, "registered_delivery")?,
            replace_if_present: get_u8(buf, "replace_if_present_flag")?,
            data_coding: get_u8(buf, "data_coding")?,
            sm_default_msg_id: get_u8(buf, "sm_default_msg_id")?,
            short_message: get_short_message(buf)?,
            tlvs: TlvMap::parse(buf)?,
        })
    }
}

/// Destination that could not be served, reported in submit_multi_resp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsuccessSme {
    pub ton: u8,
    pub npi: u8,
    pub addr: String,
    pub error_status: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitMultiResp {
    pub message_id: String,
    pub unsuccess: Vec<UnsuccessSme>,
}

impl SubmitMultiResp {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "message_id", &self.message_id, 64)?;
        buf.put_u8(self.unsuccess.len() as u8);
        for sme in &self.unsuccess {
            buf.put_u8(sme.ton);
            buf.put_u8(sme.npi);
            put_cstr(buf, "destination_addr", &sme.addr, 20)?;
            buf.put_u32(sme.error_status);
        }
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        let message_id = get_cstr(buf, "message_id")?;
        let count = get_u8(buf, "no_unsuccess")?;
        let mut unsuccess = Vec::with_capacity(count as usize);
        for _ in 0..count {
            unsuccess.push(UnsuccessSme {
                ton: get_u8(buf, "dest_addr_ton")?,
                npi: get_u8(buf, "dest_addr_npi")?,
                addr: get_cstr(buf, "destination_addr")?,
                error_status: get_u32(buf, "error_status_code")?,
            });
        }
        Ok(Self {
            message_id,
            unsuccess,
        })
    }
}

/// deliver_sm shares the submit_sm octet layout; schedule and validity are
/// always empty on the wire but kept so relays round-trip cleanly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliverSm {
    pub service_type: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub dest_addr_ton: u8,
    pub dest_addr_npi: u8,
    pub dest_addr: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Vec<u8>,
    pub tlvs: TlvMap,
}

impl DeliverSm {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "service_type", &self.service_type, 5)?;
        buf.put_u8(self.source_addr_ton);
        buf.put_u8(self.source_addr_npi);
        put_cstr(buf, "source_addr", &self.source_addr, 20)?;
        buf.put_u8(self.dest_addr_ton);
        buf.put_u8(self.dest_addr_npi);
        put_cstr(buf, "destination_addr", &self.dest_addr, 20)?;
        buf.put_u8(self.esm_class);
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.priority_flag);
        put_cstr(buf, "schedule_delivery_time", &self.schedule_delivery_time, 16)?;
        put_cstr(buf, "validity_period", &self.validity_period, 16)?;
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.replace_if_present);
        buf.put_u8(self.data_coding);
        buf.put_u8(self.sm_default_msg_id);
        put_short_message(buf, &self.short_message)?;
        self.tlvs.encode(buf);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            service_type: get_cstr(buf, "service_type")?,
            source_addr_ton: get_u8(buf, "source_addr_ton")?,
            source_addr_npi: get_u8(buf, "source_addr_npi")?,
            source_addr: get_cstr(buf, "source_addr")?,
            dest_addr_ton: get_u8(buf, "dest_addr_ton")?,
            dest_addr_npi: get_u8(buf, "dest_addr_npi")?,
            dest_addr: get_cstr(buf, "destination_addr")?,
            esm_class: get_u8(buf, "esm_class")?,
            protocol_id: get_u8(buf, "protocol_id")?,
            priority_flag: get_u8(buf, "priority_flag")?,
            schedule_delivery_time: get_cstr(buf, "schedule_delivery_time")?,
            validity_period: get_cstr(buf, "validity_period")?,
            registered_delivery: get_u8(buf, "registered_delivery")?,
            replace_if_present: get_u8(buf, "replace_if_present_flag")?,
            data_coding: get_u8(buf, "data_coding")?,
            sm_default_msg_id: get_u8(buf, "sm_default_msg_id")?,
            short_message: get_short_message(buf)?,
            tlvs: TlvMap::parse(buf)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverSmResp {
    pub message_id: String,
}

impl DeliverSmResp {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "message_id", &self.message_id, 64)
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            message_id: get_cstr(buf, "message_id")?,
        })
    }
}

/// data_sm carries its payload in the message_payload TLV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSm {
    pub service_type: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub dest_addr_ton: u8,
    pub dest_addr_npi: u8,
    pub dest_addr: String,
    pub esm_class: u8,
    pub registered_delivery: u8,
    pub data_coding: u8,
    pub tlvs: TlvMap,
}

impl DataSm {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "service_type", &self.service_type, 5)?;
        buf.put_u8(self.source_addr_ton);
        buf.put_u8(self.source_addr_npi);
        put_cstr(buf, "source_addr", &self.source_addr, 64)?;
        buf.put_u8(self.dest_addr_ton);
        buf.put_u8(self.dest_addr_npi);
        put_cstr(buf, "destination_addr", &self.dest_addr, 64)?;
        buf.put_u8(self.esm_class);
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.data_coding);
        self.tlvs.encode(buf);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            service_type: get_cstr(buf, "service_type")?,
            source_addr_ton: get_u8(buf, "source_addr_ton")?,
            source_addr_npi: get_u8(buf, "source_addr_npi")?,
            source_addr: get_cstr(buf, "source_addr")?,
            dest_addr_ton: get_u8(buf, "dest_addr_ton")?,
            dest_addr_npi: get_u8(buf, "dest_addr_npi")?,
            dest_addr: get_cstr(buf, "destination_addr")?,
            esm_class: get_u8(buf, "esm_class")?,
            registered_delivery: get_u8(buf, "registered_delivery")?,
            data_coding: get_u8(buf, "data_coding")?,
            tlvs: TlvMap::parse(buf)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSmResp {
    pub message_id: String,
    pub tlvs: TlvMap,
}

impl DataSmResp {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "message_id", &self.message_id, 64)?;
        self.tlvs.encode(buf);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            message_id: get_cstr(buf, "message_id")?,
            tlvs: TlvMap::parse(buf)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertNotification {
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub esme_addr_ton: u8,
    pub esme_addr_npi: u8,
    pub esme_addr: String,
    pub tlvs: TlvMap,
}

impl AlertNotification {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        buf.put_u8(self.source_addr_ton);
        buf.put_u8(self.source_addr_npi);
        put_cstr(buf, "source_addr", &self.source_addr, 64)?;
        buf.put_u8(self.esme_addr_ton);
        buf.put_u8(self.esme_addr_npi);
        put_cstr(buf, "esme_addr", &self.esme_addr, 64)?;
        self.tlvs.encode(buf);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            source_addr_ton: get_u8(buf, "source_addr_ton")?,
            source_addr_npi: get_u8(buf, "source_addr_npi")?,
            source_addr: get_cstr(buf, "source_addr")?,
            esme_addr_ton: get_u8(buf, "esme_addr_ton")?,
            esme_addr_npi: get_u8(buf, "esme_addr_npi")?,
            esme_addr: get_cstr(buf, "esme_addr")?,
            tlvs: TlvMap::parse(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_sm_round_trips() {
        let submit = SubmitSm {
            source_addr: "12345".into(),
            dest_addr: "67890".into(),
            short_message: b"hello".to_vec(),
            registered_delivery: 1,
            ..SubmitSm::default()
        };
        let mut buf = BytesMut::new();
        submit.encode(&mut buf).unwrap();
        let mut slice = &buf[..];
        assert_eq!(SubmitSm::parse(&mut slice).unwrap(), submit);
        assert!(slice.is_empty());
    }

    #[test]
    fn submit_sm_rejects_oversized_message() {
        let submit = SubmitSm {
            short_message: vec![0x41; 255],
            ..SubmitSm::default()
        };
        let mut buf = BytesMut::new();
        assert!(matches!(
            submit.encode(&mut buf),
            Err(EncodeError::MessageTooLong { .. })
        ));
    }

    #[test]
    fn submit_multi_round_trips_mixed_destinations() {
        let multi = SubmitMulti {
            source_addr: "1000".into(),
            dest_addresses: vec![
                DestAddress::Sme {
                    ton: 1,
                    npi: 1,
                    addr: "2000".into(),
                },
                DestAddress::DistributionList("ops".into()),
            ],
            short_message: b"fanout".to_vec(),
            ..SubmitMulti::default()
        };
        let mut buf = BytesMut::new();
        multi.encode(&mut buf).unwrap();
        let mut slice = &buf[..];
        assert_eq!(SubmitMulti::parse(&mut slice).unwrap(), multi);
    }

    #[test]
    fn submit_multi_resp_reports_failures() {
        let resp = SubmitMultiResp {
            message_id: "abc".into(),
            unsuccess: vec![UnsuccessSme {
                ton: 1,
                npi: 1,
                addr: "2000".into(),
                error_status: 0x14,
            }],
        };
        let mut buf = BytesMut::new();
        resp.encode(&mut buf).unwrap();
        let mut slice = &buf[..];
        assert_eq!(SubmitMultiResp::parse(&mut slice).unwrap(), resp);
    }

    #[test]
    fn truncated_deliver_sm_fails() {
        let deliver = DeliverSm {
            source_addr: "12345".into(),
            short_message: b"payload".to_vec(),
            ..DeliverSm::default()
        };
        let mut buf = BytesMut::new();
        deliver.encode(&mut buf).unwrap();
        let cut = buf.len() - 4;
        let mut slice = &buf[..cut];
        assert!(DeliverSm::parse(&mut slice).is_err());
    }
}
