//! bind_* request/response bodies and outbind.

use bytes::BytesMut;

use super::tlv::{tag, TlvMap};
use super::{get_cstr, get_u8, put_cstr, BodyError, EncodeError};

/// Body shared by bind_transmitter, bind_receiver and bind_transceiver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bind {
    pub system_id: String,
    pub password: String,
    pub system_type: String,
    pub interface_version: u8,
    pub addr_ton: u8,
    pub addr_npi: u8,
    pub address_range: String,
}

impl Bind {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "system_id", &self.system_id, 15)?;
        put_cstr(buf, "password", &self.password, 8)?;
        put_cstr(buf, "system_type", &self.system_type, 12)?;
        buf.extend_from_slice(&[self.interface_version, self.addr_ton, self.addr_npi]);
        put_cstr(buf, "address_range", &self.address_range, 40)
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            system_id: get_cstr(buf, "system_id")?,
            password: get_cstr(buf, "password")?,
            system_type: get_cstr(buf, "system_type")?,
            interface_version: get_u8(buf, "interface_version")?,
            addr_ton: get_u8(buf, "addr_ton")?,
            addr_npi: get_u8(buf, "addr_npi")?,
            address_range: get_cstr(buf, "address_range")?,
        })
    }
}

/// Body shared by the three bind responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindResp {
    pub system_id: String,
    pub tlvs: TlvMap,
}

impl BindResp {
    /// SMPP interface version the peer reported, when present.
    pub fn sc_interface_version(&self) -> Option<u8> {
        self.tlvs.get_u8(tag::SC_INTERFACE_VERSION)
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "system_id", &self.system_id, 15)?;
        self.tlvs.encode(buf);
        Ok(())
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            system_id: get_cstr(buf, "system_id")?,
            tlvs: TlvMap::parse(buf)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbind {
    pub system_id: String,
    pub password: String,
}

impl Outbind {
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        put_cstr(buf, "system_id", &self.system_id, 15)?;
        put_cstr(buf, "password", &self.password, 8)
    }

    pub(crate) fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        Ok(Self {
            system_id: get_cstr(buf, "system_id")?,
            password: get_cstr(buf, "password")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_round_trips() {
        let bind = Bind {
            system_id: "ESME".into(),
            password: "secret".into(),
            system_type: "SMPP".into(),
            interface_version: 0x34,
            addr_ton: 1,
            addr_npi: 1,
            address_range: String::new(),
        };
        let mut buf = BytesMut::new();
        bind.encode(&mut buf).unwrap();
        let mut slice = &buf[..];
        assert_eq!(Bind::parse(&mut slice).unwrap(), bind);
    }

    #[test]
    fn bind_rejects_long_password() {
        let bind = Bind {
            password: "way-too-long-password".into(),
            ..Bind::default()
        };
        let mut buf = BytesMut::new();
        assert!(matches!(
            bind.encode(&mut buf),
            Err(EncodeError::StringTooLong { field: "password", .. })
        ));
    }

    #[test]
    fn bind_resp_reports_interface_version() {
        let mut resp = BindResp {
            system_id: "SMSC".into(),
            tlvs: TlvMap::new(),
        };
        resp.tlvs.insert(tag::SC_INTERFACE_VERSION, vec![0x34]);

        let mut buf = BytesMut::new();
        resp.encode(&mut buf).unwrap();
        let mut slice = &buf[..];
        let parsed = BindResp::parse(&mut slice).unwrap();
        assert_eq!(parsed.sc_interface_version(), Some(0x34));
    }
}
