//! Optional parameters (TLVs) trailing a PDU body.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::BodyError;

/// Tags the session engine knows by name; everything else passes through.
pub mod tag {
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
}

/// Tag-ordered map of optional parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvMap(BTreeMap<u16, Bytes>);

impl TlvMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: u16, value: impl Into<Bytes>) -> &mut Self {
        self.0.insert(tag, value.into());
        self
    }

    pub fn get(&self, tag: u16) -> Option<&Bytes> {
        self.0.get(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Single-octet accessor for tags like sc_interface_version.
    pub fn get_u8(&self, tag: u16) -> Option<u8> {
        self.get(tag).and_then(|v| v.first().copied())
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        for (tag, value) in &self.0 {
            buf.put_u16(*tag);
            buf.put_u16(value.len() as u16);
            buf.put_slice(value);
        }
    }

    /// Consume the remainder of a PDU body as TLVs.
    pub fn parse(buf: &mut &[u8]) -> Result<Self, BodyError> {
        let mut map = BTreeMap::new();
        while !buf.is_empty() {
            if buf.len() < 4 {
                return Err(BodyError::Truncated("tlv header"));
            }
            let tag = buf.get_u16();
            let len = buf.get_u16() as usize;
            if buf.len() < len {
                return Err(BodyError::Truncated("tlv value"));
            }
            map.insert(tag, Bytes::copy_from_slice(&buf[..len]));
            buf.advance(len);
        }
        Ok(Self(map))
    }
}
