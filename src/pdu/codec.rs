//! Framed codec splitting the byte stream into `(header, body)` units.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use super::header::{Header, HEADER_LEN, MAX_PDU_LEN};
use super::{Command, EncodeError, Pdu};

/// One framed PDU: decoded header plus the raw body octets.
#[derive(Debug, Clone)]
pub struct PduFrame {
    pub header: Header,
    pub body: Bytes,
}

impl PduFrame {
    pub fn command(&self) -> Command {
        self.header.command
    }

    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    pub fn is_response(&self) -> bool {
        self.header.command.is_response()
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// command_length outside [16, MAX_PDU_LEN]; the reader answers this
    /// with generic_nack(ESME_RINVCMDLEN) and unbinds.
    #[error("invalid command_length {length}")]
    InvalidCommandLength { length: u32 },

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Stateless SMPP framing for `FramedRead`/`FramedWrite`.
#[derive(Debug, Default)]
pub struct SmppCodec;

impl SmppCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for SmppCodec {
    type Item = PduFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<PduFrame>, CodecError> {
        if src.len() < 4 {
            src.reserve(HEADER_LEN);
            return Ok(None);
        }

        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if length < HEADER_LEN as u32 || length > MAX_PDU_LEN {
            return Err(CodecError::InvalidCommandLength { length });
        }

        let length = length as usize;
        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(length);
        frame.advance(4);
        let header = Header::read_after_length(&mut frame);
        Ok(Some(PduFrame {
            header,
            body: frame.freeze(),
        }))
    }
}

impl Encoder<(Header, Pdu)> for SmppCodec {
    type Error = CodecError;

    fn encode(&mut self, item: (Header, Pdu), dst: &mut BytesMut) -> Result<(), CodecError> {
        let (header, pdu) = item;
        let start = dst.len();
        header.write_with_placeholder(dst);
        pdu.encode_body(dst)?;
        let length = (dst.len() - start) as u32;
        dst[start..start + 4].copy_from_slice(&length.to_be_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{Bind, Status};

    fn encode(header: Header, pdu: Pdu) -> BytesMut {
        let mut buf = BytesMut::new();
        SmppCodec::new().encode((header, pdu), &mut buf).unwrap();
        buf
    }

    #[test]
    fn frames_a_full_pdu() {
        let header = Header::new(Command::EnquireLink, 9);
        let mut buf = encode(header, Pdu::EnquireLink);

        let frame = SmppCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.command(), Command::EnquireLink);
        assert_eq!(frame.sequence(), 9);
        assert!(frame.body.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_partial_frames() {
        let header = Header::new(Command::BindTransceiver, 1);
        let bind = Bind {
            system_id: "ESME".into(),
            password: "pw".into(),
            ..Bind::default()
        };
        let full = encode(header, Pdu::BindTransceiver(bind.clone()));

        let mut codec = SmppCodec::new();
        let mut partial = BytesMut::from(&full[..10]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&full[10..]);
        let frame = codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(
            Pdu::parse(&frame.header, &frame.body).unwrap(),
            Pdu::BindTransceiver(bind)
        );
    }

    #[test]
    fn rejects_undersized_command_length() {
        let mut buf = BytesMut::from(&8u32.to_be_bytes()[..]);
        buf.extend_from_slice(&[0u8; 12]);
        assert!(matches!(
            SmppCodec::new().decode(&mut buf),
            Err(CodecError::InvalidCommandLength { length: 8 })
        ));
    }

    #[test]
    fn rejects_oversized_command_length() {
        let mut buf = BytesMut::from(&(MAX_PDU_LEN + 1).to_be_bytes()[..]);
        buf.extend_from_slice(&[0u8; 12]);
        assert!(matches!(
            SmppCodec::new().decode(&mut buf),
            Err(CodecError::InvalidCommandLength { .. })
        ));
    }

    #[test]
    fn decodes_consecutive_frames() {
        let mut buf = encode(Header::new(Command::EnquireLink, 1), Pdu::EnquireLink);
        buf.unsplit(encode(
            Header::with_status(Command::EnquireLinkResp, 1, Status::Ok),
            Pdu::EnquireLinkResp,
        ));

        let mut codec = SmppCodec::new();
        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.command(), Command::EnquireLink);
        assert_eq!(second.command(), Command::EnquireLinkResp);
    }
}
