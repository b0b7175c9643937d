//! SMPP v3.4 wire format.
//!
//! Bodies are parsed lazily: the codec frames `(header, raw body)` pairs and
//! `Pdu::parse` runs in the processor, so a malformed body in a response is
//! reported to the awaiting caller instead of tearing down the connection.

mod bind;
pub mod codec;
mod command;
mod header;
mod message;
mod query;
mod status;
mod tlv;

pub use bind::{Bind, BindResp, Outbind};
pub use codec::{CodecError, PduFrame, SmppCodec};
pub use command::{Command, RESPONSE_BIT};
pub use header::{Header, HEADER_LEN, MAX_PDU_LEN};
pub use message::{
    AlertNotification, DataSm, DataSmResp, DeliverSm, DeliverSmResp, DestAddress, SubmitMulti,
    SubmitMultiResp, SubmitSm, SubmitSmResp, UnsuccessSme,
};
pub use query::{CancelSm, QuerySm, QuerySmResp, ReplaceSm};
pub use status::Status;
pub use tlv::{tag, TlvMap};

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// A user-supplied field violates the SMPP string rules. Raised while
/// building a request, before any byte reaches the socket.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{field} is limited to {max} octets, got {actual}")]
    StringTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{field} contains an interior NUL octet")]
    NulByte { field: &'static str },

    #[error("short_message is limited to {max} octets, got {actual}")]
    MessageTooLong { max: usize, actual: usize },
}

/// A received body cannot be decoded.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("{0} is not NUL-terminated")]
    UnterminatedString(&'static str),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}

/// Decoded PDU body. Response-only commands tolerate an empty body when the
/// header carries a non-zero status, since error responses may omit it.
#[derive(Debug, Clone, PartialEq)]
pub enum Pdu {
    BindTransmitter(Bind),
    BindReceiver(Bind),
    BindTransceiver(Bind),
    BindTransmitterResp(BindResp),
    BindReceiverResp(BindResp),
    BindTransceiverResp(BindResp),
    Outbind(Outbind),
    Unbind,
    UnbindResp,
    EnquireLink,
    EnquireLinkResp,
    GenericNack,
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResp),
    SubmitMulti(Box<SubmitMulti>),
    SubmitMultiResp(SubmitMultiResp),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResp),
    DataSm(DataSm),
    DataSmResp(DataSmResp),
    QuerySm(QuerySm),
    QuerySmResp(QuerySmResp),
    CancelSm(CancelSm),
    CancelSmResp,
    ReplaceSm(Box<ReplaceSm>),
    ReplaceSmResp,
    AlertNotification(AlertNotification),
    /// Bare header, used for negative responses to peer requests.
    HeaderOnly,
}

impl Pdu {
    /// Decode the body bytes that followed `header`.
    pub fn parse(header: &Header, body: &[u8]) -> Result<Pdu, BodyError> {
        let mut buf = body;
        let empty_error_resp = header.command.is_response() && !header.status.is_ok() && body.is_empty();
        let pdu = match header.command {
            Command::BindTransmitter => Pdu::BindTransmitter(Bind::parse(&mut buf)?),
            Command::BindReceiver => Pdu::BindReceiver(Bind::parse(&mut buf)?),
            Command::BindTransceiver => Pdu::BindTransceiver(Bind::parse(&mut buf)?),
            Command::BindTransmitterResp if empty_error_resp => {
                Pdu::BindTransmitterResp(BindResp::default())
            }
            Command::BindReceiverResp if empty_error_resp => {
                Pdu::BindReceiverResp(BindResp::default())
            }
            Command::BindTransceiverResp if empty_error_resp => {
                Pdu::BindTransceiverResp(BindResp::default())
            }
            Command::BindTransmitterResp => Pdu::BindTransmitterResp(BindResp::parse(&mut buf)?),
            Command::BindReceiverResp => Pdu::BindReceiverResp(BindResp::parse(&mut buf)?),
            Command::BindTransceiverResp => Pdu::BindTransceiverResp(BindResp::parse(&mut buf)?),
            Command::Outbind => Pdu::Outbind(Outbind::parse(&mut buf)?),
            Command::Unbind => Pdu::Unbind,
            Command::UnbindResp => Pdu::UnbindResp,
            Command::EnquireLink => Pdu::EnquireLink,
            Command::EnquireLinkResp => Pdu::EnquireLinkResp,
            Command::GenericNack => Pdu::GenericNack,
            Command::SubmitSm => Pdu::SubmitSm(Box::new(SubmitSm::parse(&mut buf)?)),
            Command::SubmitSmResp if empty_error_resp => {
                Pdu::SubmitSmResp(SubmitSmResp::default())
            }
            Command::SubmitSmResp => Pdu::SubmitSmResp(SubmitSmResp::parse(&mut buf)?),
            Command::SubmitMulti => Pdu::SubmitMulti(Box::new(SubmitMulti::parse(&mut buf)?)),
            Command::SubmitMultiResp if empty_error_resp => {
                Pdu::SubmitMultiResp(SubmitMultiResp::default())
            }
            Command::SubmitMultiResp => Pdu::SubmitMultiResp(SubmitMultiResp::parse(&mut buf)?),
            Command::DeliverSm => Pdu::DeliverSm(Box::new(DeliverSm::parse(&mut buf)?)),
            Command::DeliverSmResp if empty_error_resp => {
                Pdu::DeliverSmResp(DeliverSmResp::default())
            }
            Command::DeliverSmResp => Pdu::DeliverSmResp(DeliverSmResp::parse(&mut buf)?),
            Command::DataSm => Pdu::DataSm(DataSm::parse(&mut buf)?),
            Command::DataSmResp if empty_error_resp => Pdu::DataSmResp(DataSmResp::default()),
            Command::DataSmResp => Pdu::DataSmResp(DataSmResp::parse(&mut buf)?),
            Command::QuerySm => Pdu::QuerySm(QuerySm::parse(&mut buf)?),
            Command::QuerySmResp if empty_error_resp => Pdu::QuerySmResp(QuerySmResp::default()),
            Command::QuerySmResp => Pdu::QuerySmResp(QuerySmResp::parse(&mut buf)?),
            Command::CancelSm => Pdu::CancelSm(CancelSm::parse(&mut buf)?),
            Command::CancelSmResp => Pdu::CancelSmResp,
            Command::ReplaceSm => Pdu::ReplaceSm(Box::new(ReplaceSm::parse(&mut buf)?)),
            Command::ReplaceSmResp => Pdu::ReplaceSmResp,
            Command::AlertNotification => {
                Pdu::AlertNotification(AlertNotification::parse(&mut buf)?)
            }
            Command::Unknown(_) => Pdu::HeaderOnly,
        };
        Ok(pdu)
    }

    pub(crate) fn encode_body(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        match self {
            Pdu::BindTransmitter(bind) | Pdu::BindReceiver(bind) | Pdu::BindTransceiver(bind) => {
                bind.encode(buf)
            }
            Pdu::BindTransmitterResp(resp)
            | Pdu::BindReceiverResp(resp)
            | Pdu::BindTransceiverResp(resp) => resp.encode(buf),
            Pdu::Outbind(outbind) => outbind.encode(buf),
            Pdu::Unbind
            | Pdu::UnbindResp
            | Pdu::EnquireLink
            | Pdu::EnquireLinkResp
            | Pdu::GenericNack
            | Pdu::CancelSmResp
            | Pdu::ReplaceSmResp
            | Pdu::HeaderOnly => Ok(()),
            Pdu::SubmitSm(submit) => submit.encode(buf),
            Pdu::SubmitSmResp(resp) => resp.encode(buf),
            Pdu::SubmitMulti(multi) => multi.encode(buf),
            Pdu::SubmitMultiResp(resp) => resp.encode(buf),
            Pdu::DeliverSm(deliver) => deliver.encode(buf),
            Pdu::DeliverSmResp(resp) => resp.encode(buf),
            Pdu::DataSm(data) => data.encode(buf),
            Pdu::DataSmResp(resp) => resp.encode(buf),
            Pdu::QuerySm(query) => query.encode(buf),
            Pdu::QuerySmResp(resp) => resp.encode(buf),
            Pdu::CancelSm(cancel) => cancel.encode(buf),
            Pdu::ReplaceSm(replace) => replace.encode(buf),
            Pdu::AlertNotification(alert) => alert.encode(buf),
        }
    }
}

/// Append a C-octet string, enforcing the field's maximum decoded length.
pub(crate) fn put_cstr(
    buf: &mut BytesMut,
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), EncodeError> {
    let bytes = value.as_bytes();
    if bytes.len() > max {
        return Err(EncodeError::StringTooLong {
            field,
            max,
            actual: bytes.len(),
        });
    }
    if bytes.contains(&0) {
        return Err(EncodeError::NulByte { field });
    }
    buf.put_slice(bytes);
    buf.put_u8(0);
    Ok(())
}

/// Consume a NUL-terminated string from the body slice.
pub(crate) fn get_cstr(buf: &mut &[u8], field: &'static str) -> Result<String, BodyError> {
    let pos = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(BodyError::UnterminatedString(field))?;
    let value = std::str::from_utf8(&buf[..pos])
        .map_err(|_| BodyError::InvalidUtf8(field))?
        .to_owned();
    buf.advance(pos + 1);
    Ok(value)
}

pub(crate) fn get_u8(buf: &mut &[u8], field: &'static str) -> Result<u8, BodyError> {
    if buf.is_empty() {
        return Err(BodyError::Truncated(field));
    }
    Ok(buf.get_u8())
}

pub(crate) fn get_u32(buf: &mut &[u8], field: &'static str) -> Result<u32, BodyError> {
    if buf.len() < 4 {
        return Err(BodyError::Truncated(field));
    }
    Ok(buf.get_u32())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cstr_rejects_overlong_value() {
        let mut buf = BytesMut::new();
        let err = put_cstr(&mut buf, "system_id", "seventeen-octets!", 15).unwrap_err();
        assert!(matches!(err, EncodeError::StringTooLong { field: "system_id", .. }));
    }

    #[test]
    fn cstr_round_trips() {
        let mut buf = BytesMut::new();
        put_cstr(&mut buf, "system_id", "ESME", 15).unwrap();
        let mut slice = &buf[..];
        assert_eq!(get_cstr(&mut slice, "system_id").unwrap(), "ESME");
        assert!(slice.is_empty());
    }

    #[test]
    fn error_response_with_empty_body_parses() {
        let header = Header::with_status(Command::SubmitSmResp, 7, Status::Throttled);
        let pdu = Pdu::parse(&header, &[]).unwrap();
        assert_eq!(pdu, Pdu::SubmitSmResp(SubmitSmResp::default()));
    }
}
