//! The 16-byte PDU header shared by every SMPP command.

use bytes::{Buf, BufMut, BytesMut};

use super::command::Command;
use super::status::Status;

/// Header size in octets.
pub const HEADER_LEN: usize = 16;

/// Upper bound on command_length; anything larger is treated as a framing
/// error rather than an allocation request.
pub const MAX_PDU_LEN: u32 = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub command: Command,
    pub status: Status,
    pub sequence: u32,
}

impl Header {
    pub fn new(command: Command, sequence: u32) -> Self {
        Self::with_status(command, sequence, Status::Ok)
    }

    pub fn with_status(command: Command, sequence: u32, status: Status) -> Self {
        Self {
            command,
            status,
            sequence,
        }
    }

    /// Read the header fields following the already-consumed command_length.
    pub fn read_after_length(buf: &mut impl Buf) -> Self {
        let command = Command::from_id(buf.get_u32());
        let status = Status::from_u32(buf.get_u32());
        let sequence = buf.get_u32();
        Self {
            command,
            status,
            sequence,
        }
    }

    /// Write the header with a zero command_length placeholder; the codec
    /// backfills the real length once the body is encoded.
    pub fn write_with_placeholder(&self, buf: &mut BytesMut) {
        buf.put_u32(0);
        buf.put_u32(self.command.id());
        buf.put_u32(self.status.as_u32());
        buf.put_u32(self.sequence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reads_back() {
        let header = Header::with_status(Command::SubmitSmResp, 42, Status::Throttled);
        let mut buf = BytesMut::new();
        header.write_with_placeholder(&mut buf);
        assert_eq!(buf.len(), HEADER_LEN);

        let mut cursor = &buf[..];
        assert_eq!(cursor.get_u32(), 0);
        assert_eq!(Header::read_after_length(&mut cursor), header);
    }
}
