//! Error types surfaced by session operations.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::pdu::{EncodeError, Status};
use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum Error {
    /// Operation invoked while the session state forbids it.
    #[error("cannot {operation} while session is {state}")]
    IllegalState {
        operation: &'static str,
        state: SessionState,
    },

    /// A request field violates the SMPP string rules; raised before any I/O.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Socket failure. The session is closed before this surfaces.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No response arrived within the transaction timer. The pending entry is
    /// removed; the session stays open so the caller may retry.
    #[error("no {command} response after {waited:?} (sequence_number {sequence})")]
    ResponseTimeout {
        command: &'static str,
        sequence: u32,
        waited: Duration,
    },

    /// A response arrived but its body or correlation fields are unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Well-formed response with a non-zero command_status.
    #[error("negative response: command_status {0}")]
    NegativeResponse(Status),

    /// The processing queue overflowed for a peer request; the peer was
    /// answered with ESME_RTHROTTLED.
    #[error("processing queue full, peer throttled")]
    QueueFull,

    /// The session closed while the operation was in flight.
    #[error("session closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;
