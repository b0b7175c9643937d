//! Session lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pdu::Command;

/// SMPP session state.
///
/// Legal transitions: `CLOSED → OPEN → BOUND_* → UNBOUND → CLOSED`, with a
/// direct jump to `CLOSED` permitted from any state on error. `OUTBOUND` is
/// entered by a server-initiated outbind handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    Outbound,
    BoundTx,
    BoundRx,
    BoundTrx,
    Unbound,
}

impl SessionState {
    pub fn is_bound(self) -> bool {
        matches!(
            self,
            SessionState::BoundTx | SessionState::BoundRx | SessionState::BoundTrx
        )
    }

    pub fn is_transmittable(self) -> bool {
        matches!(self, SessionState::BoundTx | SessionState::BoundTrx)
    }

    pub fn is_receivable(self) -> bool {
        matches!(self, SessionState::BoundRx | SessionState::BoundTrx)
    }

    /// States in which the reader keeps pulling PDUs off the socket.
    pub(crate) fn is_read_pdu(self) -> bool {
        self.is_bound() || matches!(self, SessionState::Open | SessionState::Outbound)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            SessionState::Closed => 0,
            SessionState::Open => 1,
            SessionState::Outbound => 2,
            SessionState::BoundTx => 3,
            SessionState::BoundRx => 4,
            SessionState::BoundTrx => 5,
            SessionState::Unbound => 6,
        }
    }

    pub(crate) fn from_u8(value: u8) -> SessionState {
        match value {
            1 => SessionState::Open,
            2 => SessionState::Outbound,
            3 => SessionState::BoundTx,
            4 => SessionState::BoundRx,
            5 => SessionState::BoundTrx,
            6 => SessionState::Unbound,
            _ => SessionState::Closed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Closed => write!(f, "CLOSED"),
            SessionState::Open => write!(f, "OPEN"),
            SessionState::Outbound => write!(f, "OUTBOUND"),
            SessionState::BoundTx => write!(f, "BOUND_TX"),
            SessionState::BoundRx => write!(f, "BOUND_RX"),
            SessionState::BoundTrx => write!(f, "BOUND_TRX"),
            SessionState::Unbound => write!(f, "UNBOUND"),
        }
    }
}

/// Direction chosen at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindType {
    Transmitter,
    Receiver,
    Transceiver,
}

impl BindType {
    pub fn bound_state(self) -> SessionState {
        match self {
            BindType::Transmitter => SessionState::BoundTx,
            BindType::Receiver => SessionState::BoundRx,
            BindType::Transceiver => SessionState::BoundTrx,
        }
    }

    pub(crate) fn command(self) -> Command {
        match self {
            BindType::Transmitter => Command::BindTransmitter,
            BindType::Receiver => Command::BindReceiver,
            BindType::Transceiver => Command::BindTransceiver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_follow_bind_direction() {
        assert!(SessionState::BoundTx.is_transmittable());
        assert!(!SessionState::BoundTx.is_receivable());
        assert!(SessionState::BoundRx.is_receivable());
        assert!(!SessionState::BoundRx.is_transmittable());
        assert!(SessionState::BoundTrx.is_transmittable());
        assert!(SessionState::BoundTrx.is_receivable());
        assert!(!SessionState::Open.is_bound());
    }

    #[test]
    fn reader_runs_while_open_outbound_or_bound() {
        assert!(SessionState::Open.is_read_pdu());
        assert!(SessionState::Outbound.is_read_pdu());
        assert!(SessionState::BoundTrx.is_read_pdu());
        assert!(!SessionState::Unbound.is_read_pdu());
        assert!(!SessionState::Closed.is_read_pdu());
    }

    #[test]
    fn state_survives_atomic_encoding() {
        for state in [
            SessionState::Closed,
            SessionState::Open,
            SessionState::Outbound,
            SessionState::BoundTx,
            SessionState::BoundRx,
            SessionState::BoundTrx,
            SessionState::Unbound,
        ] {
            assert_eq!(SessionState::from_u8(state.as_u8()), state);
        }
    }
}
