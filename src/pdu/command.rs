//! SMPP command identifiers.

/// Bit 31 of command_id distinguishes responses from requests.
pub const RESPONSE_BIT: u32 = 0x8000_0000;

/// SMPP v3.4 command_id values.
///
/// Unknown ids are preserved in `Unknown` so the session can answer them
/// with generic_nack instead of dropping the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    BindReceiver,
    BindReceiverResp,
    BindTransmitter,
    BindTransmitterResp,
    QuerySm,
    QuerySmResp,
    SubmitSm,
    SubmitSmResp,
    DeliverSm,
    DeliverSmResp,
    Unbind,
    UnbindResp,
    ReplaceSm,
    ReplaceSmResp,
    CancelSm,
    CancelSmResp,
    BindTransceiver,
    BindTransceiverResp,
    Outbind,
    EnquireLink,
    EnquireLinkResp,
    SubmitMulti,
    SubmitMultiResp,
    AlertNotification,
    DataSm,
    DataSmResp,
    GenericNack,
    Unknown(u32),
}

impl Command {
    pub fn id(self) -> u32 {
        match self {
            Command::BindReceiver => 0x0000_0001,
            Command::BindReceiverResp => 0x8000_0001,
            Command::BindTransmitter => 0x0000_0002,
            Command::BindTransmitterResp => 0x8000_0002,
            Command::QuerySm => 0x0000_0003,
            Command::QuerySmResp => 0x8000_0003,
            Command::SubmitSm => 0x0000_0004,
            Command::SubmitSmResp => 0x8000_0004,
            Command::DeliverSm => 0x0000_0005,
            Command::DeliverSmResp => 0x8000_0005,
            Command::Unbind => 0x0000_0006,
            Command::UnbindResp => 0x8000_0006,
            Command::ReplaceSm => 0x0000_0007,
            Command::ReplaceSmResp => 0x8000_0007,
            Command::CancelSm => 0x0000_0008,
            Command::CancelSmResp => 0x8000_0008,
            Command::BindTransceiver => 0x0000_0009,
            Command::BindTransceiverResp => 0x8000_0009,
            Command::Outbind => 0x0000_000B,
            Command::EnquireLink => 0x0000_0015,
            Command::EnquireLinkResp => 0x8000_0015,
            Command::SubmitMulti => 0x0000_0021,
            Command::SubmitMultiResp => 0x8000_0021,
            Command::AlertNotification => 0x0000_0102,
            Command::DataSm => 0x0000_0103,
            Command::DataSmResp => 0x8000_0103,
            Command::GenericNack => 0x8000_0000,
            Command::Unknown(id) => id,
        }
    }

    pub fn from_id(id: u32) -> Command {
        match id {
            0x0000_0001 => Command::BindReceiver,
            0x8000_0001 => Command::BindReceiverResp,
            0x0000_0002 => Command::BindTransmitter,
            0x8000_0002 => Command::BindTransmitterResp,
            0x0000_0003 => Command::QuerySm,
            0x8000_0003 => Command::QuerySmResp,
            0x0000_0004 => Command::SubmitSm,
            0x8000_0004 => Command::SubmitSmResp,
            0x0000_0005 => Command::DeliverSm,
            0x8000_0005 => Command::DeliverSmResp,
            0x0000_0006 => Command::Unbind,
            0x8000_0006 => Command::UnbindResp,
            0x0000_0007 => Command::ReplaceSm,
            0x8000_0007 => Command::ReplaceSmResp,
            0x0000_0008 => Command::CancelSm,
            0x8000_0008 => Command::CancelSmResp,
            0x0000_0009 => Command::BindTransceiver,
            0x8000_0009 => Command::BindTransceiverResp,
            0x0000_000B => Command::Outbind,
            0x0000_0015 => Command::EnquireLink,
            0x8000_0015 => Command::EnquireLinkResp,
            0x0000_0021 => Command::SubmitMulti,
            0x8000_0021 => Command::SubmitMultiResp,
            0x0000_0102 => Command::AlertNotification,
            0x0000_0103 => Command::DataSm,
            0x8000_0103 => Command::DataSmResp,
            0x8000_0000 => Command::GenericNack,
            other => Command::Unknown(other),
        }
    }

    pub fn is_response(self) -> bool {
        self.id() & RESPONSE_BIT != 0
    }

    /// The response command paired with this request, if any.
    pub fn response(self) -> Option<Command> {
        match self {
            Command::BindReceiver => Some(Command::BindReceiverResp),
            Command::BindTransmitter => Some(Command::BindTransmitterResp),
            Command::BindTransceiver => Some(Command::BindTransceiverResp),
            Command::QuerySm => Some(Command::QuerySmResp),
            Command::SubmitSm => Some(Command::SubmitSmResp),
            Command::DeliverSm => Some(Command::DeliverSmResp),
            Command::Unbind => Some(Command::UnbindResp),
            Command::ReplaceSm => Some(Command::ReplaceSmResp),
            Command::CancelSm => Some(Command::CancelSmResp),
            Command::EnquireLink => Some(Command::EnquireLinkResp),
            Command::SubmitMulti => Some(Command::SubmitMultiResp),
            Command::DataSm => Some(Command::DataSmResp),
            _ => None,
        }
    }

    /// Lowercase protocol name, for log fields.
    pub fn name(self) -> &'static str {
        match self {
            Command::BindReceiver => "bind_receiver",
            Command::BindReceiverResp => "bind_receiver_resp",
            Command::BindTransmitter => "bind_transmitter",
            Command::BindTransmitterResp => "bind_transmitter_resp",
            Command::QuerySm => "query_sm",
            Command::QuerySmResp => "query_sm_resp",
            Command::SubmitSm => "submit_sm",
            Command::SubmitSmResp => "submit_sm_resp",
            Command::DeliverSm => "deliver_sm",
            Command::DeliverSmResp => "deliver_sm_resp",
            Command::Unbind => "unbind",
            Command::UnbindResp => "unbind_resp",
            Command::ReplaceSm => "replace_sm",
            Command::ReplaceSmResp => "replace_sm_resp",
            Command::CancelSm => "cancel_sm",
            Command::CancelSmResp => "cancel_sm_resp",
            Command::BindTransceiver => "bind_transceiver",
            Command::BindTransceiverResp => "bind_transceiver_resp",
            Command::Outbind => "outbind",
            Command::EnquireLink => "enquire_link",
            Command::EnquireLinkResp => "enquire_link_resp",
            Command::SubmitMulti => "submit_multi",
            Command::SubmitMultiResp => "submit_multi_resp",
            Command::AlertNotification => "alert_notification",
            Command::DataSm => "data_sm",
            Command::DataSmResp => "data_sm_resp",
            Command::GenericNack => "generic_nack",
            Command::Unknown(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_ids() {
        for cmd in [
            Command::BindTransceiver,
            Command::SubmitSm,
            Command::DeliverSmResp,
            Command::EnquireLink,
            Command::GenericNack,
            Command::DataSm,
        ] {
            assert_eq!(Command::from_id(cmd.id()), cmd);
        }
    }

    #[test]
    fn preserves_unknown_ids() {
        let cmd = Command::from_id(0x0000_00FF);
        assert_eq!(cmd, Command::Unknown(0xFF));
        assert!(!cmd.is_response());
        assert!(Command::from_id(0x8000_00FF).is_response());
    }

    #[test]
    fn generic_nack_is_a_response() {
        assert!(Command::GenericNack.is_response());
    }
}
