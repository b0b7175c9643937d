//! Per-state dispatch of inbound PDUs.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, trace, warn};

use crate::error::Error;
use crate::pdu::{
    AlertNotification, Command, DataSm, DataSmResp, DeliverSm, DeliverSmResp, Header, Pdu,
    PduFrame, Status,
};

use super::pending::Response;
use super::session::{Session, SessionCore};
use super::state::SessionState;

/// What the dispatch table says about an inbound PDU in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Legal request; run its handler.
    Handle,
    /// Response; resolve through the pending table.
    CompletePending,
    /// Request that is illegal in the current state; answer ESME_RINVBNDSTS.
    RespondInvalidBindStatus,
    /// Unknown command_id; answer generic_nack(ESME_RINVCMDID).
    RespondUnknownCommand,
}

/// Dispatch table for a client session. Responses resolve through the
/// pending table in any live state; enquire_link and unbind are legal once
/// bound; delivery traffic additionally needs a receivable bind. Everything
/// else a peer could send is out of place on the client side.
pub(crate) fn action_for(state: SessionState, command: Command) -> Action {
    if matches!(command, Command::Unknown(_)) {
        return Action::RespondUnknownCommand;
    }
    if command.is_response() {
        return Action::CompletePending;
    }
    let legal = match command {
        Command::EnquireLink | Command::Unbind => state.is_bound(),
        Command::DeliverSm | Command::DataSm | Command::AlertNotification => state.is_receivable(),
        _ => false,
    };
    if legal {
        Action::Handle
    } else {
        Action::RespondInvalidBindStatus
    }
}

/// Entry point for one queued PDU.
pub(crate) async fn process(core: &Arc<SessionCore>, frame: PduFrame) {
    // Any inbound PDU counts as activity, stray responses included.
    core.context.notify_activity();

    let state = core.context.state();
    let command = frame.command();
    trace!(
        session_id = %core.id,
        command = command.name(),
        sequence_number = frame.sequence(),
        state = %state,
        "processing pdu"
    );

    let result = match action_for(state, command) {
        Action::CompletePending => {
            resolve_response(core, &frame).await;
            Ok(())
        }
        Action::Handle => handle_request(core, frame).await,
        Action::RespondInvalidBindStatus => {
            warn!(
                session_id = %core.id,
                command = command.name(),
                state = %state,
                "pdu not allowed in current session state"
            );
            core.send_negative_response(command, Status::InvalidBindStatus, frame.sequence())
                .await
        }
        Action::RespondUnknownCommand => {
            warn!(
                session_id = %core.id,
                command_id = command.id(),
                "unknown command_id"
            );
            core.write(
                Header::with_status(Command::GenericNack, frame.sequence(), Status::InvalidCommandId),
                Pdu::GenericNack,
            )
            .await
        }
    };

    if let Err(error) = result {
        match error {
            Error::Io(error) => {
                warn!(session_id = %core.id, error = %error, "I/O failure while processing pdu");
                core.close().await;
            }
            Error::Closed => {}
            other => error!(session_id = %core.id, error = %other, "failed processing pdu"),
        }
    }
}

async fn resolve_response(core: &Arc<SessionCore>, frame: &PduFrame) {
    let sequence = frame.sequence();

    // The peer acknowledged our unbind; leave the bound state before the
    // caller proceeds to close.
    if frame.command() == Command::UnbindResp {
        core.context.unbound().await;
    }

    if frame.command() == Command::GenericNack {
        let failed = core.pending.fail(
            sequence,
            Error::InvalidResponse(format!(
                "generic_nack with command_status {}",
                frame.header.status
            )),
        );
        if !failed {
            warn!(session_id = %core.id, sequence_number = sequence, "stray generic_nack");
        }
        return;
    }

    match Pdu::parse(&frame.header, &frame.body) {
        Ok(pdu) => {
            let response = Response {
                header: frame.header,
                pdu,
            };
            if !core.pending.complete(sequence, response) {
                warn!(
                    session_id = %core.id,
                    command = frame.command().name(),
                    sequence_number = sequence,
                    "response with unknown sequence_number, discarding"
                );
            }
        }
        Err(parse_error) => {
            let failed = core.pending.fail(
                sequence,
                Error::InvalidResponse(format!("{}: {parse_error}", frame.command().name())),
            );
            if !failed {
                warn!(
                    session_id = %core.id,
                    command = frame.command().name(),
                    sequence_number = sequence,
                    error = %parse_error,
                    "undecodable response with unknown sequence_number"
                );
            }
        }
    }
}

async fn handle_request(core: &Arc<SessionCore>, frame: PduFrame) -> Result<(), Error> {
    let sequence = frame.sequence();
    let pdu = match Pdu::parse(&frame.header, &frame.body) {
        Ok(pdu) => pdu,
        Err(parse_error) => {
            warn!(
                session_id = %core.id,
                command = frame.command().name(),
                error = %parse_error,
                "undecodable request body"
            );
            return core
                .write(
                    Header::with_status(Command::GenericNack, sequence, Status::SystemError),
                    Pdu::GenericNack,
                )
                .await;
        }
    };

    match pdu {
        Pdu::EnquireLink => {
            trace!(session_id = %core.id, "answering enquire_link");
            core.write(
                Header::with_status(Command::EnquireLinkResp, sequence, Status::Ok),
                Pdu::EnquireLinkResp,
            )
            .await
        }
        Pdu::Unbind => handle_unbind(core, sequence).await,
        Pdu::DeliverSm(deliver_sm) => handle_deliver_sm(core, sequence, *deliver_sm).await,
        Pdu::DataSm(data_sm) => handle_data_sm(core, sequence, data_sm).await,
        Pdu::AlertNotification(alert) => {
            handle_alert_notification(core, alert).await;
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn handle_unbind(core: &Arc<SessionCore>, sequence: u32) -> Result<(), Error> {
    debug!(session_id = %core.id, "unbind requested by peer");
    core.write(
        Header::with_status(Command::UnbindResp, sequence, Status::Ok),
        Pdu::UnbindResp,
    )
    .await?;
    core.context.unbound().await;
    core.close().await;
    Ok(())
}

async fn handle_deliver_sm(
    core: &Arc<SessionCore>,
    sequence: u32,
    deliver_sm: DeliverSm,
) -> Result<(), Error> {
    let Some(listener) = core.receiver() else {
        warn!(
            session_id = %core.id,
            source = %deliver_sm.source_addr,
            "deliver_sm received but no message receiver listener registered"
        );
        return core
            .send_negative_response(Command::DeliverSm, Status::RxTemporaryAppError, sequence)
            .await;
    };

    let outcome = AssertUnwindSafe(listener.on_accept_deliver_sm(deliver_sm))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(())) => {
            core.write(
                Header::with_status(Command::DeliverSmResp, sequence, Status::Ok),
                Pdu::DeliverSmResp(DeliverSmResp::default()),
            )
            .await
        }
        Ok(Err(app_error)) => {
            debug!(
                session_id = %core.id,
                status = %app_error.status,
                message = %app_error.message,
                "deliver_sm rejected by listener"
            );
            core.send_negative_response(Command::DeliverSm, app_error.status, sequence)
                .await
        }
        Err(_) => {
            error!(session_id = %core.id, "deliver_sm listener panicked");
            core.send_negative_response(Command::DeliverSm, Status::RxTemporaryAppError, sequence)
                .await
        }
    }
}

async fn handle_data_sm(
    core: &Arc<SessionCore>,
    sequence: u32,
    data_sm: DataSm,
) -> Result<(), Error> {
    let Some(listener) = core.receiver() else {
        warn!(
            session_id = %core.id,
            source = %data_sm.source_addr,
            "data_sm received but no message receiver listener registered"
        );
        return core
            .send_negative_response(Command::DataSm, Status::RxRejected, sequence)
            .await;
    };

    let session = Session::from_core(core.clone());
    let outcome = AssertUnwindSafe(listener.on_accept_data_sm(data_sm, &session))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(result)) => {
            core.write(
                Header::with_status(Command::DataSmResp, sequence, Status::Ok),
                Pdu::DataSmResp(DataSmResp {
                    message_id: result.message_id,
                    tlvs: result.tlvs,
                }),
            )
            .await
        }
        Ok(Err(app_error)) => {
            debug!(
                session_id = %core.id,
                status = %app_error.status,
                message = %app_error.message,
                "data_sm rejected by listener"
            );
            core.send_negative_response(Command::DataSm, app_error.status, sequence)
                .await
        }
        Err(_) => {
            error!(session_id = %core.id, "data_sm listener panicked");
            core.send_negative_response(Command::DataSm, Status::RxTemporaryAppError, sequence)
                .await
        }
    }
}

async fn handle_alert_notification(core: &Arc<SessionCore>, alert: AlertNotification) {
    let Some(listener) = core.receiver() else {
        warn!(
            session_id = %core.id,
            source = %alert.source_addr,
            "alert_notification received but no message receiver listener registered"
        );
        return;
    };
    let outcome = AssertUnwindSafe(listener.on_accept_alert_notification(alert))
        .catch_unwind()
        .await;
    if outcome.is_err() {
        error!(session_id = %core.id, "alert_notification listener panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_state_only_accepts_responses() {
        assert_eq!(
            action_for(SessionState::Open, Command::BindTransceiverResp),
            Action::CompletePending
        );
        for command in [Command::EnquireLink, Command::DeliverSm, Command::Unbind] {
            assert_eq!(
                action_for(SessionState::Open, command),
                Action::RespondInvalidBindStatus
            );
        }
    }

    #[test]
    fn enquire_link_is_legal_in_every_bound_state() {
        for state in [
            SessionState::BoundTx,
            SessionState::BoundRx,
            SessionState::BoundTrx,
        ] {
            assert_eq!(action_for(state, Command::EnquireLink), Action::Handle);
            assert_eq!(action_for(state, Command::Unbind), Action::Handle);
        }
    }

    #[test]
    fn delivery_needs_a_receivable_bind() {
        assert_eq!(
            action_for(SessionState::BoundTx, Command::DeliverSm),
            Action::RespondInvalidBindStatus
        );
        assert_eq!(action_for(SessionState::BoundRx, Command::DeliverSm), Action::Handle);
        assert_eq!(action_for(SessionState::BoundTrx, Command::DataSm), Action::Handle);
        assert_eq!(
            action_for(SessionState::BoundTrx, Command::AlertNotification),
            Action::Handle
        );
    }

    #[test]
    fn unknown_commands_are_nacked() {
        assert_eq!(
            action_for(SessionState::BoundTrx, Command::Unknown(0xFF)),
            Action::RespondUnknownCommand
        );
    }

    #[test]
    fn peer_side_requests_are_rejected() {
        for command in [Command::SubmitSm, Command::BindTransmitter, Command::Outbind] {
            assert_eq!(
                action_for(SessionState::BoundTrx, command),
                Action::RespondInvalidBindStatus
            );
        }
    }
}
