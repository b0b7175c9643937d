//! Delivery-side application callbacks.

use async_trait::async_trait;
use thiserror::Error;

use crate::pdu::{AlertNotification, DataSm, DeliverSm, Status, TlvMap};
use crate::session::Session;

/// Failure reported by a callback; its status is sent back to the SMSC as a
/// negative response.
#[derive(Debug, Error)]
#[error("{message} (command_status {status})")]
pub struct ProcessRequestError {
    pub status: Status,
    pub message: String,
}

impl ProcessRequestError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Result of accepting a data_sm, echoed in the data_sm_resp.
#[derive(Debug, Clone, Default)]
pub struct DataSmResult {
    pub message_id: String,
    pub tlvs: TlvMap,
}

/// Application hooks for SMSC-initiated PDUs.
///
/// Callbacks run on the processing pool; a slow callback applies backpressure
/// to the peer. Errors and panics are translated into negative responses with
/// ESME_RX_T_APPN.
#[async_trait]
pub trait MessageReceiverListener: Send + Sync {
    async fn on_accept_deliver_sm(&self, deliver_sm: DeliverSm) -> Result<(), ProcessRequestError>;

    async fn on_accept_data_sm(
        &self,
        data_sm: DataSm,
        session: &Session,
    ) -> Result<DataSmResult, ProcessRequestError>;

    async fn on_accept_alert_notification(&self, _alert_notification: AlertNotification) {}
}
