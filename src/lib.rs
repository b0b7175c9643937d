//! SMPP client session engine.
//!
//! Maintains a bound, correlated, bidirectional PDU stream with an SMSC:
//! concurrent requests multiplexed over one socket, SMSC-initiated deliveries
//! dispatched to a bounded processing pool, and liveness kept by periodic
//! enquire_link probes.
//!
//! ```rust,no_run
//! use smppc::{BindParameter, BindType, Session};
//! use smppc::pdu::SubmitSm;
//!
//! # async fn example() -> smppc::Result<()> {
//! let bind = BindParameter::new(BindType::Transceiver, "ESME", "secret");
//! let session = Session::connect_and_bind("smsc.example.com:2775", &bind).await?;
//!
//! let message_id = session
//!     .submit_sm(SubmitSm {
//!         source_addr: "12345".into(),
//!         dest_addr: "491701234567".into(),
//!         short_message: b"hello".to_vec(),
//!         ..SubmitSm::default()
//!     })
//!     .await?;
//! println!("accepted as {message_id}");
//!
//! session.unbind_and_close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pdu;
pub mod session;

pub use config::{BindParameter, SessionConfig};
pub use error::{Error, Result};
pub use session::{
    BindType, DataSmResult, MessageReceiverListener, ProcessRequestError, QuerySmResult, Session,
    SessionBuilder, SessionGroup, SessionId, SessionState, SessionStateListener, SubmitMultiResult,
};
