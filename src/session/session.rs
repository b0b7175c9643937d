//! The client session: connect, bind, request/response plumbing, teardown.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::config::{BindParameter, SessionConfig};
use crate::error::{Error, Result};
use crate::pdu::{
    Bind, CancelSm, CodecError, Command, DataSm, Header, Outbind, Pdu, QuerySm, ReplaceSm,
    SmppCodec, SubmitMulti, SubmitSm, UnsuccessSme,
};

use super::context::{SessionContext, SessionStateListener};
use super::keepalive::{self, ProbeSignal};
use super::pending::{PendingHandle, PendingTable, Response};
use super::pool::ProcessorPool;
use super::reader;
use super::receiver::{DataSmResult, MessageReceiverListener};
use super::sequence::Sequence;
use super::state::SessionState;
use super::SessionId;

/// Outcome of a query_sm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySmResult {
    pub final_date: String,
    pub message_state: u8,
    pub error_code: u8,
}

/// Outcome of a submit_multi: the assigned id plus any destinations the
/// SMSC could not serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitMultiResult {
    pub message_id: String,
    pub unsuccess: Vec<UnsuccessSme>,
}

/// Shared state behind every `Session` handle and background task.
pub(crate) struct SessionCore {
    pub(crate) id: SessionId,
    pub(crate) config: SessionConfig,
    pub(crate) context: SessionContext,
    pub(crate) pending: PendingTable,
    pub(crate) pool: Arc<ProcessorPool>,
    pub(crate) pool_owned: bool,
    pub(crate) probe: ProbeSignal,
    sequence: Sequence,
    writer: tokio::sync::Mutex<Option<FramedWrite<OwnedWriteHalf, SmppCodec>>>,
    shutdown_tx: watch::Sender<bool>,
    keepalive_handle: Mutex<Option<JoinHandle<()>>>,
    receiver: Option<Arc<dyn MessageReceiverListener>>,
    smsc_system_id: Mutex<String>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl SessionCore {
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn receiver(&self) -> Option<Arc<dyn MessageReceiverListener>> {
        self.receiver.clone()
    }

    /// Serialized PDU write; all writers (callers, processors, keepalive)
    /// funnel through here.
    pub async fn write(&self, header: Header, pdu: Pdu) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let framed = guard.as_mut().ok_or(Error::Closed)?;
        framed.send((header, pdu)).await.map_err(|error| match error {
            CodecError::Encode(encode_error) => Error::Encode(encode_error),
            CodecError::Io(io_error) => Error::Io(io_error),
            CodecError::InvalidCommandLength { length } => Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid command_length {length}"),
            )),
        })
    }

    /// Header-only negative response to a peer request.
    pub async fn send_negative_response(
        &self,
        command: Command,
        status: crate::pdu::Status,
        sequence: u32,
    ) -> Result<()> {
        let response = command.response().unwrap_or(Command::GenericNack);
        self.write(Header::with_status(response, sequence, status), Pdu::HeaderOnly)
            .await
    }

    /// Draw a sequence number and reserve its pending slot, skipping any
    /// wrapped value that is still outstanding.
    fn allocate(&self) -> (u32, PendingHandle) {
        loop {
            let sequence = self.sequence.next();
            if let Some(handle) = self.pending.insert(sequence) {
                return (sequence, handle);
            }
        }
    }

    /// The request/response skeleton shared by every operation: reserve,
    /// write, await, validate status.
    pub(crate) async fn execute_send_command(
        &self,
        command: Command,
        pdu: Pdu,
        deadline: Duration,
    ) -> Result<Response> {
        let (sequence, handle) = self.allocate();
        let header = Header::new(command, sequence);

        if let Err(error) = self.write(header, pdu).await {
            match error {
                Error::Encode(encode_error) => {
                    self.pending.remove(sequence);
                    return Err(Error::Encode(encode_error));
                }
                error if command == Command::EnquireLink => {
                    // The keepalive tolerates transient write failures; the
                    // pending entry stays and times out if the link is dead.
                    info!(
                        session_id = %self.id,
                        error = %error,
                        "ignoring enquire_link write failure, waiting for link recovery"
                    );
                }
                error => {
                    error!(
                        session_id = %self.id,
                        command = command.name(),
                        error = %error,
                        "failed sending command"
                    );
                    self.pending.remove(sequence);
                    self.close().await;
                    return Err(error);
                }
            }
        }

        let response = self.pending.wait(handle, deadline, command.name()).await?;
        debug!(
            session_id = %self.id,
            command = command.name(),
            sequence_number = sequence,
            "response received"
        );
        if !response.header.status.is_ok() {
            return Err(Error::NegativeResponse(response.header.status));
        }
        Ok(response)
    }

    /// Fire-and-forget command; a write failure closes the session.
    async fn execute_send_command_no_response(&self, command: Command, pdu: Pdu) -> Result<()> {
        let sequence = self.sequence.next();
        let header = Header::new(command, sequence);
        if let Err(error) = self.write(header, pdu).await {
            if let Error::Encode(encode_error) = error {
                return Err(Error::Encode(encode_error));
            }
            error!(
                session_id = %self.id,
                command = command.name(),
                error = %error,
                "failed sending command"
            );
            self.close().await;
            return Err(error);
        }
        Ok(())
    }

    /// Probe the link. A negative status on the response is logged and
    /// tolerated; the keepalive acts only on timeouts and invalid responses.
    pub(crate) async fn send_enquire_link(&self) -> Result<()> {
        let deadline = self.config.transaction_timer;
        match self
            .execute_send_command(Command::EnquireLink, Pdu::EnquireLink, deadline)
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::NegativeResponse(status)) => {
                warn!(
                    session_id = %self.id,
                    status = %status,
                    "enquire_link_resp carried a non-zero command_status"
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    pub(crate) async fn unbind(&self) -> Result<()> {
        if self.context.state() == SessionState::Closed {
            return Err(Error::Closed);
        }
        match self
            .execute_send_command(Command::Unbind, Pdu::Unbind, self.config.transaction_timer)
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::NegativeResponse(status)) => {
                warn!(
                    session_id = %self.id,
                    status = %status,
                    "unbind_resp carried a non-zero command_status"
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    pub(crate) async fn unbind_and_close(&self) {
        debug!(session_id = %self.id, "unbind and close session");
        if self.context.state().is_bound() {
            if let Err(error) = self.unbind().await {
                error!(session_id = %self.id, error = %error, "graceful unbind failed");
            }
        }
        self.close().await;
    }

    /// Idempotent teardown: signal the tasks, close the socket, stop the
    /// keepalive, force the state to CLOSED with a bounded wait and drain
    /// every pending waiter. The reader shuts the owned pool down itself.
    pub(crate) async fn close(&self) {
        debug!(
            session_id = %self.id,
            state = %self.context.state(),
            "closing session"
        );
        self.shutdown_tx.send_replace(true);

        {
            let mut guard = self.writer.lock().await;
            if let Some(mut framed) = guard.take() {
                if let Err(error) = framed.get_mut().shutdown().await {
                    debug!(session_id = %self.id, error = %error, "error shutting down socket");
                }
            }
        }

        // The driver must not wait for its own task to finish.
        if !keepalive::in_keepalive_task() {
            let handle = self.keepalive_handle.lock().expect("keepalive handle lock").take();
            if let Some(handle) = handle {
                let _ = handle.await;
            }
        }

        if !self.context.try_close(self.config.transaction_timer).await {
            debug!(
                session_id = %self.id,
                "timed out waiting for the close transition, proceeding"
            );
        }

        self.pending.drain_all();
    }

    /// Non-blocking teardown used when the last session handle is dropped
    /// without an explicit close.
    fn begin_close(&self) {
        if self.shutdown_tx.send_replace(true) {
            return;
        }
        debug!(session_id = %self.id, "session handle dropped, tearing down");
        self.pending.drain_all();
        self.context.force_closed();
    }
}

/// Releases the session when the last public handle goes away; the
/// background tasks hold the core but never a guard.
struct CloseGuard {
    core: Weak<SessionCore>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if let Some(core) = self.core.upgrade() {
            core.begin_close();
        }
    }
}

/// Handle to a bound SMPP client session.
///
/// Cheap to clone; all clones drive the same connection. Requests may be
/// issued concurrently from any number of tasks; responses are correlated by
/// sequence_number, not ordering.
#[derive(Clone)]
pub struct Session {
    core: Arc<SessionCore>,
    _guard: Option<Arc<CloseGuard>>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Connect and bind with default configuration.
    pub async fn connect_and_bind(
        addr: impl ToSocketAddrs,
        bind: &BindParameter,
    ) -> Result<Session> {
        Self::builder().connect_and_bind(addr, bind).await
    }

    /// Handle without a close guard, handed to receiver callbacks.
    pub(crate) fn from_core(core: Arc<SessionCore>) -> Session {
        Session { core, _guard: None }
    }

    fn ensure_transmittable(&self, operation: &'static str) -> Result<()> {
        let state = self.core.context.state();
        if !state.is_transmittable() {
            return Err(Error::IllegalState { operation, state });
        }
        Ok(())
    }

    /// Submit one short message; returns the SMSC-assigned message id.
    pub async fn submit_sm(&self, submit_sm: SubmitSm) -> Result<String> {
        self.ensure_transmittable("submit_sm")?;
        let response = self
            .core
            .execute_send_command(
                Command::SubmitSm,
                Pdu::SubmitSm(Box::new(submit_sm)),
                self.core.config.transaction_timer,
            )
            .await?;
        match response.pdu {
            Pdu::SubmitSmResp(resp) => Ok(resp.message_id),
            _ => Err(Error::InvalidResponse("expected submit_sm_resp".into())),
        }
    }

    /// Submit to several destinations at once.
    pub async fn submit_multi(&self, submit_multi: SubmitMulti) -> Result<SubmitMultiResult> {
        self.ensure_transmittable("submit_multi")?;
        let response = self
            .core
            .execute_send_command(
                Command::SubmitMulti,
                Pdu::SubmitMulti(Box::new(submit_multi)),
                self.core.config.transaction_timer,
            )
            .await?;
        match response.pdu {
            Pdu::SubmitMultiResp(resp) => Ok(SubmitMultiResult {
                message_id: resp.message_id,
                unsuccess: resp.unsuccess,
            }),
            _ => Err(Error::InvalidResponse("expected submit_multi_resp".into())),
        }
    }

    /// Query the state of a previously submitted message.
    pub async fn query_sm(&self, query_sm: QuerySm) -> Result<QuerySmResult> {
        self.ensure_transmittable("query_sm")?;
        let message_id = query_sm.message_id.clone();
        let response = self
            .core
            .execute_send_command(
                Command::QuerySm,
                Pdu::QuerySm(query_sm),
                self.core.config.transaction_timer,
            )
            .await?;
        match response.pdu {
            Pdu::QuerySmResp(resp) => {
                if resp.message_id != message_id {
                    return Err(Error::InvalidResponse(format!(
                        "query_sm_resp message_id {} does not match requested {}",
                        resp.message_id, message_id
                    )));
                }
                Ok(QuerySmResult {
                    final_date: resp.final_date,
                    message_state: resp.message_state,
                    error_code: resp.error_code,
                })
            }
            _ => Err(Error::InvalidResponse("expected query_sm_resp".into())),
        }
    }

    pub async fn cancel_sm(&self, cancel_sm: CancelSm) -> Result<()> {
        self.ensure_transmittable("cancel_sm")?;
        self.core
            .execute_send_command(
                Command::CancelSm,
                Pdu::CancelSm(cancel_sm),
                self.core.config.transaction_timer,
            )
            .await?;
        Ok(())
    }

    pub async fn replace_sm(&self, replace_sm: ReplaceSm) -> Result<()> {
        self.ensure_transmittable("replace_sm")?;
        self.core
            .execute_send_command(
                Command::ReplaceSm,
                Pdu::ReplaceSm(Box::new(replace_sm)),
                self.core.config.transaction_timer,
            )
            .await?;
        Ok(())
    }

    /// Exchange a data_sm with the SMSC.
    pub async fn data_sm(&self, data_sm: DataSm) -> Result<DataSmResult> {
        self.ensure_transmittable("data_sm")?;
        let response = self
            .core
            .execute_send_command(
                Command::DataSm,
                Pdu::DataSm(data_sm),
                self.core.config.transaction_timer,
            )
            .await?;
        match response.pdu {
            Pdu::DataSmResp(resp) => Ok(DataSmResult {
                message_id: resp.message_id,
                tlvs: resp.tlvs,
            }),
            _ => Err(Error::InvalidResponse("expected data_sm_resp".into())),
        }
    }

    /// Send an outbind; no response is defined for it.
    pub async fn send_outbind(&self, system_id: &str, password: &str) -> Result<()> {
        if self.core.context.state() == SessionState::Closed {
            return Err(Error::Closed);
        }
        self.core
            .execute_send_command_no_response(
                Command::Outbind,
                Pdu::Outbind(Outbind {
                    system_id: system_id.to_owned(),
                    password: password.to_owned(),
                }),
            )
            .await
    }

    /// Graceful unbind; the peer's unbind_resp moves the session to UNBOUND.
    pub async fn unbind(&self) -> Result<()> {
        self.core.unbind().await
    }

    /// Attempt a graceful unbind, then close regardless of its outcome.
    pub async fn unbind_and_close(&self) {
        self.core.unbind_and_close().await;
    }

    /// Close the session. Safe to call repeatedly.
    pub async fn close(&self) {
        self.core.close().await;
    }

    pub fn session_id(&self) -> &SessionId {
        &self.core.id
    }

    pub fn session_state(&self) -> SessionState {
        self.core.context.state()
    }

    /// System id the SMSC reported in its bind response.
    pub fn smsc_system_id(&self) -> String {
        self.core.smsc_system_id.lock().expect("system id lock").clone()
    }

    /// Wall-clock milliseconds of the last inbound activity.
    pub fn last_activity(&self) -> u64 {
        self.core.context.last_activity()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.core.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.core.peer_addr
    }

    pub fn add_state_listener(&self, listener: Arc<dyn SessionStateListener>) {
        self.core.context.add_listener(listener);
    }

    pub fn remove_state_listener(&self, listener: &Arc<dyn SessionStateListener>) {
        self.core.context.remove_listener(listener);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.core.id)
            .field("state", &self.core.context.state())
            .field("peer_addr", &self.core.peer_addr)
            .finish()
    }
}

/// Builds and binds a session. Pool sizing and callbacks are fixed here;
/// none of them can change once the session is running.
pub struct SessionBuilder {
    config: SessionConfig,
    receiver: Option<Arc<dyn MessageReceiverListener>>,
    state_listeners: Vec<Arc<dyn SessionStateListener>>,
    shared_pool: Option<Arc<ProcessorPool>>,
}

impl SessionBuilder {
    fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            receiver: None,
            state_listeners: Vec::new(),
            shared_pool: None,
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn message_receiver(mut self, listener: Arc<dyn MessageReceiverListener>) -> Self {
        self.receiver = Some(listener);
        self
    }

    pub fn state_listener(mut self, listener: Arc<dyn SessionStateListener>) -> Self {
        self.state_listeners.push(listener);
        self
    }

    pub(crate) fn shared_pool(mut self, pool: Arc<ProcessorPool>) -> Self {
        self.shared_pool = Some(pool);
        self
    }

    /// Open the connection, start the reader, perform the bind handshake and
    /// start the keepalive. Any bind failure closes the connection.
    pub async fn connect_and_bind(
        self,
        addr: impl ToSocketAddrs,
        bind: &BindParameter,
    ) -> Result<Session> {
        let stream = TcpStream::connect(addr).await?;
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();

        let id = SessionId::generate();
        info!(
            session_id = %id,
            local_port = local_addr.port(),
            peer = %peer_addr,
            "connected"
        );

        let pool_owned = self.shared_pool.is_none();
        let pool = match self.shared_pool {
            Some(pool) => pool,
            None => Arc::new(ProcessorPool::for_session(
                self.config.pdu_processor_degree,
                self.config.queue_capacity,
            )),
        };

        let context = SessionContext::new(id.clone());
        for listener in self.state_listeners {
            context.add_listener(listener);
        }

        let (shutdown_tx, _) = watch::channel(false);
        let core = Arc::new(SessionCore {
            id,
            config: self.config,
            context,
            pending: PendingTable::new(),
            pool,
            pool_owned,
            probe: ProbeSignal::new(),
            sequence: Sequence::new(),
            writer: tokio::sync::Mutex::new(Some(FramedWrite::new(write_half, SmppCodec::new()))),
            shutdown_tx,
            keepalive_handle: Mutex::new(None),
            receiver: self.receiver,
            smsc_system_id: Mutex::new(String::new()),
            local_addr,
            peer_addr,
        });

        core.context.open().await;

        let framed = FramedRead::new(read_half, SmppCodec::new());
        tokio::spawn(reader::run(core.clone(), framed));

        match Self::bind(&core, bind).await {
            Ok(smsc_system_id) => {
                info!(
                    session_id = %core.id,
                    smsc_system_id = %smsc_system_id,
                    state = %core.context.state(),
                    "session bound"
                );
                let keepalive_task = tokio::spawn(keepalive::run(core.clone()));
                *core.keepalive_handle.lock().expect("keepalive handle lock") =
                    Some(keepalive_task);
                let guard = Arc::new(CloseGuard {
                    core: Arc::downgrade(&core),
                });
                Ok(Session {
                    core,
                    _guard: Some(guard),
                })
            }
            Err(error) => {
                error!(session_id = %core.id, error = %error, "bind failed");
                core.close().await;
                Err(error)
            }
        }
    }

    async fn bind(core: &Arc<SessionCore>, bind: &BindParameter) -> Result<String> {
        let fields = Bind {
            system_id: bind.system_id.clone(),
            password: bind.password.clone(),
            system_type: bind.system_type.clone(),
            interface_version: bind.interface_version,
            addr_ton: bind.addr_ton,
            addr_npi: bind.addr_npi,
            address_range: bind.address_range.clone(),
        };
        let pdu = match bind.bind_type {
            super::state::BindType::Transmitter => Pdu::BindTransmitter(fields),
            super::state::BindType::Receiver => Pdu::BindReceiver(fields),
            super::state::BindType::Transceiver => Pdu::BindTransceiver(fields),
        };

        let response = core
            .execute_send_command(bind.bind_type.command(), pdu, core.config.bind_timer)
            .await?;
        let resp = match response.pdu {
            Pdu::BindTransmitterResp(resp)
            | Pdu::BindReceiverResp(resp)
            | Pdu::BindTransceiverResp(resp) => resp,
            _ => return Err(Error::InvalidResponse("expected a bind response".into())),
        };

        if let Some(version) = resp.sc_interface_version() {
            info!(
                session_id = %core.id,
                interface_version = version,
                "peer reported SMPP interface version"
            );
        }

        *core.smsc_system_id.lock().expect("system id lock") = resp.system_id.clone();
        core.context.bound(bind.bind_type).await;
        if core.pool_owned {
            core.pool.on_bound();
        }
        Ok(resp.system_id)
    }
}
