//! Single reader task: frames inbound PDUs and feeds the processing pool.

use std::sync::Arc;

use futures::StreamExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::pdu::{CodecError, Command, Header, Pdu, SmppCodec, Status};

use super::pool::{ProcessTask, SubmitError};
use super::session::SessionCore;

pub(crate) async fn run(core: Arc<SessionCore>, mut framed: FramedRead<OwnedReadHalf, SmppCodec>) {
    debug!(session_id = %core.id, "pdu reader started");
    let mut shutdown = core.shutdown_receiver();

    loop {
        if !core.context.state().is_read_pdu() || *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => break,

            next = timeout(core.config.enquire_link_timer, framed.next()) => match next {
                // Read timeout is not an error: the link has been quiet for a
                // full enquire_link_timer, so ask the keepalive for a probe.
                Err(_) => {
                    if core.context.state().is_bound() {
                        core.probe.request();
                    }
                }
                Ok(None) => {
                    info!(session_id = %core.id, "connection closed by peer");
                    break;
                }
                Ok(Some(Err(CodecError::InvalidCommandLength { length }))) => {
                    warn!(session_id = %core.id, length, "received invalid command_length");
                    if let Err(error) = core
                        .write(
                            Header::with_status(Command::GenericNack, 0, Status::InvalidCommandLength),
                            Pdu::GenericNack,
                        )
                        .await
                    {
                        warn!(session_id = %core.id, error = %error, "failed sending generic_nack");
                    }
                    core.unbind_and_close().await;
                    break;
                }
                Ok(Some(Err(error))) => {
                    info!(
                        session_id = %core.id,
                        state = %core.context.state(),
                        error = %error,
                        "error reading pdu"
                    );
                    break;
                }
                Ok(Some(Ok(frame))) => {
                    let task = ProcessTask {
                        frame,
                        session: core.clone(),
                    };
                    match core.pool.submit(task).await {
                        Ok(()) => {}
                        Err(SubmitError::QueueFull { command, sequence }) => {
                            info!(
                                session_id = %core.id,
                                capacity = core.config.queue_capacity,
                                command = command.name(),
                                "processing queue full, notifying peer to throttle"
                            );
                            if let Err(error) = core
                                .send_negative_response(command, Status::Throttled, sequence)
                                .await
                            {
                                warn!(session_id = %core.id, error = %error, "failed sending throttle response");
                                break;
                            }
                        }
                        Err(SubmitError::ResponseEnqueueTimeout) => {
                            warn!(session_id = %core.id, "timed out enqueueing response for processing");
                        }
                        Err(SubmitError::Closed) => break,
                    }
                }
            }
        }
    }

    core.close().await;
    if core.pool_owned {
        core.pool.shutdown(core.config.transaction_timer).await;
    }
    debug!(session_id = %core.id, "pdu reader stopped");
}
