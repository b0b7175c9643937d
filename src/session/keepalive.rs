//! Keepalive driver: answers reader idle notifications with enquire_link.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, error};

use crate::error::Error;

use super::session::SessionCore;

/// How long the driver sleeps between signal checks while idle.
const PROBE_RECHECK: Duration = Duration::from_millis(500);

/// Edge-triggered "probe now" signal raised by the reader on socket read
/// timeout. Requests coalesce: while a probe is pending, further requests
/// are no-ops, so at most one probe is ever in flight.
pub(crate) struct ProbeSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl ProbeSignal {
    pub fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            self.notify.notify_one();
        } else {
            debug!("probe already pending, coalescing");
        }
    }

    /// Claim the pending request, clearing it before the probe is issued.
    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }

    async fn wait(&self) {
        let _ = timeout(PROBE_RECHECK, self.notify.notified()).await;
    }
}

tokio::task_local! {
    static KEEPALIVE_TASK: ();
}

/// Whether the current task is the keepalive driver. `close()` consults this
/// so the driver never tries to join itself.
pub(crate) fn in_keepalive_task() -> bool {
    KEEPALIVE_TASK.try_with(|_| ()).is_ok()
}

/// Driver loop; one task per session, started after a successful bind.
pub(crate) async fn run(core: Arc<SessionCore>) {
    KEEPALIVE_TASK.scope((), run_inner(core)).await
}

async fn run_inner(core: Arc<SessionCore>) {
    debug!(session_id = %core.id, "enquire_link sender started");
    let mut shutdown = core.shutdown_receiver();

    while core.context.state().is_read_pdu() && !*shutdown.borrow() {
        if !core.probe.take() {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = core.probe.wait() => {}
            }
            continue;
        }
        if !core.context.state().is_bound() {
            continue;
        }

        match core.send_enquire_link().await {
            Ok(()) => {}
            Err(Error::ResponseTimeout { waited, .. }) => {
                error!(
                    session_id = %core.id,
                    waited_ms = waited.as_millis() as u64,
                    "enquire_link response timed out"
                );
                core.close().await;
            }
            Err(Error::InvalidResponse(reason)) => {
                error!(session_id = %core.id, reason = %reason, "invalid enquire_link response");
                core.unbind_and_close().await;
            }
            Err(Error::Closed) => break,
            Err(error) => {
                error!(session_id = %core.id, error = %error, "enquire_link failed");
                core.close().await;
            }
        }
    }

    debug!(session_id = %core.id, "enquire_link sender stopped");
}
