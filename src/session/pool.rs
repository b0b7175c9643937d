//! Bounded processing pool for inbound PDUs.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::pdu::{Command, PduFrame};

use super::machine;
use super::session::SessionCore;

/// How long the reader may block to enqueue a response when the queue is
/// full. Responses are never dropped; dropping one would leak a pending
/// entry until its timeout.
const RESPONSE_ENQUEUE_WAIT: Duration = Duration::from_secs(60);

/// One inbound PDU bound to the session that read it. Tasks from many
/// sessions can interleave on a shared pool.
pub(crate) struct ProcessTask {
    pub frame: PduFrame,
    pub session: Arc<SessionCore>,
}

impl ProcessTask {
    async fn run(self) {
        machine::process(&self.session, self.frame).await;
    }
}

#[derive(Debug)]
pub(crate) enum SubmitError {
    /// A peer request found the queue full; answer with ESME_RTHROTTLED.
    QueueFull { command: Command, sequence: u32 },
    /// A response could not be enqueued within the blocking allowance.
    ResponseEnqueueTimeout,
    Closed,
}

/// Fixed set of workers draining a bounded queue.
///
/// Admission is asymmetric: responses block until space frees up, requests
/// from the peer are rejected so the peer gets throttled, never us.
pub(crate) struct ProcessorPool {
    tx: Mutex<Option<mpsc::Sender<ProcessTask>>>,
    workers: Arc<Semaphore>,
    worker_permits: Arc<AtomicU32>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    target_degree: usize,
    resized: AtomicBool,
}

impl ProcessorPool {
    /// Pool owned by a single session: serial until the session binds, then
    /// widened to `degree`.
    pub fn for_session(degree: usize, queue_capacity: usize) -> Self {
        Self::start(1, degree, queue_capacity)
    }

    /// Pool shared by a session group; its degree is fixed up front.
    pub fn shared(degree: usize, queue_capacity: usize) -> Self {
        let pool = Self::start(degree, degree, queue_capacity);
        pool.resized.store(true, Ordering::SeqCst);
        pool
    }

    fn start(initial_degree: usize, target_degree: usize, queue_capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<ProcessTask>(queue_capacity);
        let workers = Arc::new(Semaphore::new(initial_degree));
        let worker_permits = Arc::new(AtomicU32::new(initial_degree as u32));

        let dispatcher_workers = workers.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                let permit = match dispatcher_workers.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    task.run().await;
                    drop(permit);
                });
            }
            debug!("pdu processor dispatcher stopped");
        });

        Self {
            tx: Mutex::new(Some(tx)),
            workers,
            worker_permits,
            dispatcher: Mutex::new(Some(dispatcher)),
            target_degree,
            resized: AtomicBool::new(false),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<ProcessTask>> {
        self.tx.lock().expect("pool sender lock").clone()
    }

    pub async fn submit(&self, task: ProcessTask) -> Result<(), SubmitError> {
        let Some(tx) = self.sender() else {
            return Err(SubmitError::Closed);
        };
        if task.frame.is_response() {
            match tx.send_timeout(task, RESPONSE_ENQUEUE_WAIT).await {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(_)) => Err(SubmitError::ResponseEnqueueTimeout),
                Err(SendTimeoutError::Closed(_)) => Err(SubmitError::Closed),
            }
        } else {
            match tx.try_send(task) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(task)) => Err(SubmitError::QueueFull {
                    command: task.frame.command(),
                    sequence: task.frame.sequence(),
                }),
                Err(TrySendError::Closed(_)) => Err(SubmitError::Closed),
            }
        }
    }

    /// Widen a per-session pool to its configured degree once bound.
    pub fn on_bound(&self) {
        if self.resized.swap(true, Ordering::SeqCst) {
            return;
        }
        let extra = self.target_degree.saturating_sub(1);
        if extra > 0 {
            info!(degree = self.target_degree, "widening pdu processor pool");
            self.workers.add_permits(extra);
            self.worker_permits.fetch_add(extra as u32, Ordering::SeqCst);
        }
    }

    /// Number of tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        match self.sender() {
            Some(tx) => tx.max_capacity() - tx.capacity(),
            None => 0,
        }
    }

    pub fn degree(&self) -> usize {
        self.worker_permits.load(Ordering::SeqCst) as usize
    }

    /// Stop accepting tasks, drain the queue and wait up to `wait` for
    /// in-flight processing to finish.
    pub async fn shutdown(&self, wait: Duration) {
        {
            self.tx.lock().expect("pool sender lock").take();
        }
        let dispatcher = self.dispatcher.lock().expect("pool dispatcher lock").take();
        let Some(dispatcher) = dispatcher else {
            return;
        };

        let workers = self.workers.clone();
        let worker_permits = self.worker_permits.clone();
        let drained = timeout(wait, async move {
            let _ = dispatcher.await;
            // Queue is empty once the dispatcher exits; reclaiming every
            // permit means in-flight tasks are done too.
            let total = worker_permits.load(Ordering::SeqCst);
            let _ = workers.acquire_many(total).await;
        })
        .await;

        if drained.is_err() {
            warn!(wait_ms = wait.as_millis() as u64, "pdu processor pool did not drain in time");
        }
    }

    /// Group shutdown allowance: a grace second plus one task timeout per
    /// queued batch.
    pub async fn shutdown_with_allowance(&self, single_task_timeout: Duration) {
        let batches = (self.queued() / self.degree().max(1)) as u32;
        let wait = Duration::from_millis(1000) + single_task_timeout * batches;
        self.shutdown(wait).await;
    }
}
