//! Sharing one processing pool across several sessions.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::BindParameter;
use crate::error::Result;

use super::pool::ProcessorPool;
use super::session::{Session, SessionBuilder};

/// A group of sessions served by a single processing pool.
///
/// Sessions created through the group do not shut the pool down when they
/// close; the pool lives until [`SessionGroup::shutdown`].
pub struct SessionGroup {
    pool: Arc<ProcessorPool>,
}

impl SessionGroup {
    pub fn new(pdu_processor_degree: usize, queue_capacity: usize) -> Self {
        Self {
            pool: Arc::new(ProcessorPool::shared(pdu_processor_degree, queue_capacity)),
        }
    }

    /// Builder pre-wired with the shared pool.
    pub fn builder(&self) -> SessionBuilder {
        Session::builder().shared_pool(self.pool.clone())
    }

    /// Connect and bind with default configuration on the shared pool.
    pub async fn connect_and_bind(
        &self,
        addr: impl tokio::net::ToSocketAddrs,
        bind: &BindParameter,
    ) -> Result<Session> {
        self.builder().connect_and_bind(addr, bind).await
    }

    /// Stop the shared pool, allowing a grace second plus `single_task_timeout`
    /// per queued batch before giving up on in-flight processing.
    pub async fn shutdown(&self, single_task_timeout: Duration) {
        debug!("shutting down session group pool");
        self.pool.shutdown_with_allowance(single_task_timeout).await;
    }
}
