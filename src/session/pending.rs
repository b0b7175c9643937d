//! Correlation of outbound requests with inbound responses.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::Error;
use crate::pdu::{Header, Pdu};

/// A decoded response handed back to the awaiting caller.
#[derive(Debug)]
pub(crate) struct Response {
    pub header: Header,
    pub pdu: Pdu,
}

/// Caller side of one reserved sequence number.
pub(crate) struct PendingHandle {
    sequence: u32,
    rx: oneshot::Receiver<Result<Response, Error>>,
}

/// Table of in-flight requests keyed by sequence_number.
///
/// Completion is exactly-once: the entry is removed before its waiter is
/// signalled, so a late response to a timed-out entry is reported as unknown.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<u32, oneshot::Sender<Result<Response, Error>>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `sequence`; `None` when the slot is still occupied by an
    /// earlier request (the allocator then draws a fresh number).
    pub fn insert(&self, sequence: u32) -> Option<PendingHandle> {
        let mut entries = self.entries.lock().expect("pending table lock");
        if entries.contains_key(&sequence) {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        entries.insert(sequence, tx);
        Some(PendingHandle { sequence, rx })
    }

    /// Deliver `response` to the waiter; `false` when the sequence is unknown.
    pub fn complete(&self, sequence: u32, response: Response) -> bool {
        match self.remove(sequence) {
            Some(tx) => {
                if tx.send(Ok(response)).is_err() {
                    debug!(sequence_number = sequence, "waiter gone before completion");
                }
                true
            }
            None => false,
        }
    }

    /// Fail the waiter with `error`; `false` when the sequence is unknown.
    pub fn fail(&self, sequence: u32, error: Error) -> bool {
        match self.remove(sequence) {
            Some(tx) => {
                let _ = tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Fail every outstanding waiter; used on session close.
    pub fn drain_all(&self) {
        let drained: Vec<_> = {
            let mut entries = self.entries.lock().expect("pending table lock");
            entries.drain().collect()
        };
        if !drained.is_empty() {
            debug!(count = drained.len(), "draining pending responses");
        }
        for (_, tx) in drained {
            let _ = tx.send(Err(Error::Closed));
        }
    }

    pub fn remove(&self, sequence: u32) -> Option<oneshot::Sender<Result<Response, Error>>> {
        self.entries.lock().expect("pending table lock").remove(&sequence)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("pending table lock").len()
    }

    /// Block the caller until completion or `deadline` elapses. A timed-out
    /// entry is removed before returning so the table cannot leak.
    pub async fn wait(
        &self,
        handle: PendingHandle,
        deadline: Duration,
        command: &'static str,
    ) -> Result<Response, Error> {
        let sequence = handle.sequence;
        match tokio::time::timeout(deadline, handle.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::Closed),
            Err(_) => {
                self.remove(sequence);
                Err(Error::ResponseTimeout {
                    command,
                    sequence,
                    waited: deadline,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{Command, Status};

    fn response(sequence: u32) -> Response {
        Response {
            header: Header::with_status(Command::EnquireLinkResp, sequence, Status::Ok),
            pdu: Pdu::EnquireLinkResp,
        }
    }

    #[tokio::test]
    async fn completes_the_matching_waiter() {
        let table = PendingTable::new();
        let handle = table.insert(7).unwrap();
        assert!(table.complete(7, response(7)));

        let got = table.wait(handle, Duration::from_secs(1), "enquire_link").await.unwrap();
        assert_eq!(got.header.sequence, 7);
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn rejects_duplicate_sequence() {
        let table = PendingTable::new();
        let _handle = table.insert(1).unwrap();
        assert!(table.insert(1).is_none());
    }

    #[tokio::test]
    async fn unknown_sequence_is_reported() {
        let table = PendingTable::new();
        assert!(!table.complete(99, response(99)));
    }

    #[tokio::test]
    async fn timeout_removes_the_entry() {
        let table = PendingTable::new();
        let handle = table.insert(3).unwrap();

        let err = table
            .wait(handle, Duration::from_millis(20), "submit_sm")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResponseTimeout { sequence: 3, .. }));
        assert_eq!(table.len(), 0);

        // A response arriving after the timeout finds no entry.
        assert!(!table.complete(3, response(3)));
    }

    #[tokio::test]
    async fn drain_fails_every_waiter() {
        let table = PendingTable::new();
        let first = table.insert(1).unwrap();
        let second = table.insert(2).unwrap();

        table.drain_all();
        assert_eq!(table.len(), 0);

        for handle in [first, second] {
            let err = table.wait(handle, Duration::from_secs(1), "submit_sm").await.unwrap_err();
            assert!(matches!(err, Error::Closed));
        }
    }
}
