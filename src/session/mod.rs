//! The session engine: one connection, one state machine, correlated
//! request/response traffic and delivery dispatch.
//!
//! Three actors share each session: application callers issuing requests, a
//! reader task framing inbound PDUs, and a keepalive task probing the link
//! when it goes quiet. They meet in the pending table, the state context and
//! the serialized writer.

mod context;
mod group;
mod keepalive;
mod machine;
mod pending;
mod pool;
mod reader;
mod receiver;
mod sequence;
mod session;
mod state;

pub use context::SessionStateListener;
pub use group::SessionGroup;
pub use receiver::{DataSmResult, MessageReceiverListener, ProcessRequestError};
pub use session::{QuerySmResult, Session, SessionBuilder, SubmitMultiResult};
pub use state::{BindType, SessionState};

use std::fmt;
use std::sync::Arc;

/// Short hex identity assigned at construction; appears in log fields and
/// nowhere on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(Arc<str>);

impl SessionId {
    pub(crate) fn generate() -> Self {
        Self(format!("{:08x}", rand::random_u64() as u32).into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Small xorshift generator for session identities.
mod rand {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static STATE: AtomicU64 = AtomicU64::new(0);

    pub fn random_u64() -> u64 {
        let mut s = STATE.load(Ordering::Relaxed);
        if s == 0 {
            s = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos() as u64)
                .unwrap_or(0x9E37_79B9_7F4A_7C15);
        }
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        STATE.store(s, Ordering::Relaxed);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_short_hex() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn session_ids_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
