//! Session state cell, transition serialization and state listeners.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error};

use super::state::{BindType, SessionState};
use super::SessionId;

/// Observer of session state transitions.
///
/// Listeners run synchronously inside the transition; a panicking listener is
/// logged and skipped without affecting the transition or other listeners.
pub trait SessionStateListener: Send + Sync {
    fn on_state_change(&self, new_state: SessionState, old_state: SessionState, session: &SessionId);
}

/// Holds the session state, the last-activity timestamp and the listener
/// list. Transitions are serialized by a mutex; reads are lock-free.
pub(crate) struct SessionContext {
    session_id: SessionId,
    state: AtomicU8,
    last_activity_millis: AtomicU64,
    listeners: RwLock<Vec<Arc<dyn SessionStateListener>>>,
    transition: Mutex<()>,
}

impl SessionContext {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            state: AtomicU8::new(SessionState::Closed.as_u8()),
            last_activity_millis: AtomicU64::new(now_millis()),
            listeners: RwLock::new(Vec::new()),
            transition: Mutex::new(()),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub async fn open(&self) {
        self.transition_to(SessionState::Open).await;
    }

    pub async fn bound(&self, bind_type: BindType) {
        self.transition_to(bind_type.bound_state()).await;
    }

    pub async fn unbound(&self) {
        self.transition_to(SessionState::Unbound).await;
    }

    #[allow(dead_code)]
    pub async fn close(&self) {
        self.transition_to(SessionState::Closed).await;
    }

    /// Bounded-wait variants; `false` when the transition lock could not be
    /// acquired in time (e.g. a listener re-entering the session).
    #[allow(dead_code)]
    pub async fn try_open(&self, deadline: Duration) -> bool {
        self.try_transition_to(SessionState::Open, deadline).await
    }

    #[allow(dead_code)]
    pub async fn try_bound(&self, bind_type: BindType, deadline: Duration) -> bool {
        self.try_transition_to(bind_type.bound_state(), deadline).await
    }

    #[allow(dead_code)]
    pub async fn try_unbound(&self, deadline: Duration) -> bool {
        self.try_transition_to(SessionState::Unbound, deadline).await
    }

    pub async fn try_close(&self, deadline: Duration) -> bool {
        self.try_transition_to(SessionState::Closed, deadline).await
    }

    async fn transition_to(&self, new_state: SessionState) {
        let _guard = self.transition.lock().await;
        self.change_state(new_state);
    }

    async fn try_transition_to(&self, new_state: SessionState, deadline: Duration) -> bool {
        match timeout(deadline, self.transition.lock()).await {
            Ok(_guard) => {
                self.change_state(new_state);
                true
            }
            Err(_) => false,
        }
    }

    /// Force the state without taking the transition lock. Only used by the
    /// non-blocking teardown on drop, where waiting is not an option.
    pub fn force_closed(&self) {
        self.change_state(SessionState::Closed);
    }

    fn change_state(&self, new_state: SessionState) {
        let old_state = self.state();
        if new_state == old_state {
            return;
        }
        // CLOSED is terminal.
        if old_state == SessionState::Closed {
            debug!(
                session_id = %self.session_id,
                to = %new_state,
                "ignoring transition out of CLOSED"
            );
            return;
        }
        self.state.store(new_state.as_u8(), Ordering::SeqCst);
        debug!(
            session_id = %self.session_id,
            from = %old_state,
            to = %new_state,
            "state transition"
        );
        self.fire_state_changed(new_state, old_state);
    }

    fn fire_state_changed(&self, new_state: SessionState, old_state: SessionState) {
        let listeners: Vec<_> = match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for listener in listeners {
            let result = catch_unwind(AssertUnwindSafe(|| {
                listener.on_state_change(new_state, old_state, &self.session_id)
            }));
            if result.is_err() {
                error!(
                    session_id = %self.session_id,
                    from = %old_state,
                    to = %new_state,
                    "state listener panicked"
                );
            }
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionStateListener>) {
        match self.listeners.write() {
            Ok(mut guard) => guard.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SessionStateListener>) {
        let mut guard = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.retain(|existing| !Arc::ptr_eq(existing, listener));
    }

    /// Stamp the activity clock; lock-free, called for every inbound PDU.
    pub fn notify_activity(&self) {
        self.last_activity_millis.store(now_millis(), Ordering::Relaxed);
    }

    /// Wall-clock milliseconds of the last observed activity.
    pub fn last_activity(&self) -> u64 {
        self.last_activity_millis.load(Ordering::Relaxed)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn context() -> SessionContext {
        SessionContext::new(SessionId::generate())
    }

    struct Recorder {
        seen: std::sync::Mutex<Vec<(SessionState, SessionState)>>,
    }

    impl SessionStateListener for Recorder {
        fn on_state_change(&self, new_state: SessionState, old_state: SessionState, _: &SessionId) {
            self.seen.lock().unwrap().push((new_state, old_state));
        }
    }

    struct Panicker;

    impl SessionStateListener for Panicker {
        fn on_state_change(&self, _: SessionState, _: SessionState, _: &SessionId) {
            panic!("listener failure");
        }
    }

    struct Counter(AtomicUsize);

    impl SessionStateListener for Counter {
        fn on_state_change(&self, _: SessionState, _: SessionState, _: &SessionId) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn walks_the_bind_lifecycle() {
        let ctx = context();
        let recorder = Arc::new(Recorder {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        ctx.add_listener(recorder.clone());

        ctx.open().await;
        ctx.bound(BindType::Transceiver).await;
        ctx.unbound().await;
        ctx.close().await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (SessionState::Open, SessionState::Closed),
                (SessionState::BoundTrx, SessionState::Open),
                (SessionState::Unbound, SessionState::BoundTrx),
                (SessionState::Closed, SessionState::Unbound),
            ]
        );
    }

    #[tokio::test]
    async fn closed_is_terminal() {
        let ctx = context();
        ctx.open().await;
        ctx.close().await;
        ctx.open().await;
        assert_eq!(ctx.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn redundant_transition_is_silent() {
        let ctx = context();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        ctx.add_listener(counter.clone());

        ctx.open().await;
        ctx.open().await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_listener_does_not_block_others() {
        let ctx = context();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        ctx.add_listener(Arc::new(Panicker));
        ctx.add_listener(counter.clone());

        ctx.open().await;
        assert_eq!(ctx.state(), SessionState::Open);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn removed_listener_stops_firing() {
        let ctx = context();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let as_dyn: Arc<dyn SessionStateListener> = counter.clone();
        ctx.add_listener(as_dyn.clone());

        ctx.open().await;
        ctx.remove_listener(&as_dyn);
        ctx.bound(BindType::Transmitter).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn activity_timestamp_advances() {
        let ctx = context();
        let before = ctx.last_activity();
        tokio::time::sleep(Duration::from_millis(5)).await;
        ctx.notify_activity();
        assert!(ctx.last_activity() >= before);
    }
}
