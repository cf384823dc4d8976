use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::machine::{SessionMachine, Snapshot};
use super::phase::WakeTag;
use super::session::Session;
use crate::clock::Clock;
use crate::error::SessionError;
use crate::events::Event;
use crate::storage::SessionStore;
use crate::wake::WakeScheduler;

/// Cloneable handle that serializes every operation on one machine.
///
/// Caller-issued `begin`/`cancel` and a timeout delivered from another thread
/// never interleave: each call holds the lock for the whole transition,
/// including the save.
pub struct SharedMachine<S, W, C> {
    inner: Arc<Mutex<SessionMachine<S, W, C>>>,
}

impl<S, W, C> Clone for SharedMachine<S, W, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, W, C> SharedMachine<S, W, C>
where
    S: SessionStore,
    W: WakeScheduler,
    C: Clock,
{
    pub fn new(machine: SessionMachine<S, W, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(machine)),
        }
    }

    pub fn begin(&self) -> Result<Option<Event>, SessionError> {
        self.lock().begin()
    }

    pub fn cancel(&self) -> Result<Option<Event>, SessionError> {
        self.lock().cancel()
    }

    pub fn on_timeout(&self, tag: WakeTag) -> Result<Option<Event>, SessionError> {
        self.lock().on_timeout(tag)
    }

    pub fn status(&self) -> Session {
        self.lock().status()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }

    /// Run `f` with exclusive access to the machine.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionMachine<S, W, C>) -> R) -> R {
        f(&mut self.lock())
    }

    // A panic inside a listener must not wedge the session for good.
    fn lock(&self) -> MutexGuard<'_, SessionMachine<S, W, C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use crate::timer::{DurationPolicy, Phase};
    use crate::wake::NoopWake;
    use std::thread;

    #[test]
    fn concurrent_timeouts_complete_focus_once() {
        let machine = SessionMachine::with_clock(
            MemoryStore::new(),
            NoopWake,
            ManualClock::at(1_000),
            DurationPolicy::default(),
        );
        let shared = SharedMachine::new(machine);
        shared.begin().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || shared.on_timeout(WakeTag::FocusTimeout).unwrap())
            })
            .collect();
        let delivered = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .count();

        assert_eq!(delivered, 1);
        let status = shared.status();
        assert_eq!(status.phase, Phase::FocusFinished);
        assert_eq!(status.cycle_count, 1);
    }

    #[test]
    fn with_gives_exclusive_access() {
        let machine = SessionMachine::with_clock(
            MemoryStore::new(),
            NoopWake,
            ManualClock::at(1_000),
            DurationPolicy::default(),
        );
        let shared = SharedMachine::new(machine);
        let phase = shared.with(|m| {
            m.begin().unwrap();
            m.status().phase
        });
        assert_eq!(phase, Phase::FocusRunning);
        assert_eq!(shared.snapshot().session.phase, Phase::FocusRunning);
    }
}
