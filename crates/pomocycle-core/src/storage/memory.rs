use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::record::SessionRecord;
use super::SessionStore;
use crate::error::PersistError;
use crate::timer::Session;

/// In-process store. Clones share the same slot, so a test (or an embedder)
/// can keep a handle and inspect what the machine saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<SessionRecord>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail with `PersistError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The last saved session, if any was saved and it decodes.
    pub fn stored(&self) -> Option<Session> {
        let record = *self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        record.and_then(|r| Session::try_from(r).ok())
    }

    pub fn put(&self, session: Session) {
        self.put_raw(SessionRecord::from(&session));
    }

    pub fn put_raw(&self, record: SessionRecord) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(record);
    }
}

impl SessionStore for MemoryStore {
    fn load(&mut self) -> Result<Session, PersistError> {
        let record = *self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match record {
            Some(record) => Session::try_from(record),
            None => Ok(Session::new()),
        }
    }

    fn save(&mut self, session: &Session) -> Result<(), PersistError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("memory store set to fail".into()));
        }
        self.put(*session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Phase;

    #[test]
    fn load_without_save_is_idle() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), Session::new());
    }

    #[test]
    fn save_then_load() {
        let mut store = MemoryStore::new();
        let session = Session {
            phase: Phase::FocusFinished,
            cycle_count: 3,
            ..Session::default()
        };
        store.save(&session).unwrap();
        assert_eq!(store.clone().load().unwrap(), session);
    }

    #[test]
    fn failing_store_keeps_previous_value() {
        let mut store = MemoryStore::new();
        store.save(&Session::new()).unwrap();
        store.set_failing(true);
        let session = Session {
            cycle_count: 9,
            ..Session::default()
        };
        assert!(store.save(&session).is_err());
        assert_eq!(store.stored(), Some(Session::new()));
    }
}
