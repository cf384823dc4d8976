mod config;
pub mod database;
mod memory;
pub mod migrations;
mod record;
mod wake_queue;

pub use config::{Config, ScheduleConfig};
pub use database::{Database, PhaseRecord, SqliteSessionStore, Stats};
pub use memory::MemoryStore;
pub use record::SessionRecord;
pub use wake_queue::{PendingWake, SqliteWakeQueue};

use std::path::PathBuf;

use crate::error::{ConfigError, PersistError};
use crate::timer::Session;

/// Load/save boundary for the session record.
pub trait SessionStore: Send {
    /// The stored session, or a fresh idle one when nothing has been saved yet.
    fn load(&mut self) -> Result<Session, PersistError>;

    fn save(&mut self, session: &Session) -> Result<(), PersistError>;
}

impl<T: SessionStore + ?Sized> SessionStore for Box<T> {
    fn load(&mut self) -> Result<Session, PersistError> {
        (**self).load()
    }

    fn save(&mut self, session: &Session) -> Result<(), PersistError> {
        (**self).save(session)
    }
}

/// Returns the data directory, creating it if needed.
///
/// `POMOCYCLE_DATA_DIR` wins when set. Otherwise `~/.config/pomocycle`, or
/// `~/.config/pomocycle-dev` with `POMOCYCLE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMOCYCLE_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("POMOCYCLE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomocycle-dev")
            } else {
                base_dir.join("pomocycle")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
