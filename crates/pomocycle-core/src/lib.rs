//! # Pomocycle Core Library
//!
//! Core logic of a pomodoro-style work/rest cycle timer. The timer survives
//! process restarts: the session is persisted after every transition and a
//! phase that expired while nothing was running is completed on restore.
//!
//! ## Architecture
//!
//! - **Session machine**: a deadline-based state machine over five phases
//!   (`Idle`, `FocusRunning`, `FocusFinished`, `RestRunning`, `RestFinished`).
//!   It does not tick; callers deliver timeouts and derive remaining time from
//!   the finish deadline.
//! - **Storage**: SQLite for the session record, the pending wake and the
//!   history of completed phases; TOML for configuration.
//! - **Wake scheduling**: a trait for "call me back at time T with this tag",
//!   with a durable SQLite-backed queue.
//!
//! ## Key Components
//!
//! - [`SessionMachine`]: owns the session and applies transitions
//! - [`SharedMachine`]: thread-safe handle over a machine
//! - [`Database`]: session, wake and history persistence
//! - [`Config`]: schedule configuration

pub mod clock;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;
pub mod wake;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, PersistError, SessionError};
pub use events::{Event, SessionListener};
pub use storage::{
    Config, Database, MemoryStore, PhaseRecord, SessionStore, SqliteSessionStore,
    SqliteWakeQueue, Stats,
};
pub use timer::{
    BreakKind, DurationPolicy, Phase, Session, SessionMachine, SharedMachine, Snapshot, WakeTag,
};
pub use wake::{NoopWake, WakeScheduler};
