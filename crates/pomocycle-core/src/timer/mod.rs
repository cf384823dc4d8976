mod machine;
mod phase;
mod policy;
mod session;
mod shared;

pub use machine::{SessionMachine, Snapshot};
pub use phase::{BreakKind, Phase, WakeTag};
pub use policy::{duration_ms, next_break_kind, DurationPolicy};
pub use session::Session;
pub use shared::SharedMachine;
