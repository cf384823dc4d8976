//! Deferred wake boundary.
//!
//! A wake scheduler arranges for `SessionMachine::on_timeout(tag)` to be
//! called at (or after) a phase's finish time, possibly in a later process.
//! Cancellation is best-effort: a late delivery is absorbed by the tag check
//! in the machine.

use crate::timer::WakeTag;

/// Platform facility for delivering a timeout at a future wall-clock time.
pub trait WakeScheduler: Send {
    /// Request a wake at `at_ms` (epoch milliseconds). Replaces any pending request.
    fn schedule(&mut self, at_ms: u64, tag: WakeTag);

    /// Drop every pending request.
    fn cancel_all(&mut self);

    /// Whether pending requests outlive the process. When `false`, a restored
    /// machine re-registers the wake for a phase that is still running.
    fn is_durable(&self) -> bool {
        true
    }
}

/// Scheduler for callers that drive timeouts themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWake;

impl WakeScheduler for NoopWake {
    fn schedule(&mut self, _at_ms: u64, _tag: WakeTag) {}

    fn cancel_all(&mut self) {}
}

impl<W: WakeScheduler + ?Sized> WakeScheduler for Box<W> {
    fn schedule(&mut self, at_ms: u64, tag: WakeTag) {
        (**self).schedule(at_ms, tag)
    }

    fn cancel_all(&mut self) {
        (**self).cancel_all()
    }

    fn is_durable(&self) -> bool {
        (**self).is_durable()
    }
}
