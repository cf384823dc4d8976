use serde::{Deserialize, Serialize};

use super::phase::{BreakKind, Phase};

/// The durable record of the focus/rest cycle.
///
/// Only [`super::SessionMachine`] mutates it. Running phases carry both
/// timestamps with `finish_time > start_time`; every other phase carries
/// neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Session {
    pub phase: Phase,
    pub break_kind: BreakKind,
    /// Completed focus phases. Only ever incremented.
    pub cycle_count: u32,
    /// Epoch milliseconds when the running phase began.
    pub start_time: Option<u64>,
    /// Epoch milliseconds when the running phase ends.
    pub finish_time: Option<u64>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    /// Milliseconds left in the running phase at `now_ms`, 0 when not running
    /// or already past due.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        match (self.phase.is_running(), self.finish_time) {
            (true, Some(finish)) => finish.saturating_sub(now_ms),
            _ => 0,
        }
    }

    /// Length of the running phase in milliseconds.
    pub fn total_ms(&self) -> u64 {
        match (self.start_time, self.finish_time) {
            (Some(start), Some(finish)) => finish.saturating_sub(start),
            _ => 0,
        }
    }

    /// True once `now_ms` has reached the finish time of a running phase.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.phase.is_running() && self.finish_time.is_some_and(|finish| now_ms >= finish)
    }

    /// Checks the phase/timestamp invariant.
    pub fn validate(&self) -> Result<(), String> {
        match (self.phase.is_running(), self.start_time, self.finish_time) {
            (true, Some(start), Some(finish)) if finish > start => Ok(()),
            (true, start, finish) => Err(format!(
                "{} needs start < finish, got {:?}..{:?}",
                self.phase, start, finish
            )),
            (false, None, None) => Ok(()),
            (false, start, finish) => Err(format!(
                "{} must not carry timestamps, got {:?}..{:?}",
                self.phase, start, finish
            )),
        }
    }

    pub(crate) fn enter_running(&mut self, phase: Phase, start: u64, length_ms: u64) {
        debug_assert!(phase.is_running());
        debug_assert!(start > 0, "a start time of 0 encodes as \"not set\"");
        self.phase = phase;
        self.start_time = Some(start);
        self.finish_time = Some(start.saturating_add(length_ms.max(1)));
    }

    pub(crate) fn enter_resting(&mut self, phase: Phase) {
        debug_assert!(!phase.is_running());
        self.phase = phase;
        self.start_time = None;
        self.finish_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_idle_and_valid() {
        let s = Session::new();
        assert_eq!(s.phase, Phase::Idle);
        assert_eq!(s.cycle_count, 0);
        assert_eq!(s.break_kind, BreakKind::Normal);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn remaining_counts_down_and_saturates() {
        let mut s = Session::new();
        s.enter_running(Phase::FocusRunning, 1_000, 60_000);
        assert_eq!(s.remaining_ms(1_000), 60_000);
        assert_eq!(s.remaining_ms(31_000), 30_000);
        assert_eq!(s.remaining_ms(500_000), 0);
        assert_eq!(s.total_ms(), 60_000);
        assert!(!s.is_due(60_999));
        assert!(s.is_due(61_000));
    }

    #[test]
    fn resting_phase_clears_timestamps() {
        let mut s = Session::new();
        s.enter_running(Phase::RestRunning, 10, 20);
        s.enter_resting(Phase::RestFinished);
        assert_eq!(s.start_time, None);
        assert_eq!(s.finish_time, None);
        assert_eq!(s.remaining_ms(0), 0);
        assert!(s.validate().is_ok());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not set")]
    fn running_phase_cannot_start_at_epoch_zero() {
        Session::new().enter_running(Phase::FocusRunning, 0, 60_000);
    }

    #[test]
    fn validate_rejects_broken_invariants() {
        let running_without_times = Session {
            phase: Phase::FocusRunning,
            ..Session::default()
        };
        assert!(running_without_times.validate().is_err());

        let idle_with_times = Session {
            start_time: Some(1),
            finish_time: Some(2),
            ..Session::default()
        };
        assert!(idle_with_times.validate().is_err());

        let inverted = Session {
            phase: Phase::RestRunning,
            start_time: Some(5),
            finish_time: Some(5),
            ..Session::default()
        };
        assert!(inverted.validate().is_err());
    }
}
