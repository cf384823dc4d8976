use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::phase::BreakKind;
use crate::storage::ScheduleConfig;

/// Phase lengths and the long-break rule.
///
/// Holds only configuration; nothing here reads or writes a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationPolicy {
    focus_min: u32,
    break_min: u32,
    long_break_min: u32,
    /// Completed focus phases between long breaks. 0 disables long breaks.
    long_break_interval: u32,
}

impl DurationPolicy {
    /// Zero-minute phases are floored to one minute so a running phase
    /// always finishes strictly after it starts.
    pub fn new(focus_min: u32, break_min: u32, long_break_min: u32, long_break_interval: u32) -> Self {
        Self {
            focus_min: at_least_one("focus", focus_min),
            break_min: at_least_one("break", break_min),
            long_break_min: at_least_one("long break", long_break_min),
            long_break_interval,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(
            config.focus_duration,
            config.short_break,
            config.long_break,
            config.pomodoros_before_long_break,
        )
    }

    pub fn focus_duration(&self) -> Duration {
        minutes(self.focus_min)
    }

    pub fn break_duration(&self, kind: BreakKind) -> Duration {
        match kind {
            BreakKind::Normal => minutes(self.break_min),
            BreakKind::Long => minutes(self.long_break_min),
        }
    }

    pub fn long_break_interval(&self) -> u32 {
        self.long_break_interval
    }

    /// Break kind earned by the focus phase that brought the count to
    /// `cycle_count`, using this policy's interval.
    pub fn break_kind_after(&self, cycle_count: u32) -> BreakKind {
        next_break_kind(cycle_count, self.long_break_interval)
    }
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self::from_config(&ScheduleConfig::default())
    }
}

/// `Long` when `interval > 0` and `cycle_count` is a multiple of it.
///
/// `cycle_count` is the count after the just-completed focus phase.
pub fn next_break_kind(cycle_count: u32, interval: u32) -> BreakKind {
    if interval > 0 && cycle_count % interval == 0 {
        BreakKind::Long
    } else {
        BreakKind::Normal
    }
}

/// Duration in milliseconds, saturating instead of overflowing.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn minutes(min: u32) -> Duration {
    Duration::from_secs(u64::from(min) * 60)
}

fn at_least_one(label: &str, min: u32) -> u32 {
    if min == 0 {
        tracing::warn!(phase = label, "zero-minute phase length, using 1 minute");
        1
    } else {
        min
    }
}
