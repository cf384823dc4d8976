use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the session currently is in the focus/rest cycle.
///
/// `FocusFinished` and `RestFinished` are resting points: they wait for the
/// caller to `begin` or `cancel` and never advance on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    FocusRunning,
    FocusFinished,
    RestRunning,
    RestFinished,
}

impl Phase {
    pub fn is_running(self) -> bool {
        matches!(self, Phase::FocusRunning | Phase::RestRunning)
    }

    /// Timeout tag that completes this phase, if it is a running one.
    pub fn timeout_tag(self) -> Option<WakeTag> {
        match self {
            Phase::FocusRunning => Some(WakeTag::FocusTimeout),
            Phase::RestRunning => Some(WakeTag::RestTimeout),
            Phase::Idle | Phase::FocusFinished | Phase::RestFinished => None,
        }
    }

    /// Stable integer used by the persisted record.
    pub fn ordinal(self) -> i64 {
        match self {
            Phase::Idle => 0,
            Phase::FocusRunning => 1,
            Phase::FocusFinished => 2,
            Phase::RestRunning => 3,
            Phase::RestFinished => 4,
        }
    }

    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            0 => Some(Phase::Idle),
            1 => Some(Phase::FocusRunning),
            2 => Some(Phase::FocusFinished),
            3 => Some(Phase::RestRunning),
            4 => Some(Phase::RestFinished),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::FocusRunning => "focus_running",
            Phase::FocusFinished => "focus_finished",
            Phase::RestRunning => "rest_running",
            Phase::RestFinished => "rest_finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rest length the next rest phase uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    #[default]
    Normal,
    Long,
}

impl BreakKind {
    pub fn ordinal(self) -> i64 {
        match self {
            BreakKind::Normal => 0,
            BreakKind::Long => 1,
        }
    }

    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            0 => Some(BreakKind::Normal),
            1 => Some(BreakKind::Long),
            _ => None,
        }
    }
}

impl fmt::Display for BreakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakKind::Normal => f.write_str("normal"),
            BreakKind::Long => f.write_str("long"),
        }
    }
}

/// Tag attached to a deferred wake so a late delivery can be matched
/// against the phase that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeTag {
    FocusTimeout,
    RestTimeout,
}

impl WakeTag {
    /// The running phase this tag completes.
    pub fn phase(self) -> Phase {
        match self {
            WakeTag::FocusTimeout => Phase::FocusRunning,
            WakeTag::RestTimeout => Phase::RestRunning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WakeTag::FocusTimeout => "focus_timeout",
            WakeTag::RestTimeout => "rest_timeout",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "focus_timeout" | "focus" => Some(WakeTag::FocusTimeout),
            "rest_timeout" | "rest" => Some(WakeTag::RestTimeout),
            _ => None,
        }
    }
}

impl fmt::Display for WakeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
