use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::BreakKind;

/// Every phase boundary crossed by the session machine produces an Event.
/// Delivered synchronously to the registered [`SessionListener`], if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    FocusStarted {
        start_ms: u64,
        finish_ms: u64,
        at: DateTime<Utc>,
    },
    FocusFinished {
        cycle_count: u32,
        break_kind: BreakKind,
        at: DateTime<Utc>,
    },
    FocusCancelled {
        at: DateTime<Utc>,
    },
    RestStarted {
        break_kind: BreakKind,
        start_ms: u64,
        finish_ms: u64,
        at: DateTime<Utc>,
    },
    RestFinished {
        break_kind: BreakKind,
        at: DateTime<Utc>,
    },
    RestCancelled {
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::FocusStarted { at, .. }
            | Event::FocusFinished { at, .. }
            | Event::FocusCancelled { at }
            | Event::RestStarted { at, .. }
            | Event::RestFinished { at, .. }
            | Event::RestCancelled { at } => *at,
        }
    }

    /// `true` for the two natural-expiry events.
    pub fn is_completion(&self) -> bool {
        matches!(self, Event::FocusFinished { .. } | Event::RestFinished { .. })
    }
}

/// Receives session events. Closures taking `&Event` implement it.
pub trait SessionListener: Send {
    fn on_event(&mut self, event: &Event);
}

impl<F> SessionListener for F
where
    F: FnMut(&Event) + Send,
{
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}
