//! Session state machine.
//!
//! The machine owns the [`Session`] and is the only thing that mutates it.
//! Every transition saves the session and, when a phase boundary is crossed,
//! emits one [`Event`] to the registered listener.
//!
//! ## Transitions
//!
//! ```text
//! Idle          --begin-->   FocusRunning
//! FocusRunning  --timeout--> FocusFinished
//! FocusRunning  --cancel-->  Idle
//! FocusFinished --begin-->   RestRunning
//! FocusFinished --cancel-->  Idle
//! RestRunning   --timeout--> RestFinished
//! RestRunning   --cancel-->  Idle
//! RestFinished  --begin-->   FocusRunning
//! RestFinished  --cancel-->  Idle
//! ```
//!
//! There is no terminal phase; the cycle repeats indefinitely.
//!
//! ## Restart
//!
//! [`SessionMachine::restore`] loads the stored session and reconciles it
//! against the clock: a running phase whose finish time has passed is
//! completed as if its timeout had been delivered.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::phase::{Phase, WakeTag};
use super::policy::{duration_ms, DurationPolicy};
use super::session::Session;
use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, PersistError, SessionError};
use crate::events::{Event, SessionListener};
use crate::storage::SessionStore;
use crate::wake::WakeScheduler;

/// Read-only view of the session at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub session: Session,
    pub remaining_ms: u64,
    pub total_ms: u64,
    pub now_ms: u64,
}

pub struct SessionMachine<S, W, C = SystemClock> {
    session: Session,
    policy: DurationPolicy,
    store: S,
    wake: W,
    clock: C,
    listener: Option<Box<dyn SessionListener>>,
}

impl<S, W> SessionMachine<S, W, SystemClock>
where
    S: SessionStore,
    W: WakeScheduler,
{
    /// Machine on the system clock, starting from a fresh idle session.
    /// Call [`restore`](Self::restore) to pick up stored progress.
    pub fn new(store: S, wake: W, policy: DurationPolicy) -> Self {
        Self::with_clock(store, wake, SystemClock, policy)
    }
}

impl<S, W, C> SessionMachine<S, W, C>
where
    S: SessionStore,
    W: WakeScheduler,
    C: Clock,
{
    pub fn with_clock(store: S, wake: W, clock: C, policy: DurationPolicy) -> Self {
        Self {
            session: Session::new(),
            policy,
            store,
            wake,
            clock,
            listener: None,
        }
    }

    /// Register the single listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: impl SessionListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn policy(&self) -> &DurationPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn wake(&self) -> &W {
        &self.wake
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> Session {
        self.session
    }

    pub fn snapshot(&self) -> Snapshot {
        let now_ms = self.clock.now_ms();
        Snapshot {
            session: self.session,
            remaining_ms: self.session.remaining_ms(now_ms),
            total_ms: self.session.total_ms(),
            now_ms,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the next timed phase: focus from `Idle`/`RestFinished`, rest
    /// from `FocusFinished`.
    pub fn begin(&mut self) -> Result<Option<Event>, SessionError> {
        let now = self.clock.now_ms();
        let event = match self.session.phase {
            Phase::Idle | Phase::RestFinished => {
                let length = duration_ms(self.policy.focus_duration());
                self.session.enter_running(Phase::FocusRunning, now, length);
                Event::FocusStarted {
                    start_ms: now,
                    finish_ms: self.finish_ms(),
                    at: self.clock.now(),
                }
            }
            Phase::FocusFinished => {
                let kind = self.session.break_kind;
                let length = duration_ms(self.policy.break_duration(kind));
                self.session.enter_running(Phase::RestRunning, now, length);
                Event::RestStarted {
                    break_kind: kind,
                    start_ms: now,
                    finish_ms: self.finish_ms(),
                    at: self.clock.now(),
                }
            }
            phase @ (Phase::FocusRunning | Phase::RestRunning) => {
                return Err(SessionError::IllegalTransition {
                    operation: "begin",
                    phase,
                });
            }
        };

        info!(phase = %self.session.phase, finish_ms = self.finish_ms(), "phase started");
        let saved = self.store.save(&self.session);
        if let Some(tag) = self.session.phase.timeout_tag() {
            self.wake.schedule(self.finish_ms(), tag);
        }
        self.finish(Some(event), saved)
    }

    /// Return to `Idle`. Cancelling from `FocusFinished` skips the pending
    /// rest. Cycle count and break kind are never touched. No-op when idle.
    pub fn cancel(&mut self) -> Result<Option<Event>, SessionError> {
        let at = self.clock.now();
        let event = match self.session.phase {
            Phase::Idle => return Ok(None),
            Phase::FocusRunning => Some(Event::FocusCancelled { at }),
            Phase::RestRunning | Phase::FocusFinished => Some(Event::RestCancelled { at }),
            Phase::RestFinished => None,
        };

        info!(from = %self.session.phase, "cancelled");
        self.wake.cancel_all();
        self.session.enter_resting(Phase::Idle);
        let saved = self.store.save(&self.session);
        self.finish(event, saved)
    }

    /// Deliver a timeout. A tag that does not match the running phase is a
    /// leftover from a cancelled phase and is ignored.
    pub fn on_timeout(&mut self, tag: WakeTag) -> Result<Option<Event>, SessionError> {
        if self.session.phase != tag.phase() {
            debug!(%tag, phase = %self.session.phase, "ignoring stale timeout");
            return Ok(None);
        }

        let at = self.clock.now();
        let event = match tag {
            WakeTag::FocusTimeout => {
                self.session.cycle_count = self.session.cycle_count.saturating_add(1);
                self.session.break_kind = self.policy.break_kind_after(self.session.cycle_count);
                self.session.enter_resting(Phase::FocusFinished);
                Event::FocusFinished {
                    cycle_count: self.session.cycle_count,
                    break_kind: self.session.break_kind,
                    at,
                }
            }
            WakeTag::RestTimeout => {
                self.session.enter_resting(Phase::RestFinished);
                Event::RestFinished {
                    break_kind: self.session.break_kind,
                    at,
                }
            }
        };

        info!(phase = %self.session.phase, cycle_count = self.session.cycle_count, "phase finished");
        let saved = self.store.save(&self.session);
        self.finish(Some(event), saved)
    }

    /// Retry saving the current session, e.g. after a `NotPersisted` error.
    pub fn flush(&mut self) -> Result<(), PersistError> {
        self.store.save(&self.session)
    }

    // ── Restart ──────────────────────────────────────────────────────

    /// Load the stored session and reconcile it with the clock.
    ///
    /// A record that cannot be decoded is replaced by a fresh idle session.
    /// Returns the event of a synthesized timeout, if one was needed.
    pub fn restore(&mut self) -> Result<Option<Event>, CoreError> {
        self.session = match self.store.load() {
            Ok(session) => session,
            Err(PersistError::Corrupt(reason)) => {
                warn!(%reason, "discarding unreadable session record");
                Session::new()
            }
            Err(err) => return Err(err.into()),
        };
        debug!(phase = %self.session.phase, cycle_count = self.session.cycle_count, "session loaded");
        Ok(self.reconcile()?)
    }

    /// Complete a running phase whose finish time has passed, or re-arm its
    /// wake when the scheduler does not outlive the process.
    pub fn reconcile(&mut self) -> Result<Option<Event>, SessionError> {
        let Some(tag) = self.session.phase.timeout_tag() else {
            return Ok(None);
        };

        let now = self.clock.now_ms();
        if self.session.is_due(now) {
            debug!(%tag, overdue_ms = now - self.finish_ms(), "phase expired while away");
            self.wake.cancel_all();
            return self.on_timeout(tag);
        }

        if !self.wake.is_durable() {
            debug!(%tag, at_ms = self.finish_ms(), "re-arming wake");
            self.wake.schedule(self.finish_ms(), tag);
        }
        Ok(None)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish_ms(&self) -> u64 {
        self.session.finish_time.unwrap_or_default()
    }

    fn finish(
        &mut self,
        event: Option<Event>,
        saved: Result<(), PersistError>,
    ) -> Result<Option<Event>, SessionError> {
        if let (Some(listener), Some(event)) = (self.listener.as_mut(), event.as_ref()) {
            listener.on_event(event);
        }
        match saved {
            Ok(()) => Ok(event),
            Err(err) => {
                warn!(error = %err, phase = %self.session.phase, "session not persisted");
                Err(SessionError::NotPersisted(err))
            }
        }
    }
}
