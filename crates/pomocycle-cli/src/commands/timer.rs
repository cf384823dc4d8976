use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use clap::Subcommand;
use pomocycle_core::{
    Clock, Config, Database, DatabaseError, Event, PhaseRecord, Session, SessionError,
    SessionMachine, SessionStore, Snapshot, SqliteSessionStore, SqliteWakeQueue, WakeTag,
};
use serde::Serialize;

/// Longest `watch` sleeps before re-reading the stored session.
const WATCH_POLL: Duration = Duration::from_secs(1);

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the next phase (focus, or the rest that follows a finished focus)
    Start,
    /// Cancel the current phase and return to idle
    Cancel,
    /// Print current session as JSON
    Status,
    /// Deliver a timeout now, as the platform alarm would
    Fire {
        /// Which timeout to deliver: focus or rest
        #[arg(value_parser = parse_tag)]
        tag: WakeTag,
    },
    /// Deliver the pending wake if it is due
    Wake,
    /// Wait for the running phase to finish and deliver its timeout
    Watch,
}

fn parse_tag(value: &str) -> Result<WakeTag, String> {
    WakeTag::parse(value).ok_or_else(|| format!("unknown timeout '{value}' (expected focus or rest)"))
}

#[derive(Serialize)]
struct Report<'a> {
    events: &'a [Event],
    status: Snapshot,
}

type Machine = SessionMachine<SqliteSessionStore, SqliteWakeQueue>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A restored machine plus the events it produced during this invocation.
struct Runner {
    db: Database,
    queue: SqliteWakeQueue,
    machine: Machine,
    sink: Arc<Mutex<Vec<Event>>>,
    emitted: Vec<Event>,
}

impl Runner {
    fn open() -> Result<Self, Box<dyn Error>> {
        let db = Database::open()?;
        let config = Config::load()?;
        let queue = SqliteWakeQueue::new(db.clone());
        let mut machine = SessionMachine::new(
            SqliteSessionStore::new(db.clone()),
            queue.clone(),
            config.duration_policy(),
        );

        let sink = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::clone(&sink);
        machine.set_listener(move |event: &Event| lock(&events).push(event.clone()));

        let mut runner = Self {
            db,
            queue,
            machine,
            sink,
            emitted: Vec::new(),
        };
        runner.reload()?;
        Ok(runner)
    }

    /// Re-read the stored session, completing a phase that ran out meanwhile.
    fn reload(&mut self) -> Result<(), Box<dyn Error>> {
        let before = self.machine.store().clone().load().unwrap_or_default();
        let restored = self.machine.restore();
        self.settle(&before)?;
        restored?;
        Ok(())
    }

    fn step(
        &mut self,
        op: impl FnOnce(&mut Machine) -> Result<Option<Event>, SessionError>,
    ) -> Result<(), Box<dyn Error>> {
        let before = self.machine.status();
        let result = op(&mut self.machine);
        self.settle(&before)?;
        result?;
        Ok(())
    }

    /// Hand a due pending wake to the machine.
    fn deliver_due(&mut self) -> Result<(), Box<dyn Error>> {
        let now = self.machine.clock().now_ms();
        if let Some(wake) = self.queue.take_due(now)? {
            tracing::debug!(tag = %wake.tag, at_ms = wake.at_ms, "delivering wake");
            self.step(|machine| machine.on_timeout(wake.tag))?;
        }
        Ok(())
    }

    /// Move delivered events into the report, logging completed phases.
    fn settle(&mut self, before: &Session) -> Result<(), DatabaseError> {
        let delivered = std::mem::take(&mut *lock(&self.sink));
        for event in delivered {
            if let Some(record) = PhaseRecord::from_completion(before, &event) {
                self.db.record_phase(&record)?;
            }
            self.emitted.push(event);
        }
        Ok(())
    }

    fn print_report(&self) -> Result<(), Box<dyn Error>> {
        let report = Report {
            events: &self.emitted,
            status: self.machine.snapshot(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::open()?;

    match action {
        TimerAction::Start => runner.step(|machine| machine.begin())?,
        TimerAction::Cancel => runner.step(|machine| machine.cancel())?,
        TimerAction::Status => {}
        TimerAction::Fire { tag } => runner.step(|machine| machine.on_timeout(tag))?,
        TimerAction::Wake => runner.deliver_due()?,
        TimerAction::Watch => loop {
            runner.deliver_due()?;
            let snapshot = runner.machine.snapshot();
            if !snapshot.session.is_running() {
                break;
            }
            let wait = Duration::from_millis(snapshot.remaining_ms.max(1));
            std::thread::sleep(wait.min(WATCH_POLL));
            runner.reload()?;
        },
    }

    runner.print_report()
}
