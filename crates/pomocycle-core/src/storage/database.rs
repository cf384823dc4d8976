//! SQLite-backed persistence.
//!
//! Provides persistent storage for:
//! - The session record (one row, flat primitive columns)
//! - The pending deferred wake (see [`super::SqliteWakeQueue`])
//! - History of completed phases and statistics derived from it

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::record::SessionRecord;
use super::{data_dir, migrations, SessionStore};
use crate::clock::to_datetime;
use crate::error::{CoreError, DatabaseError, PersistError};
use crate::events::Event;
use crate::timer::{BreakKind, Session};

/// A completed focus or rest phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: i64,
    /// `"focus"` or `"rest"`.
    pub kind: String,
    /// Set for rest phases only.
    pub break_kind: Option<BreakKind>,
    pub duration_min: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl PhaseRecord {
    /// History entry for a completion event, using the session as it was
    /// just before the transition. The completion time is the scheduled
    /// finish, or the event time when the timeout arrived early.
    pub fn from_completion(before: &Session, event: &Event) -> Option<Self> {
        let (kind, break_kind) = match event {
            Event::FocusFinished { .. } => ("focus", None),
            Event::RestFinished { break_kind, .. } => ("rest", Some(*break_kind)),
            _ => return None,
        };
        let started = before.start_time?;
        let event_ms = u64::try_from(event.at().timestamp_millis()).unwrap_or(0);
        let finished = before.finish_time?.min(event_ms.max(started));
        Some(Self {
            id: 0,
            kind: kind.to_string(),
            break_kind,
            duration_min: (finished.saturating_sub(started) + 30_000) / 60_000,
            started_at: to_datetime(started),
            completed_at: to_datetime(finished),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub focus_completed: u64,
    pub focus_min: u64,
    pub rest_completed: u64,
    pub rest_min: u64,
    pub long_breaks: u64,
}

/// SQLite database shared by the session store and the wake queue.
///
/// Cloning is cheap; clones share one connection behind a mutex.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database at `<data dir>/pomocycle.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("pomocycle.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with the connection locked.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&conn)?)
    }

    // ── Session record ───────────────────────────────────────────────

    pub fn load_session_record(&self) -> Result<Option<SessionRecord>, DatabaseError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT phase, break_kind, cycle_count, start_time_ms, finish_time_ms
                 FROM session_state WHERE id = 1",
                [],
                |row| {
                    Ok(SessionRecord {
                        phase: row.get(0)?,
                        break_kind: row.get(1)?,
                        cycle_count: row.get(2)?,
                        start_time_ms: row.get(3)?,
                        finish_time_ms: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn save_session_record(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_state
                    (id, phase, break_kind, cycle_count, start_time_ms, finish_time_ms)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5)",
                params![
                    record.phase,
                    record.break_kind,
                    record.cycle_count,
                    record.start_time_ms,
                    record.finish_time_ms,
                ],
            )
            .map(|_| ())
        })
    }

    // ── History ──────────────────────────────────────────────────────

    /// Append a completed phase to the history.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_phase(&self, record: &PhaseRecord) -> Result<i64, DatabaseError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO phase_log (kind, break_kind, duration_min, started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.kind,
                    record.break_kind.map(|k| k.to_string()),
                    record.duration_min,
                    record.started_at.to_rfc3339(),
                    record.completed_at.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Most recent completed phases, newest first.
    pub fn recent_phases(&self, limit: usize) -> Result<Vec<PhaseRecord>, DatabaseError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, break_kind, duration_min, started_at, completed_at
                 FROM phase_log ORDER BY completed_at DESC, id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                let break_kind: Option<String> = row.get(2)?;
                Ok(PhaseRecord {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    break_kind: break_kind.as_deref().and_then(parse_break_kind),
                    duration_min: row.get(3)?,
                    started_at: parse_rfc3339(&row.get::<_, String>(4)?),
                    completed_at: parse_rfc3339(&row.get::<_, String>(5)?),
                })
            })?;
            let phases = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(phases)
        })
    }

    /// Statistics for phases completed since UTC midnight of `now`.
    pub fn stats_today(&self, now: DateTime<Utc>) -> Result<Stats, DatabaseError> {
        let today = now.format("%Y-%m-%d").to_string();
        self.stats_since(Some(format!("{today}T00:00:00+00:00")))
    }

    pub fn stats_all(&self) -> Result<Stats, DatabaseError> {
        self.stats_since(None)
    }

    fn stats_since(&self, since: Option<String>) -> Result<Stats, DatabaseError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT kind, COALESCE(break_kind, ''), COUNT(*), COALESCE(SUM(duration_min), 0)
                 FROM phase_log
                 WHERE ?1 IS NULL OR completed_at >= ?1
                 GROUP BY kind, break_kind",
            )?;
            let rows = stmt.query_map(params![since], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, u64>(3)?,
                ))
            })?;

            let mut stats = Stats::default();
            for row in rows {
                let (kind, break_kind, count, minutes) = row?;
                match kind.as_str() {
                    "focus" => {
                        stats.focus_completed += count;
                        stats.focus_min += minutes;
                    }
                    "rest" => {
                        stats.rest_completed += count;
                        stats.rest_min += minutes;
                        if break_kind == "long" {
                            stats.long_breaks += count;
                        }
                    }
                    _ => {}
                }
            }
            Ok(stats)
        })
    }
}

fn parse_break_kind(value: &str) -> Option<BreakKind> {
    match value {
        "normal" => Some(BreakKind::Normal),
        "long" => Some(BreakKind::Long),
        _ => None,
    }
}

fn parse_rfc3339(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// [`SessionStore`] over the `session_state` table.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Database,
}

impl SqliteSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&mut self) -> Result<Session, PersistError> {
        match self.db.load_session_record()? {
            Some(record) => Session::try_from(record),
            None => Ok(Session::new()),
        }
    }

    fn save(&mut self, session: &Session) -> Result<(), PersistError> {
        self.db.save_session_record(&SessionRecord::from(session))?;
        Ok(())
    }
}
