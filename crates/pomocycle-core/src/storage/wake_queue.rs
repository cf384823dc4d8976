use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::database::Database;
use crate::error::DatabaseError;
use crate::timer::WakeTag;
use crate::wake::WakeScheduler;

/// A wake request waiting for its time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWake {
    pub at_ms: u64,
    pub tag: WakeTag,
}

/// Durable wake queue in the application database.
///
/// Requests outlive the process; whoever plays the role of the platform
/// alarm (the CLI's `timer wake`/`timer watch`) drains due entries with
/// [`take_due`](Self::take_due) and hands the tag to the machine.
#[derive(Clone)]
pub struct SqliteWakeQueue {
    db: Database,
}

impl SqliteWakeQueue {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn pending(&self) -> Result<Option<PendingWake>, DatabaseError> {
        let row = self.db.with_conn(|conn| {
            conn.query_row("SELECT at_ms, tag FROM pending_wake WHERE id = 1", [], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .optional()
        })?;

        Ok(row.and_then(|(at_ms, tag)| match WakeTag::parse(&tag) {
            Some(tag) => Some(PendingWake {
                at_ms: at_ms.max(0) as u64,
                tag,
            }),
            None => {
                warn!(%tag, "ignoring pending wake with unknown tag");
                None
            }
        }))
    }

    /// Remove and return the pending wake if it is due at `now_ms`.
    pub fn take_due(&self, now_ms: u64) -> Result<Option<PendingWake>, DatabaseError> {
        match self.pending()? {
            Some(wake) if wake.at_ms <= now_ms => {
                self.clear()?;
                Ok(Some(wake))
            }
            _ => Ok(None),
        }
    }

    fn clear(&self) -> Result<(), DatabaseError> {
        self.db
            .with_conn(|conn| conn.execute("DELETE FROM pending_wake", []).map(|_| ()))
    }
}

impl WakeScheduler for SqliteWakeQueue {
    fn schedule(&mut self, at_ms: u64, tag: WakeTag) {
        let at = i64::try_from(at_ms).unwrap_or(i64::MAX);
        let result = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO pending_wake (id, at_ms, tag) VALUES (1, ?1, ?2)",
                params![at, tag.as_str()],
            )
            .map(|_| ())
        });
        if let Err(err) = result {
            warn!(error = %err, %tag, at_ms, "failed to schedule wake");
        }
    }

    fn cancel_all(&mut self) {
        if let Err(err) = self.clear() {
            warn!(error = %err, "failed to cancel pending wake");
        }
    }
}
