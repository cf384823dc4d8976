//! Flat primitive encoding of a [`Session`].
//!
//! Phase and break kind are stored as ordinals, timestamps as epoch
//! milliseconds with 0 standing for "not set".

use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::timer::{BreakKind, Phase, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionRecord {
    pub phase: i64,
    pub break_kind: i64,
    pub cycle_count: i64,
    pub start_time_ms: i64,
    pub finish_time_ms: i64,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            phase: session.phase.ordinal(),
            break_kind: session.break_kind.ordinal(),
            cycle_count: i64::from(session.cycle_count),
            start_time_ms: encode_time(session.start_time),
            finish_time_ms: encode_time(session.finish_time),
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = PersistError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        let phase = Phase::from_ordinal(record.phase)
            .ok_or_else(|| PersistError::Corrupt(format!("unknown phase ordinal {}", record.phase)))?;
        let break_kind = BreakKind::from_ordinal(record.break_kind).ok_or_else(|| {
            PersistError::Corrupt(format!("unknown break kind ordinal {}", record.break_kind))
        })?;
        let cycle_count = u32::try_from(record.cycle_count).map_err(|_| {
            PersistError::Corrupt(format!("cycle count {} out of range", record.cycle_count))
        })?;

        let session = Session {
            phase,
            break_kind,
            cycle_count,
            start_time: decode_time("start", record.start_time_ms)?,
            finish_time: decode_time("finish", record.finish_time_ms)?,
        };
        session.validate().map_err(PersistError::Corrupt)?;
        Ok(session)
    }
}

fn encode_time(value: Option<u64>) -> i64 {
    value
        .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn decode_time(label: &str, value: i64) -> Result<Option<u64>, PersistError> {
    match value {
        0 => Ok(None),
        v if v > 0 => Ok(Some(v as u64)),
        v => Err(PersistError::Corrupt(format!("negative {label} time {v}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reachable_session() -> impl Strategy<Value = Session> {
        let kind = prop_oneof![Just(BreakKind::Normal), Just(BreakKind::Long)];
        let resting = prop_oneof![
            Just(Phase::Idle),
            Just(Phase::FocusFinished),
            Just(Phase::RestFinished)
        ];
        let running = prop_oneof![Just(Phase::FocusRunning), Just(Phase::RestRunning)];
        prop_oneof![
            (resting, kind.clone(), any::<u32>()).prop_map(|(phase, break_kind, cycle_count)| {
                Session {
                    phase,
                    break_kind,
                    cycle_count,
                    start_time: None,
                    finish_time: None,
                }
            }),
            (running, kind, any::<u32>(), 1u64..4_000_000_000_000, 1u64..86_400_000).prop_map(
                |(phase, break_kind, cycle_count, start, len)| Session {
                    phase,
                    break_kind,
                    cycle_count,
                    start_time: Some(start),
                    finish_time: Some(start + len),
                }
            ),
        ]
    }

    proptest! {
        #[test]
        fn reachable_sessions_survive_the_codec(session in reachable_session()) {
            let record = SessionRecord::from(&session);
            prop_assert_eq!(Session::try_from(record).unwrap(), session);
        }
    }

    #[test]
    fn idle_session_encodes_zero_times() {
        let record = SessionRecord::from(&Session::new());
        assert_eq!(record, SessionRecord::default());
    }

    #[test]
    fn unknown_ordinals_are_corrupt() {
        let bad_phase = SessionRecord {
            phase: 7,
            ..SessionRecord::default()
        };
        assert!(matches!(Session::try_from(bad_phase), Err(PersistError::Corrupt(_))));

        let bad_kind = SessionRecord {
            break_kind: 2,
            ..SessionRecord::default()
        };
        assert!(matches!(Session::try_from(bad_kind), Err(PersistError::Corrupt(_))));
    }

    #[test]
    fn negative_values_are_corrupt() {
        let record = SessionRecord {
            cycle_count: -1,
            ..SessionRecord::default()
        };
        assert!(Session::try_from(record).is_err());

        let record = SessionRecord {
            phase: Phase::FocusRunning.ordinal(),
            start_time_ms: -5,
            finish_time_ms: 10,
            ..SessionRecord::default()
        };
        assert!(Session::try_from(record).is_err());
    }

    #[test]
    fn running_record_without_times_is_corrupt() {
        let record = SessionRecord {
            phase: Phase::RestRunning.ordinal(),
            ..SessionRecord::default()
        };
        assert!(Session::try_from(record).is_err());
    }
}
