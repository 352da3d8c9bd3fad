use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a pending entry.
///
/// Assigned from a per-engine monotonic counter, so ascending id order equals
/// creation order. That makes the tie-break for entries sharing a due time
/// deterministic: oldest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pending scheduled command, as returned by `scan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: EntryId,
    /// Grouping key the entry was registered under; not unique across entries.
    pub schedule: String,
    /// Absolute time at or after which the entry is eligible for firing.
    pub due_at: DateTime<Utc>,
    /// Ordered byte-string arguments; the first element is the command name.
    pub command: Vec<Vec<u8>>,
    /// Number of failed executor invocations so far.
    pub attempts: u32,
}

/// Outcome of one processed due candidate.
///
/// Emitted on the engine's observer channel (when one is attached) and
/// logged. There is no synchronous caller at fire time, so this channel is
/// the only way failures surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FireOutcome {
    /// Executor ran the command successfully; entry removed.
    Executed { id: EntryId, schedule: String },
    /// Executor failed; entry stays pending and is retried next tick.
    Retrying {
        id: EntryId,
        schedule: String,
        attempts: u32,
        reason: String,
    },
    /// Retry budget exhausted; entry removed.
    Exhausted {
        id: EntryId,
        schedule: String,
        attempts: u32,
        reason: String,
    },
    /// Stored payload no longer decodes; entry removed.
    Undecodable {
        id: EntryId,
        schedule: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_serializes_transparently() {
        let json = serde_json::to_string(&EntryId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn fire_outcome_wire_shape() {
        let outcome = FireOutcome::Exhausted {
            id: EntryId(7),
            schedule: "timetable".into(),
            attempts: 3,
            reason: "no such key".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(r#""kind":"exhausted""#));
        assert!(json.contains(r#""id":7"#));
        assert!(json.contains(r#""attempts":3"#));
    }
}
