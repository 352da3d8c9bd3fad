//! The schedule book: entry store paired with a due-time index.
//!
//! Invariant: `index` holds exactly one `(due_ms, id)` key per entry in
//! `entries`, and nothing else. Every method keeps both maps in step, and the
//! engine wraps the whole book in a single `Mutex`, so no observer can see
//! the two structures disagree about an entry's existence.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::types::EntryId;

/// One stored entry. The command stays in its encoded byte form until firing.
#[derive(Debug, Clone)]
pub(crate) struct EntryRecord {
    pub schedule: String,
    pub due_at: DateTime<Utc>,
    pub payload: Vec<u8>,
    pub attempts: u32,
}

/// Why a due-time shift was refused.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ShiftError {
    /// Id absent, or registered under a different schedule.
    NotFound,
    /// Shifted due time falls outside the representable date range.
    OutOfRange,
}

/// A due entry lifted out of the book for execution.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub id: EntryId,
    pub schedule: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
pub(crate) struct ScheduleBook {
    /// Source of truth for entry contents.
    entries: HashMap<EntryId, EntryRecord>,
    /// Due-time order: due millis ascending, then id ascending.
    index: BTreeMap<(i64, EntryId), ()>,
    next_id: u64,
}

impl ScheduleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry into both structures, allocating its id.
    pub fn insert(&mut self, schedule: String, due_at: DateTime<Utc>, payload: Vec<u8>) -> EntryId {
        self.next_id += 1;
        let id = EntryId(self.next_id);
        self.index.insert((due_at.timestamp_millis(), id), ());
        self.entries.insert(
            id,
            EntryRecord {
                schedule,
                due_at,
                payload,
                attempts: 0,
            },
        );
        id
    }

    /// Remove an entry by id, but only when the schedule name matches.
    pub fn remove(&mut self, schedule: &str, id: EntryId) -> Option<EntryRecord> {
        match self.entries.get(&id) {
            Some(rec) if rec.schedule == schedule => {}
            _ => return None,
        }
        self.remove_any(id)
    }

    /// Remove an entry regardless of schedule name (firing path; the id came
    /// from the index, so the pairing is already known).
    pub fn remove_any(&mut self, id: EntryId) -> Option<EntryRecord> {
        let rec = self.entries.remove(&id)?;
        self.index.remove(&(rec.due_at.timestamp_millis(), id));
        Some(rec)
    }

    /// All entries due at or before `now_ms`, in (due, id) order.
    pub fn due_candidates(&self, now_ms: i64) -> Vec<Candidate> {
        self.index
            .range(..=(now_ms, EntryId(u64::MAX)))
            .filter_map(|((_, id), _)| {
                self.entries.get(id).map(|rec| Candidate {
                    id: *id,
                    schedule: rec.schedule.clone(),
                    payload: rec.payload.clone(),
                })
            })
            .collect()
    }

    /// Pending entries of one schedule, in (due, id) order.
    pub fn snapshot(&self, schedule: &str) -> Vec<(EntryId, EntryRecord)> {
        self.index
            .keys()
            .filter_map(|(_, id)| {
                self.entries
                    .get(id)
                    .filter(|rec| rec.schedule == schedule)
                    .map(|rec| (*id, rec.clone()))
            })
            .collect()
    }

    /// Shift an entry's due time by `delta` (either sign), re-keying the
    /// index atomically. On error the entry is untouched.
    pub fn shift_due(
        &mut self,
        schedule: &str,
        id: EntryId,
        delta: Duration,
    ) -> Result<DateTime<Utc>, ShiftError> {
        let rec = self.entries.get_mut(&id).ok_or(ShiftError::NotFound)?;
        if rec.schedule != schedule {
            return Err(ShiftError::NotFound);
        }
        let new_due = rec
            .due_at
            .checked_add_signed(delta)
            .ok_or(ShiftError::OutOfRange)?;
        self.index.remove(&(rec.due_at.timestamp_millis(), id));
        rec.due_at = new_due;
        self.index.insert((new_due.timestamp_millis(), id), ());
        Ok(new_due)
    }

    /// Increment an entry's attempt counter. Returns the new count, or `None`
    /// when the entry is gone.
    pub fn bump_attempts(&mut self, id: EntryId) -> Option<u32> {
        let rec = self.entries.get_mut(&id)?;
        rec.attempts += 1;
        Some(rec.attempts)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn min_due_ms(&self) -> Option<i64> {
        self.index.keys().next().map(|(ms, _)| *ms)
    }
}
