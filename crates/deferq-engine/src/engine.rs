use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, watch, Notify};
use tracing::{debug, error, info, warn};

use deferq_core::config::{EngineConfig, FiringScope};

use crate::book::{Candidate, ScheduleBook, ShiftError};
use crate::codec;
use crate::error::{EngineError, Result};
use crate::executor::CommandExecutor;
use crate::types::{EntryId, FireOutcome, ScheduleEntry};

/// Largest accepted delay or due-time shift, in days. Keeps due timestamps
/// far away from the representable range so date arithmetic cannot overflow.
const MAX_SHIFT_DAYS: i64 = 36_500;

/// State shared between the firing loop and all API handles.
struct Shared {
    book: Mutex<ScheduleBook>,
    executor: Arc<dyn CommandExecutor>,
    /// Wakes the loop when a mutation makes an entry due right now, so it
    /// does not have to wait out the current tick interval.
    wake: Notify,
}

/// Clone-able public API of one engine instance.
///
/// All operations may be called concurrently with each other and with the
/// firing loop; each read-modify-write of the book is one critical section.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Register `command` to run `delay` after now, under `schedule`.
    ///
    /// Fails with `InvalidArgument` when the command is empty or the delay is
    /// negative. A zero (or already elapsed) delay is legal: the entry simply
    /// becomes eligible for the next scan.
    pub fn add(&self, schedule: &str, delay: Duration, command: &[Vec<u8>]) -> Result<EntryId> {
        if delay < Duration::zero() {
            return Err(EngineError::InvalidArgument(
                "delay must be non-negative".into(),
            ));
        }
        if delay > Duration::days(MAX_SHIFT_DAYS) {
            return Err(EngineError::InvalidArgument("delay too large".into()));
        }
        if command.is_empty() {
            return Err(EngineError::InvalidArgument(
                "command must not be empty".into(),
            ));
        }

        let payload = codec::encode(command)?;
        let now = Utc::now();
        let due_at = now + delay;

        let id = {
            let mut book = self.shared.book.lock().unwrap();
            book.insert(schedule.to_string(), due_at, payload)
        };
        debug!(entry_id = %id, schedule, due_at = %due_at, "entry added");

        if due_at <= now {
            self.shared.wake.notify_one();
        }
        Ok(id)
    }

    /// Snapshot of all pending entries under `schedule`, ordered by due time
    /// ascending then id ascending. Empty vec when the schedule has none.
    pub fn scan(&self, schedule: &str) -> Vec<ScheduleEntry> {
        let records = {
            let book = self.shared.book.lock().unwrap();
            book.snapshot(schedule)
        };
        records
            .into_iter()
            .filter_map(|(id, rec)| match codec::decode(&rec.payload) {
                Ok(command) => Some(ScheduleEntry {
                    id,
                    schedule: rec.schedule,
                    due_at: rec.due_at,
                    command,
                    attempts: rec.attempts,
                }),
                Err(e) => {
                    // Undecodable entries are culled by the firing loop; skip
                    // them here rather than failing the whole scan.
                    error!(entry_id = %id, "stored payload failed to decode: {e}");
                    None
                }
            })
            .collect()
    }

    /// Remove a pending entry. Returns whether removal occurred; removing an
    /// already-removed or already-fired entry is not an error.
    pub fn rem(&self, schedule: &str, id: EntryId) -> bool {
        let removed = {
            let mut book = self.shared.book.lock().unwrap();
            book.remove(schedule, id).is_some()
        };
        if removed {
            debug!(entry_id = %id, schedule, "entry removed");
        }
        removed
    }

    /// Push an entry's due time `by` later. Returns the new due time.
    pub fn postpone(&self, schedule: &str, id: EntryId, by: Duration) -> Result<DateTime<Utc>> {
        self.shift(schedule, id, by, 1)
    }

    /// Pull an entry's due time `by` earlier. Returns the new due time. An
    /// entry pulled into the past becomes due immediately.
    pub fn advance(&self, schedule: &str, id: EntryId, by: Duration) -> Result<DateTime<Utc>> {
        self.shift(schedule, id, by, -1)
    }

    fn shift(
        &self,
        schedule: &str,
        id: EntryId,
        by: Duration,
        sign: i32,
    ) -> Result<DateTime<Utc>> {
        if by < Duration::zero() {
            return Err(EngineError::InvalidArgument(
                "shift must be non-negative".into(),
            ));
        }
        if by > Duration::days(MAX_SHIFT_DAYS) {
            return Err(EngineError::InvalidArgument("shift too large".into()));
        }
        let delta = by * sign;

        let new_due = {
            let mut book = self.shared.book.lock().unwrap();
            book.shift_due(schedule, id, delta).map_err(|e| match e {
                ShiftError::NotFound => EngineError::EntryNotFound { id },
                ShiftError::OutOfRange => {
                    EngineError::InvalidArgument("shifted due time out of range".into())
                }
            })?
        };
        debug!(entry_id = %id, schedule, due_at = %new_due, "entry due time shifted");

        if new_due <= Utc::now() {
            self.shared.wake.notify_one();
        }
        Ok(new_due)
    }

    /// Remove an entry and execute its command immediately, bypassing the due
    /// check. Returns `false` when no such entry exists. The entry stays
    /// removed even when execution fails; the failure is returned since a
    /// caller exists at this point.
    pub async fn fire_now(&self, schedule: &str, id: EntryId) -> Result<bool> {
        let rec = {
            let mut book = self.shared.book.lock().unwrap();
            book.remove(schedule, id)
        };
        let Some(rec) = rec else {
            return Ok(false);
        };

        let command = codec::decode(&rec.payload)?;
        info!(entry_id = %id, schedule, "firing entry on demand");
        self.shared
            .executor
            .execute(&command)
            .await
            .map_err(|e| EngineError::Execution(e.to_string()))?;
        Ok(true)
    }

    /// Number of pending entries across all schedules.
    pub fn len(&self) -> usize {
        self.shared.book.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Core scheduler: polls the book for due entries and drives execution.
///
/// Construct with [`SchedulerEngine::new`], hand out [`SchedulerHandle`]s via
/// [`SchedulerEngine::handle`], then spawn [`SchedulerEngine::run`] as a
/// background task. There is exactly one loop task per engine and batches run
/// inline within it, so scan/execute passes never overlap.
pub struct SchedulerEngine {
    shared: Arc<Shared>,
    config: EngineConfig,
    /// If set, per-candidate fire outcomes are sent here for observation.
    fired_tx: Option<mpsc::Sender<FireOutcome>>,
}

impl SchedulerEngine {
    /// Create a new engine instance with its own empty book.
    ///
    /// Pass `Some(tx)` to receive a [`FireOutcome`] for every processed due
    /// candidate. The sender is non-blocking (`try_send`) so the tick loop is
    /// never stalled by a slow observer.
    pub fn new(
        config: EngineConfig,
        executor: Arc<dyn CommandExecutor>,
        fired_tx: Option<mpsc::Sender<FireOutcome>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                book: Mutex::new(ScheduleBook::new()),
                executor,
                wake: Notify::new(),
            }),
            config,
            fired_tx,
        }
    }

    /// A clone-able handle to this engine's public API.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Main firing loop. Polls every `tick_ms` until `shutdown` broadcasts
    /// `true`, waking early when a mutation lands an already-due entry.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            tick_ms = self.config.tick_ms,
            max_attempts = self.config.max_attempts,
            "scheduler engine started"
        );

        let tick = std::time::Duration::from_millis(self.config.tick_ms.max(1));
        let mut interval = tokio::time::interval(tick);
        // A batch that outlasts the interval coalesces the missed ticks
        // instead of bursting to catch up.
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = self.shared.wake.notified() => self.tick().await,
                changed = shutdown.changed() => {
                    // A dropped sender can never signal shutdown later; treat
                    // it the same as an explicit one.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One Scanning → Executing → Reconciling pass.
    async fn tick(&self) {
        let now_ms = Utc::now().timestamp_millis();

        // Scanning: lift the due batch out of the book in (due, id) order,
        // then release the lock before any execution.
        let mut batch = {
            let book = self.shared.book.lock().unwrap();
            book.due_candidates(now_ms)
        };
        if batch.is_empty() {
            return;
        }

        if self.config.firing_scope == FiringScope::PerSchedule {
            // Stable sort: (due, id) order survives within each schedule.
            batch.sort_by(|a, b| a.schedule.cmp(&b.schedule));
        }

        debug!(candidates = batch.len(), "processing due batch");
        for candidate in batch {
            // Each candidate is processed regardless of earlier outcomes; one
            // stuck entry must not block the rest of the batch.
            self.process(candidate).await;
        }
    }

    /// Executing + Reconciling for a single candidate. The entry is removed
    /// if and only if execution succeeded, the retry budget is exhausted, or
    /// the payload cannot be decoded.
    async fn process(&self, candidate: Candidate) {
        let Candidate { id, schedule, payload } = candidate;

        let command = match codec::decode(&payload) {
            Ok(command) => command,
            Err(e) => {
                // The entry can never become executable; drop it and move on.
                error!(entry_id = %id, schedule = %schedule, "dropping undecodable entry: {e}");
                self.shared.book.lock().unwrap().remove_any(id);
                self.emit(FireOutcome::Undecodable {
                    id,
                    schedule,
                    reason: e.to_string(),
                });
                return;
            }
        };

        // Execution happens outside the book lock.
        match self.shared.executor.execute(&command).await {
            Ok(()) => {
                // A concurrent `rem` may have won the race; removal here is
                // idempotent either way.
                self.shared.book.lock().unwrap().remove_any(id);
                debug!(entry_id = %id, schedule = %schedule, "entry executed");
                self.emit(FireOutcome::Executed { id, schedule });
            }
            Err(e) => {
                let attempts = self.shared.book.lock().unwrap().bump_attempts(id);
                let Some(attempts) = attempts else {
                    // Removed while executing; nothing left to reconcile.
                    return;
                };
                if attempts >= self.config.max_attempts {
                    self.shared.book.lock().unwrap().remove_any(id);
                    warn!(
                        entry_id = %id,
                        schedule = %schedule,
                        attempts,
                        "retry budget exhausted, dropping entry: {e}"
                    );
                    self.emit(FireOutcome::Exhausted {
                        id,
                        schedule,
                        attempts,
                        reason: e.to_string(),
                    });
                } else {
                    warn!(entry_id = %id, schedule = %schedule, attempts, "execution failed, will retry: {e}");
                    self.emit(FireOutcome::Retrying {
                        id,
                        schedule,
                        attempts,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn emit(&self, outcome: FireOutcome) {
        if let Some(ref tx) = self.fired_tx {
            // try_send never blocks the loop; a full observer channel loses
            // events, never entries.
            if tx.try_send(outcome).is_err() {
                warn!("fire outcome channel full or closed, event dropped");
            }
        }
    }
}
