//! `deferq-engine`: delayed-command scheduler core.
//!
//! # Overview
//!
//! Callers register an arbitrary store command (ordered list of byte-string
//! arguments) to run after a delay, grouped under a named schedule. Entries
//! live in the book (an entry store paired with a due-time index behind one
//! lock) until the [`engine::SchedulerEngine`] firing loop finds them
//! due, hands them to the [`executor::CommandExecutor`] and removes them on
//! success.
//!
//! # Operations
//!
//! | Operation  | Behaviour                                                |
//! |------------|----------------------------------------------------------|
//! | `add`      | Encode payload, insert entry due at now + delay          |
//! | `scan`     | Snapshot of a schedule's pending entries, (due, id) order|
//! | `rem`      | Remove a pending entry; idempotent                       |
//! | `postpone` | Push an entry's due time later                           |
//! | `advance`  | Pull an entry's due time earlier                         |
//! | `fire_now` | Remove and execute an entry immediately                  |

mod book;
pub mod codec;
pub mod engine;
pub mod error;
pub mod executor;
pub mod types;

pub use deferq_core::config::{EngineConfig, FiringScope};
pub use engine::{SchedulerEngine, SchedulerHandle};
pub use error::{EngineError, Result};
pub use executor::{CommandExecutor, ExecutorError};
pub use types::{EntryId, FireOutcome, ScheduleEntry};
