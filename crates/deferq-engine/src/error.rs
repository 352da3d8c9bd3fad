use thiserror::Error;

use crate::codec::CodecError;
use crate::types::EntryId;

/// Errors that can occur within the scheduler engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed caller input: empty command, negative delay or shift.
    /// Never enters storage.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No pending entry with the given id in the named schedule.
    #[error("Entry not found: {id}")]
    EntryNotFound { id: EntryId },

    /// Payload codec failure. Unreachable from well-formed `add` calls.
    #[error("Payload encoding error: {0}")]
    Encoding(#[from] CodecError),

    /// The command executor reported a failure.
    #[error("Execution failed: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
