use thiserror::Error;

/// Errors reported by the store's command dispatcher.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Wrong number of arguments for '{command}'")]
    WrongArity { command: String },

    /// Operation against a key holding the wrong kind of value.
    #[error("Wrong value type at key: {key}")]
    WrongType { key: String },

    #[error("Not an integer: {0}")]
    NotAnInteger(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
