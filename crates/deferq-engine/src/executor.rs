use async_trait::async_trait;
use thiserror::Error;

/// Failure reason reported by a [`CommandExecutor`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ExecutorError(pub String);

impl ExecutorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Capability that runs a decoded command against the underlying store.
///
/// The engine awaits the call directly and holds no internal lock while doing
/// so: a slow executor delays removal bookkeeping for the current batch but
/// never blocks `add`/`scan`/`rem` callers. Every failure is retried up to
/// the engine's attempt budget; the executor does not distinguish transient
/// from permanent errors.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &[Vec<u8>]) -> Result<(), ExecutorError>;
}
