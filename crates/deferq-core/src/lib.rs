//! `deferq-core`: configuration and shared constants for the deferq
//! delayed-command scheduler.

pub mod config;
pub mod error;

pub use config::{DeferqConfig, EngineConfig, FiringScope};
pub use error::{CoreError, Result};
