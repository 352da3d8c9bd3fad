//! `deferq-store`: in-memory key-value store for scheduled commands.
//!
//! A small strings-and-lists keyspace with a byte-level command dispatcher,
//! implementing the engine's [`CommandExecutor`] capability. This is the
//! reference target for scheduled commands; a production deployment would
//! point the engine at a real store instead.
//!
//! Supported commands: `PING`, `SET`, `GET`, `DEL`, `LPUSH`, `RPUSH`,
//! `LPOP`, `LLEN`, `LRANGE`.

pub mod dispatch;
pub mod error;
pub mod store;

pub use dispatch::Reply;
pub use error::{Result, StoreError};
pub use store::MemoryStore;
