//! Byte-level command dispatch over [`MemoryStore`], plus the engine's
//! [`CommandExecutor`] implementation.

use async_trait::async_trait;
use tracing::debug;

use deferq_engine::{CommandExecutor, ExecutorError};

use crate::error::{Result, StoreError};
use crate::store::MemoryStore;

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Pong,
    Int(i64),
    Bulk(Option<Vec<u8>>),
    Array(Vec<Vec<u8>>),
}

impl MemoryStore {
    /// Run one command (name + arguments, all byte strings) against the
    /// keyspace. Command names are matched case-insensitively.
    pub fn execute_command(&self, command: &[Vec<u8>]) -> Result<Reply> {
        let name = command
            .first()
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .map(|s| s.to_ascii_uppercase())
            .ok_or_else(|| StoreError::UnknownCommand("<non-utf8>".into()))?;
        let args = &command[1..];

        match (name.as_str(), args) {
            ("PING", []) => Ok(Reply::Pong),

            ("SET", [key, value]) => {
                self.set(key, value);
                Ok(Reply::Ok)
            }
            ("GET", [key]) => Ok(Reply::Bulk(self.get(key)?)),
            ("DEL", keys) if !keys.is_empty() => {
                let keys: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
                Ok(Reply::Int(self.del(&keys) as i64))
            }

            ("LPUSH", [key, values @ ..]) if !values.is_empty() => {
                let values: Vec<&[u8]> = values.iter().map(|v| v.as_slice()).collect();
                Ok(Reply::Int(self.lpush(key, &values)? as i64))
            }
            ("RPUSH", [key, values @ ..]) if !values.is_empty() => {
                let values: Vec<&[u8]> = values.iter().map(|v| v.as_slice()).collect();
                Ok(Reply::Int(self.rpush(key, &values)? as i64))
            }
            ("LPOP", [key]) => Ok(Reply::Bulk(self.lpop(key)?)),
            ("LLEN", [key]) => Ok(Reply::Int(self.llen(key)? as i64)),
            ("LRANGE", [key, start, stop]) => {
                let start = parse_int(start)?;
                let stop = parse_int(stop)?;
                Ok(Reply::Array(self.lrange(key, start, stop)?))
            }

            ("PING" | "SET" | "GET" | "DEL" | "LPUSH" | "RPUSH" | "LPOP" | "LLEN" | "LRANGE", _) => {
                Err(StoreError::WrongArity { command: name })
            }
            _ => Err(StoreError::UnknownCommand(name)),
        }
    }
}

fn parse_int(raw: &[u8]) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| StoreError::NotAnInteger(String::from_utf8_lossy(raw).into_owned()))
}

#[async_trait]
impl CommandExecutor for MemoryStore {
    async fn execute(&self, command: &[Vec<u8>]) -> std::result::Result<(), ExecutorError> {
        match self.execute_command(command) {
            Ok(reply) => {
                debug!(?reply, "scheduled command executed");
                Ok(())
            }
            Err(e) => Err(ExecutorError::new(e.to_string())),
        }
    }
}
