//! Command payload codec.
//!
//! A command is an ordered list of byte-string arguments, first element the
//! command name. Arguments are arbitrary bytes (NUL, empty, non-UTF-8 are all
//! legal), so the storable form is a length-prefixed binary layout rather than
//! text: a u32-LE argument count, then per argument a u32-LE byte length
//! followed by the raw bytes.
//!
//! Round-trip is exact: `decode(encode(x)) == x` for every list within the
//! caps.

use deferq_core::config::{MAX_COMMAND_ARGS, MAX_PAYLOAD_BYTES};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A command must carry at least its name.
    #[error("Command is empty")]
    EmptyCommand,

    #[error("Too many arguments: {count} (max {max})")]
    TooManyArgs { count: usize, max: usize },

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The stored bytes end before the declared lengths are satisfied.
    #[error("Payload truncated at byte {offset}")]
    Truncated { offset: usize },

    /// Bytes remain after the declared argument count was consumed.
    #[error("Trailing bytes after argument {count}")]
    TrailingBytes { count: usize },
}

/// Serialize an argument list into its storable byte form.
pub fn encode(command: &[Vec<u8>]) -> Result<Vec<u8>, CodecError> {
    if command.is_empty() {
        return Err(CodecError::EmptyCommand);
    }
    if command.len() > MAX_COMMAND_ARGS {
        return Err(CodecError::TooManyArgs {
            count: command.len(),
            max: MAX_COMMAND_ARGS,
        });
    }

    let size = 4 + command.iter().map(|arg| 4 + arg.len()).sum::<usize>();
    if size > MAX_PAYLOAD_BYTES {
        return Err(CodecError::PayloadTooLarge {
            size,
            max: MAX_PAYLOAD_BYTES,
        });
    }

    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&(command.len() as u32).to_le_bytes());
    for arg in command {
        buf.extend_from_slice(&(arg.len() as u32).to_le_bytes());
        buf.extend_from_slice(arg);
    }
    Ok(buf)
}

/// Decode a stored payload back into its argument list.
pub fn decode(payload: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    let mut offset = 0usize;

    let count = read_u32(payload, &mut offset)? as usize;
    if count == 0 {
        return Err(CodecError::EmptyCommand);
    }
    if count > MAX_COMMAND_ARGS {
        return Err(CodecError::TooManyArgs {
            count,
            max: MAX_COMMAND_ARGS,
        });
    }

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let len = read_u32(payload, &mut offset)? as usize;
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= payload.len())
            .ok_or(CodecError::Truncated { offset })?;
        args.push(payload[offset..end].to_vec());
        offset = end;
    }

    if offset != payload.len() {
        return Err(CodecError::TrailingBytes { count });
    }
    Ok(args)
}

fn read_u32(payload: &[u8], offset: &mut usize) -> Result<u32, CodecError> {
    let end = *offset + 4;
    if end > payload.len() {
        return Err(CodecError::Truncated { offset: *offset });
    }
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&payload[*offset..end]);
    *offset = end;
    Ok(u32::from_le_bytes(raw))
}
