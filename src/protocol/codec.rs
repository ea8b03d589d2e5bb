//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! Commands and responses share one frame layout:
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Code (1) │ Len (4)  │   bincode(Payload) body     │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! `Len == 0` means the envelope has no body. A present body is never empty
//! because bincode always writes the payload tag. Bodies nested deeper than
//! `MAX_NESTING_DEPTH` are rejected in both directions.
//!
//! ### Body by Command Type
//! - ECHO, ENQUEUE, WRITE_TO_DISK: the value itself
//! - OPEN_FILE:              `{filename, mode}` (mode defaults to "w")
//! - SAVE_*/LOAD_*:          `{filename}`
//! - GET_VAR:                `{key}`
//! - SET_VAR:                `{key, value}`
//! - everything else:        empty

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use super::{Command, CommandType, FileMode, Response, Status};
use crate::error::{Result, TnraError};
use crate::payload::{Payload, MAX_NESTING_DEPTH};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum body size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

/// Build a frame from a code and an optional body
fn encode_frame(code: u8, body: Option<&Payload>) -> Result<Vec<u8>> {
    let body_bytes = match body {
        Some(payload) => {
            let depth = payload.depth();
            if depth > MAX_NESTING_DEPTH {
                return Err(TnraError::Protocol(format!(
                    "Payload too deep: {} levels (max {})",
                    depth, MAX_NESTING_DEPTH
                )));
            }
            bincode::serialize(payload)?
        }
        None => Vec::new(),
    };

    if body_bytes.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(TnraError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            body_bytes.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = Vec::with_capacity(HEADER_SIZE + body_bytes.len());
    message.put_u8(code);
    message.put_u32(body_bytes.len() as u32);
    message.put_slice(&body_bytes);

    Ok(message)
}

/// Split a frame into its code and decoded body
fn decode_frame(bytes: &[u8]) -> Result<(u8, Option<Payload>)> {
    if bytes.len() < HEADER_SIZE {
        return Err(TnraError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let code = header.get_u8();
    let payload_len = header.get_u32() as usize;

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(TnraError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(TnraError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let body = if payload_len > 0 {
        let payload: Payload = bincode::deserialize(&bytes[HEADER_SIZE..total_len])
            .map_err(|e| TnraError::Protocol(format!("Malformed body: {}", e)))?;
        Some(payload)
    } else {
        None
    };

    Ok((code, body))
}

/// Read one raw frame (header + body) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = (&header[1..]).get_u32() as usize;
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(TnraError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = vec![0u8; HEADER_SIZE + payload_len];
    frame[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut frame[HEADER_SIZE..])?;
    }

    Ok(frame)
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let cmd_type = command.command_type() as u8;

    let body = match command {
        Command::Exit
        | Command::Ping
        | Command::QueuePop
        | Command::QueueSize
        | Command::QueueFlush
        | Command::CloseFile => None,
        Command::Echo { message } => Some(message.clone()),
        Command::Enqueue { job } => Some(job.clone()),
        Command::WriteToDisk { record } => Some(record.clone()),
        Command::OpenFile { filename, mode } => Some(Payload::map([
            ("filename", filename.as_str()),
            ("mode", mode.as_str()),
        ])),
        Command::SaveQueue { filename }
        | Command::LoadQueue { filename }
        | Command::SaveVars { filename }
        | Command::LoadVars { filename } => {
            Some(Payload::map([("filename", filename.as_str())]))
        }
        Command::GetVar { key } => Some(Payload::map([("key", key.as_str())])),
        Command::SetVar { key, value } => Some(Payload::map([
            ("key", Payload::from(key.as_str())),
            ("value", value.clone()),
        ])),
    };

    encode_frame(cmd_type, body.as_ref())
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (code, body) = decode_frame(bytes)?;

    let cmd_type = CommandType::try_from(code).map_err(|code| {
        TnraError::Protocol(format!("Unknown command type: {}", code))
    })?;

    match cmd_type {
        CommandType::Exit => expect_no_body(body, "EXIT").map(|_| Command::Exit),
        CommandType::Ping => expect_no_body(body, "PING").map(|_| Command::Ping),
        CommandType::QueuePop => expect_no_body(body, "QUEUE_POP").map(|_| Command::QueuePop),
        CommandType::QueueSize => expect_no_body(body, "QUEUE_SIZE").map(|_| Command::QueueSize),
        CommandType::QueueFlush => {
            expect_no_body(body, "QUEUE_FLUSH").map(|_| Command::QueueFlush)
        }
        CommandType::CloseFile => expect_no_body(body, "CLOSE_FILE").map(|_| Command::CloseFile),

        CommandType::Echo => Ok(Command::Echo {
            message: require_body(body, "ECHO")?,
        }),
        CommandType::Enqueue => Ok(Command::Enqueue {
            job: require_body(body, "ENQUEUE")?,
        }),
        CommandType::WriteToDisk => Ok(Command::WriteToDisk {
            record: require_body(body, "WRITE_TO_DISK")?,
        }),

        CommandType::OpenFile => decode_open_file_command(require_body(body, "OPEN_FILE")?),
        CommandType::SaveQueue => Ok(Command::SaveQueue {
            filename: take_string(&mut require_body(body, "SAVE_QUEUE")?, "filename", "SAVE_QUEUE")?,
        }),
        CommandType::LoadQueue => Ok(Command::LoadQueue {
            filename: take_string(&mut require_body(body, "LOAD_QUEUE")?, "filename", "LOAD_QUEUE")?,
        }),
        CommandType::SaveVars => Ok(Command::SaveVars {
            filename: take_string(&mut require_body(body, "SAVE_VARS")?, "filename", "SAVE_VARS")?,
        }),
        CommandType::LoadVars => Ok(Command::LoadVars {
            filename: take_string(&mut require_body(body, "LOAD_VARS")?, "filename", "LOAD_VARS")?,
        }),

        CommandType::GetVar => Ok(Command::GetVar {
            key: take_string(&mut require_body(body, "GET_VAR")?, "key", "GET_VAR")?,
        }),
        CommandType::SetVar => decode_set_var_command(require_body(body, "SET_VAR")?),
    }
}

/// Decode OPEN_FILE body
fn decode_open_file_command(mut body: Payload) -> Result<Command> {
    let filename = take_string(&mut body, "filename", "OPEN_FILE")?;

    let mode = match body.take("mode") {
        None | Some(Payload::Null) => FileMode::default(),
        Some(Payload::Str(mode)) => mode
            .parse::<FileMode>()
            .map_err(|e| TnraError::Protocol(format!("OPEN_FILE command: {}", e)))?,
        Some(other) => {
            return Err(TnraError::Protocol(format!(
                "OPEN_FILE command: mode must be a string, got {}",
                other
            )))
        }
    };

    Ok(Command::OpenFile { filename, mode })
}

/// Decode SET_VAR body
fn decode_set_var_command(mut body: Payload) -> Result<Command> {
    let key = take_string(&mut body, "key", "SET_VAR")?;
    let value = body
        .take("value")
        .ok_or_else(|| TnraError::Protocol("SET_VAR command: missing value".to_string()))?;

    Ok(Command::SetVar { key, value })
}

fn expect_no_body(body: Option<Payload>, name: &str) -> Result<()> {
    match body {
        None => Ok(()),
        Some(_) => Err(TnraError::Protocol(format!(
            "{} command: unexpected body",
            name
        ))),
    }
}

fn require_body(body: Option<Payload>, name: &str) -> Result<Payload> {
    body.ok_or_else(|| TnraError::Protocol(format!("{} command: missing body", name)))
}

fn take_string(body: &mut Payload, field: &str, name: &str) -> Result<String> {
    match body.take(field) {
        Some(Payload::Str(value)) => Ok(value),
        Some(other) => Err(TnraError::Protocol(format!(
            "{} command: {} must be a string, got {}",
            name, field, other
        ))),
        None => Err(TnraError::Protocol(format!(
            "{} command: missing {}",
            name, field
        ))),
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    encode_frame(response.status as u8, response.body.as_ref())
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (code, body) = decode_frame(bytes)?;

    let status = Status::try_from(code).map_err(|code| {
        TnraError::Protocol(format!("Unknown response status: {}", code))
    })?;

    Ok(Response { status, body })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let frame = read_frame(reader)?;
    decode_command(&frame)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let frame = read_frame(reader)?;
    decode_response(&frame)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
