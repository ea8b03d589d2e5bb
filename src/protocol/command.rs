//! Command definitions
//!
//! Represents commands from clients.

use std::fmt;
use std::str::FromStr;

use crate::payload::Payload;

/// Command codes, grouped in numeric families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    // 1x: control
    Exit = 10,
    Echo = 11,
    Ping = 12,

    // 2x: queue
    Enqueue = 20,
    QueuePop = 21,
    QueueSize = 22,
    QueueFlush = 23,

    // 3x: files
    OpenFile = 30,
    CloseFile = 31,
    WriteToDisk = 32,
    SaveQueue = 33,
    LoadQueue = 34,

    // 4x: variables
    GetVar = 40,
    SetVar = 41,
    SaveVars = 42,
    LoadVars = 43,
}

impl TryFrom<u8> for CommandType {
    type Error = u8;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        let cmd_type = match code {
            10 => CommandType::Exit,
            11 => CommandType::Echo,
            12 => CommandType::Ping,
            20 => CommandType::Enqueue,
            21 => CommandType::QueuePop,
            22 => CommandType::QueueSize,
            23 => CommandType::QueueFlush,
            30 => CommandType::OpenFile,
            31 => CommandType::CloseFile,
            32 => CommandType::WriteToDisk,
            33 => CommandType::SaveQueue,
            34 => CommandType::LoadQueue,
            40 => CommandType::GetVar,
            41 => CommandType::SetVar,
            42 => CommandType::SaveVars,
            43 => CommandType::LoadVars,
            other => return Err(other),
        };
        Ok(cmd_type)
    }
}

/// How `open_file` opens the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    /// Truncate or create ("w")
    #[default]
    Write,

    /// Append or create ("a")
    Append,
}

impl FileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Write => "w",
            FileMode::Append => "a",
        }
    }
}

impl FromStr for FileMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "w" | "wt" => Ok(FileMode::Write),
            "a" | "at" => Ok(FileMode::Append),
            other => Err(format!("unsupported file mode '{}'", other)),
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Stop the server (no response is sent)
    Exit,

    /// Log a message on the server
    Echo { message: Payload },

    /// Health check
    Ping,

    /// Push a job onto the queue
    Enqueue { job: Payload },

    /// Take the next job off the queue
    QueuePop,

    /// Number of queued jobs
    QueueSize,

    /// Discard all queued jobs
    QueueFlush,

    /// Open the result sink, closing any previous one
    OpenFile { filename: String, mode: FileMode },

    /// Close the result sink
    CloseFile,

    /// Append one record to the result sink
    WriteToDisk { record: Payload },

    /// Dump the queue to a file, one job per line
    SaveQueue { filename: String },

    /// Push every line of a file onto the queue
    LoadQueue { filename: String },

    /// Read a variable
    GetVar { key: String },

    /// Write a variable
    SetVar { key: String, value: Payload },

    /// Persist all variables
    SaveVars { filename: String },

    /// Replace all variables from a file
    LoadVars { filename: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Exit => CommandType::Exit,
            Command::Echo { .. } => CommandType::Echo,
            Command::Ping => CommandType::Ping,
            Command::Enqueue { .. } => CommandType::Enqueue,
            Command::QueuePop => CommandType::QueuePop,
            Command::QueueSize => CommandType::QueueSize,
            Command::QueueFlush => CommandType::QueueFlush,
            Command::OpenFile { .. } => CommandType::OpenFile,
            Command::CloseFile => CommandType::CloseFile,
            Command::WriteToDisk { .. } => CommandType::WriteToDisk,
            Command::SaveQueue { .. } => CommandType::SaveQueue,
            Command::LoadQueue { .. } => CommandType::LoadQueue,
            Command::GetVar { .. } => CommandType::GetVar,
            Command::SetVar { .. } => CommandType::SetVar,
            Command::SaveVars { .. } => CommandType::SaveVars,
            Command::LoadVars { .. } => CommandType::LoadVars,
        }
    }
}
