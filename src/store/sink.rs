//! Result sink
//!
//! The server's single output file for result records.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TnraError};
use crate::payload::Payload;
use crate::protocol::FileMode;

/// An open output file
struct OpenSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Single-writer append stream, at most one open at a time
#[derive(Default)]
pub struct Sink {
    current: Option<OpenSink>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path`, closing whatever was open before
    pub fn open(&mut self, path: &Path, mode: FileMode) -> Result<()> {
        if self.current.is_some() {
            self.close()?;
        }

        let mut options = OpenOptions::new();
        match mode {
            FileMode::Write => options.write(true).create(true).truncate(true),
            FileMode::Append => options.append(true).create(true),
        };
        let file = options.open(path)?;

        tracing::debug!("Opened sink {} (mode {})", path.display(), mode);
        self.current = Some(OpenSink {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        });
        Ok(())
    }

    /// Append one JSON line and flush it
    pub fn write_record(&mut self, record: &Payload) -> Result<()> {
        let sink = self.current.as_mut().ok_or(TnraError::SinkNotOpen)?;

        let line = record.to_json_string()?;
        sink.writer.write_all(line.as_bytes())?;
        sink.writer.write_all(b"\n")?;
        sink.writer.flush()?;
        Ok(())
    }

    /// Flush and close the open file
    pub fn close(&mut self) -> Result<()> {
        let mut sink = self.current.take().ok_or(TnraError::SinkNotOpen)?;
        sink.writer.flush()?;
        sink.writer.get_ref().sync_all()?;

        tracing::debug!("Closed sink {}", sink.path.display());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Path of the open file, if any
    pub fn path(&self) -> Option<&Path> {
        self.current.as_ref().map(|sink| sink.path.as_path())
    }
}
