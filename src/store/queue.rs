//! Job queue
//!
//! In-memory collection of compressed job payloads.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::config::QueueDiscipline;
use crate::error::{Result, TnraError};
use crate::payload::Payload;

/// Queue of jobs awaiting workers
///
/// Jobs are kept oldest → newest; `discipline` decides which end `pop`
/// takes from.
pub struct JobQueue {
    /// bincode + zlib encoded payloads, oldest first
    jobs: VecDeque<Bytes>,

    /// Retrieval order
    discipline: QueueDiscipline,
}

impl JobQueue {
    /// Create an empty queue with the given retrieval order
    pub fn new(discipline: QueueDiscipline) -> Self {
        Self {
            jobs: VecDeque::new(),
            discipline,
        }
    }

    /// Compress and store a job
    ///
    /// Jobs nested deeper than `MAX_NESTING_DEPTH` are rejected so every
    /// queued job survives `save`/`load`.
    pub fn push(&mut self, job: &Payload) -> Result<()> {
        job.check_depth()?;
        let compressed = compress(job)?;
        self.jobs.push_back(compressed);
        Ok(())
    }

    /// Remove the next job, or `None` if the queue is empty
    pub fn pop(&mut self) -> Result<Option<Payload>> {
        let next = match self.discipline {
            QueueDiscipline::Lifo => self.jobs.pop_back(),
            QueueDiscipline::Fifo => self.jobs.pop_front(),
        };

        next.map(|blob| decompress(&blob)).transpose()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Discard every job
    pub fn flush(&mut self) {
        self.jobs.clear();
    }

    pub fn discipline(&self) -> QueueDiscipline {
        self.discipline
    }

    /// Compressed bytes currently held (for diagnostics)
    pub fn compressed_size(&self) -> usize {
        self.jobs.iter().map(Bytes::len).sum()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write every job as one JSON line, oldest first, truncating `path`
    ///
    /// Returns the number of jobs written.
    pub fn save(&self, path: &Path) -> Result<usize> {
        let mut writer = BufWriter::new(File::create(path)?);

        for blob in &self.jobs {
            let job = decompress(blob)?;
            writer.write_all(job.to_json_string()?.as_bytes())?;
            writer.write_all(b"\n")?;
        }

        writer.flush()?;
        Ok(self.jobs.len())
    }

    /// Push every non-blank line of `path` as a job, in file order
    ///
    /// Existing jobs stay queued. The file is parsed completely before
    /// anything is pushed, so a bad line leaves the queue unchanged.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        let reader = BufReader::new(File::open(path)?);

        let mut loaded = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let job = Payload::from_json_str(&line).map_err(|e| {
                TnraError::InvalidDocument(format!(
                    "{} line {}: {}",
                    path.display(),
                    index + 1,
                    e
                ))
            })?;
            loaded.push(compress(&job)?);
        }

        let count = loaded.len();
        self.jobs.extend(loaded);
        Ok(count)
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(QueueDiscipline::default())
    }
}

fn compress(job: &Payload) -> Result<Bytes> {
    let encoded = bincode::serialize(job)?;

    let mut encoder = ZlibEncoder::new(Vec::with_capacity(encoded.len() / 2), Compression::default());
    encoder
        .write_all(&encoded)
        .map_err(|e| TnraError::Compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| TnraError::Compression(e.to_string()))?;

    Ok(Bytes::from(compressed))
}

fn decompress(blob: &[u8]) -> Result<Payload> {
    let mut decoded = Vec::new();
    ZlibDecoder::new(blob)
        .read_to_end(&mut decoded)
        .map_err(|e| TnraError::Compression(e.to_string()))?;

    Ok(bincode::deserialize(&decoded)?)
}
