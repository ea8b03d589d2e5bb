//! Dispatcher Module
//!
//! Executes commands against the server state.
//!
//! ## Responsibilities
//! - Own the job queue, result sink and variable store
//! - Map each command to exactly one response
//! - Turn store failures into NOT_OK responses instead of crashing
//! - Resolve relative filenames against the configured work directory

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::payload::Payload;
use crate::protocol::{Command, Response};
use crate::store::{JobQueue, Sink, VarStore};

/// What the server loop should do after a command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send this response and keep serving
    Reply(Response),

    /// Stop serving; nothing is sent back
    Exit,
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Outcome::Reply(response)
    }
}

/// Single owner of all server state
///
/// ## Concurrency Model
/// The dispatcher is not shared. The server loop feeds it one command at a
/// time, so none of the stores need locks and every command observes the
/// effects of all earlier ones.
pub struct Dispatcher {
    /// Jobs awaiting workers
    queue: JobQueue,

    /// Output file for result records
    sink: Sink,

    /// Named values shared between clients
    vars: VarStore,

    /// Base for relative filenames
    work_dir: PathBuf,
}

impl Dispatcher {
    /// Create a dispatcher with empty stores
    pub fn new(config: &Config) -> Self {
        Self {
            queue: JobQueue::new(config.queue_discipline),
            sink: Sink::new(),
            vars: VarStore::new(),
            work_dir: config.work_dir.clone(),
        }
    }

    /// Execute a command
    ///
    /// Failures are logged and reported as NOT_OK; only EXIT ends the loop,
    /// after closing the sink.
    pub fn dispatch(&mut self, command: Command) -> Outcome {
        let cmd_type = command.command_type();

        match self.execute(command) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("{:?} failed: {}", cmd_type, e);
                Outcome::Reply(Response::not_ok())
            }
        }
    }

    /// Route a command to its handler
    fn execute(&mut self, command: Command) -> Result<Outcome> {
        let response = match command {
            // 1x ---------------------------------------------------------------
            Command::Exit => {
                self.shutdown();
                return Ok(Outcome::Exit);
            }
            Command::Echo { message } => {
                tracing::info!("echo: {}", message);
                Response::ok()
            }
            Command::Ping => Response::ok(),

            // 2x ---------------------------------------------------------------
            Command::Enqueue { job } => {
                self.queue.push(&job)?;
                Response::ok()
            }
            Command::QueuePop => match self.queue.pop()? {
                Some(job) => Response::ok_with(job),
                None => Response::queue_empty(),
            },
            Command::QueueSize => Response::ok_with(self.queue.len()),
            Command::QueueFlush => {
                let dropped = self.queue.len();
                self.queue.flush();
                tracing::debug!("Flushed {} jobs", dropped);
                Response::ok()
            }

            // 3x ---------------------------------------------------------------
            Command::OpenFile { filename, mode } => {
                let path = self.resolve(&filename);
                self.sink.open(&path, mode)?;
                Response::ok()
            }
            Command::CloseFile => {
                self.sink.close()?;
                Response::ok()
            }
            Command::WriteToDisk { record } => {
                self.sink.write_record(&record)?;
                Response::ok()
            }
            Command::SaveQueue { filename } => {
                let path = self.resolve(&filename);
                let count = self.queue.save(&path)?;
                tracing::info!("Saved {} jobs to {}", count, path.display());
                Response::ok()
            }
            Command::LoadQueue { filename } => {
                let path = self.resolve(&filename);
                let count = self.queue.load(&path)?;
                tracing::info!("Loaded {} jobs from {}", count, path.display());
                Response::ok()
            }

            // 4x ---------------------------------------------------------------
            Command::GetVar { key } => {
                let value = self.vars.get(&key).cloned().unwrap_or(Payload::Null);
                Response::ok_with(value)
            }
            Command::SetVar { key, value } => {
                self.vars.set(key, value);
                Response::ok()
            }
            Command::SaveVars { filename } => {
                let path = self.resolve(&filename);
                self.vars.save(&path)?;
                tracing::info!("Saved {} variables to {}", self.vars.len(), path.display());
                Response::ok()
            }
            Command::LoadVars { filename } => {
                let path = self.resolve(&filename);
                self.vars.load(&path)?;
                tracing::info!("Loaded {} variables from {}", self.vars.len(), path.display());
                Response::ok()
            }
        };

        Ok(response.into())
    }

    /// Release resources before the server stops
    pub fn shutdown(&mut self) {
        if self.sink.is_open() {
            if let Err(e) = self.sink.close() {
                tracing::warn!("Failed to close sink on shutdown: {}", e);
            }
        }
    }

    fn resolve(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn vars(&self) -> &VarStore {
        &self.vars
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}
