//! Configuration for TNRA
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default TCP port of the job server
pub const DEFAULT_PORT: u16 = 5555;

/// Default client response timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Main configuration for a TNRA server (and the clients that talk to it)
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// How long a client waits for a response (milliseconds)
    pub client_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Queue Configuration
    // -------------------------------------------------------------------------
    /// Order in which `queue_pop` hands out jobs
    pub queue_discipline: QueueDiscipline,

    // -------------------------------------------------------------------------
    // File Configuration
    // -------------------------------------------------------------------------
    /// Directory that relative filenames in commands are resolved against
    pub work_dir: PathBuf,
}

/// Retrieval order of the job queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueDiscipline {
    /// Most recently enqueued job first (stack)
    #[default]
    Lifo,

    /// Oldest job first
    Fifo,
}

impl FromStr for QueueDiscipline {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lifo" | "stack" => Ok(QueueDiscipline::Lifo),
            "fifo" | "queue" => Ok(QueueDiscipline::Fifo),
            other => Err(format!("unknown queue discipline '{}' (expected lifo or fifo)", other)),
        }
    }
}

impl fmt::Display for QueueDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueDiscipline::Lifo => write!(f, "lifo"),
            QueueDiscipline::Fifo => write!(f, "fifo"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            max_connections: 1024,
            write_timeout_ms: 5000,
            client_timeout_ms: DEFAULT_TIMEOUT_MS,
            queue_discipline: QueueDiscipline::Lifo,
            work_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the client response timeout (in milliseconds)
    pub fn client_timeout_ms(mut self, ms: u64) -> Self {
        self.config.client_timeout_ms = ms;
        self
    }

    /// Set the queue retrieval order
    pub fn queue_discipline(mut self, discipline: QueueDiscipline) -> Self {
        self.config.queue_discipline = discipline;
        self
    }

    /// Set the directory relative filenames resolve against
    pub fn work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.work_dir = path.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
