//! # TNRA
//!
//! A job broker for distributed travel-time routing:
//! - Stack-ordered (LIFO) queue of compressed job payloads
//! - Append-only result sink backed by a file
//! - Persisted key/value variable store
//! - Synchronous request/response protocol over TCP
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//! │  Producer   │ │   Router    │ │   Router    │   (Client stubs,
//! │   Client    │ │   Client    │ │   Client    │    any process)
//! └──────┬──────┘ └──────┬──────┘ └──────┬──────┘
//!        └───────────────┼───────────────┘
//!                        │ TCP, one command ↔ one response
//! ┌──────────────────────▼──────────────────────────────────────┐
//! │            TCP Server (one reader thread per client)         │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ channel, strict arrival order
//! ┌──────────────────────▼──────────────────────────────────────┐
//! │                Dispatcher (single thread)                    │
//! └──────┬────────────────────┬────────────────────┬────────────┘
//!        ▼                    ▼                    ▼
//!  ┌───────────┐        ┌───────────┐        ┌───────────┐
//!  │ JobQueue  │        │   Sink    │        │ VarStore  │
//!  │  (LIFO)   │        │  (file)   │        │  (JSON)   │
//!  └───────────┘        └───────────┘        └───────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod payload;

pub mod protocol;
pub mod store;
pub mod dispatcher;
pub mod network;
pub mod worker;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TnraError, Result};
pub use config::{Config, QueueDiscipline};
pub use payload::Payload;
pub use dispatcher::{Dispatcher, Outcome};
pub use network::{Client, Server};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TNRA
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
