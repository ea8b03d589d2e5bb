//! Worker Module
//!
//! Consumers of the job queue.
//!
//! ## Responsibilities
//! - Decode route jobs popped from the server
//! - Ask the external routing engine for a duration/distance
//! - Write `{response, attributes}` records back through the server's sink
//! - Run many routers side by side, each with its own connection
//!
//! Routers share nothing in-process; all coordination goes through the server.

mod job;
mod router;
mod pool;
pub mod departure;

pub use job::{Coordinate, RouteJob};
pub use router::{DistanceProvider, Route, Router, RouterStats};
pub use pool::WorkerPool;
