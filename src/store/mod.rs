//! Store Module
//!
//! The three pieces of server state.
//!
//! ## Responsibilities
//! - `JobQueue`: compressed jobs, LIFO by default, dump/restore one per line
//! - `Sink`: at most one open output file, one JSON record per line
//! - `VarStore`: key/value table, saved and loaded as one JSON object
//!
//! None of these lock. They are owned by the dispatcher, which runs one
//! command at a time.

mod queue;
mod sink;
mod vars;

pub use queue::JobQueue;
pub use sink::Sink;
pub use vars::VarStore;
