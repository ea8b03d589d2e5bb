//! Network Module
//!
//! TCP server, per-client connections and the client stub.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One reader thread per connection
//! - Commands funneled through one dispatch loop

mod server;
mod connection;
mod client;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, Request};
pub use client::Client;
