//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::time::Duration;

use crossbeam::channel::{bounded, Sender};

use crate::dispatcher::Outcome;
use crate::error::{Result, TnraError};
use crate::protocol::{read_command, write_response, Command, Response};

/// A command handed to the dispatch loop, with the channel its outcome goes back on
pub struct Request {
    pub command: Command,
    pub reply: Sender<Outcome>,
    pub peer_addr: String,
}

/// Handles a single client connection
///
/// The connection never touches server state itself. It frames bytes,
/// forwards each decoded command to the dispatch loop and waits for the
/// outcome before reading the next one.
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Queue into the dispatch loop
    requests: Sender<Request>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub fn new(stream: TcpStream, requests: Sender<Request>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            requests,
            peer_addr,
        })
    }

    /// Configure the write timeout (0 = none)
    pub fn set_write_timeout(&mut self, write_ms: u64) -> Result<()> {
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns when the client disconnects, the server exits, or the client
    /// breaks the protocol. A protocol error closes only this connection.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(TnraError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e @ TnraError::Protocol(_)) => {
                    tracing::warn!("Closing {} after protocol error: {}", self.peer_addr, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

            let outcome = self.forward(command)?;

            let response = match outcome {
                Outcome::Reply(response) => response,
                Outcome::Exit => {
                    tracing::debug!("Exit requested by {}", self.peer_addr);
                    return Ok(());
                }
            };

            if let Err(e) = self.send_response(&response) {
                // Client went away before the response could be delivered
                if let TnraError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) || io_err.kind() == ErrorKind::BrokenPipe {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Hand a command to the dispatch loop and wait for its outcome
    fn forward(&self, command: Command) -> Result<Outcome> {
        let (reply_tx, reply_rx) = bounded(1);

        self.requests
            .send(Request {
                command,
                reply: reply_tx,
                peer_addr: self.peer_addr.clone(),
            })
            .map_err(|_| TnraError::Network("dispatch loop has stopped".to_string()))?;

        reply_rx
            .recv()
            .map_err(|_| TnraError::Network("dispatch loop dropped the request".to_string()))
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}
