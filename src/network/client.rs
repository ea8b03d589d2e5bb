//! Client stub
//!
//! One method per server command. Every call sends a command, then waits a
//! bounded time for the response.

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::time::Duration;

use crate::config::{Config, DEFAULT_TIMEOUT_MS};
use crate::error::{Result, TnraError};
use crate::payload::Payload;
use crate::protocol::{read_response, write_command, Command, FileMode, Response};

/// Buffered halves of one server connection
struct Channel {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

/// Synchronous client for a TNRA server
///
/// A client is one request/response channel: a second command cannot be
/// sent until the response to the first has been read. After a timeout the
/// connection is dropped and re-established on the next call.
pub struct Client {
    addr: String,
    timeout: Duration,
    channel: Option<Channel>,
    awaiting_reply: bool,
}

impl Client {
    /// Connect with the default 5 s response timeout
    pub fn connect(addr: impl Into<String>) -> Result<Self> {
        Self::with_timeout(addr, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// Connect to the server a config points at, with its client timeout
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_timeout(
            config.listen_addr.clone(),
            Duration::from_millis(config.client_timeout_ms),
        )
    }

    /// Connect with a custom response timeout
    pub fn with_timeout(addr: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut client = Self {
            addr: addr.into(),
            timeout,
            channel: None,
            awaiting_reply: false,
        };
        client.ensure_connected()?;
        Ok(client)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn ensure_connected(&mut self) -> Result<&mut Channel> {
        if self.channel.is_none() {
            let stream = TcpStream::connect(&self.addr).map_err(|e| {
                TnraError::Network(format!("failed to connect to {}: {}", self.addr, e))
            })?;
            stream.set_nodelay(true)?;
            stream.set_read_timeout(Some(self.timeout))?;
            stream.set_write_timeout(Some(self.timeout))?;

            let read_stream = stream.try_clone()?;
            self.channel = Some(Channel {
                reader: BufReader::new(read_stream),
                writer: BufWriter::new(stream),
            });
            self.awaiting_reply = false;
        }

        self.channel
            .as_mut()
            .ok_or_else(|| TnraError::Network("connection unavailable".to_string()))
    }

    /// Forget the current connection; the next call reconnects
    fn reset(&mut self) {
        self.channel = None;
        self.awaiting_reply = false;
    }

    // =========================================================================
    // Raw exchange
    // =========================================================================

    /// Send one command
    ///
    /// Fails if the previous command's response has not been read yet.
    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        if self.awaiting_reply {
            return Err(TnraError::Protocol(
                "cannot send a command while a response is outstanding".to_string(),
            ));
        }

        let channel = self.ensure_connected()?;
        if let Err(e) = write_command(&mut channel.writer, command) {
            self.reset();
            return Err(e);
        }

        self.awaiting_reply = true;
        Ok(())
    }

    /// Wait for the response to the last command
    ///
    /// Returns `TnraError::Timeout` if nothing arrives within the timeout.
    pub fn recv_response(&mut self) -> Result<Response> {
        if !self.awaiting_reply {
            return Err(TnraError::Protocol(
                "no command is waiting for a response".to_string(),
            ));
        }

        let timeout = self.timeout;
        let channel = self.ensure_connected()?;
        match read_response(&mut channel.reader) {
            Ok(response) => {
                self.awaiting_reply = false;
                Ok(response)
            }
            Err(TnraError::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                self.reset();
                Err(TnraError::Timeout(timeout))
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    /// Send a command and wait for its response
    pub fn call(&mut self, command: &Command) -> Result<Response> {
        self.send_command(command)?;
        self.recv_response()
    }

    /// `call`, reduced to the body of an OK response (`true` if it has none)
    fn call_parsed(&mut self, command: Command) -> Result<Option<Payload>> {
        Ok(self.call(&command)?.parse_body())
    }

    // =========================================================================
    // 1x: control
    // =========================================================================

    /// Stop the server; no response is expected
    pub fn exit(&mut self) -> Result<bool> {
        self.send_command(&Command::Exit)?;
        self.reset();
        Ok(true)
    }

    pub fn echo(&mut self, message: impl Into<Payload>) -> Result<Option<Payload>> {
        self.call_parsed(Command::Echo {
            message: message.into(),
        })
    }

    pub fn ping(&mut self) -> Result<Option<Payload>> {
        self.call_parsed(Command::Ping)
    }

    // =========================================================================
    // 2x: queue
    // =========================================================================

    /// Enqueue an arbitrary job
    pub fn enqueue(&mut self, job: impl Into<Payload>) -> Result<Option<Payload>> {
        self.call_parsed(Command::Enqueue { job: job.into() })
    }

    /// Enqueue a job shaped as positional and keyword arguments: `[args, kwargs]`
    pub fn enqueue_call(
        &mut self,
        args: Vec<Payload>,
        kwargs: BTreeMap<String, Payload>,
    ) -> Result<Option<Payload>> {
        self.enqueue(Payload::Seq(vec![Payload::Seq(args), Payload::Map(kwargs)]))
    }

    /// Next job, or `None` once the queue is empty
    pub fn queue_pop(&mut self) -> Result<Option<Payload>> {
        self.call_parsed(Command::QueuePop)
    }

    pub fn queue_size(&mut self) -> Result<Option<usize>> {
        Ok(self
            .call_parsed(Command::QueueSize)?
            .and_then(|body| body.as_u64())
            .map(|size| size as usize))
    }

    pub fn queue_flush(&mut self) -> Result<Option<Payload>> {
        self.call_parsed(Command::QueueFlush)
    }

    // =========================================================================
    // 3x: files
    // =========================================================================

    pub fn open_file(&mut self, filename: impl Into<String>, mode: FileMode) -> Result<Option<Payload>> {
        self.call_parsed(Command::OpenFile {
            filename: filename.into(),
            mode,
        })
    }

    pub fn close_file(&mut self) -> Result<Option<Payload>> {
        self.call_parsed(Command::CloseFile)
    }

    /// Append a record to the server's open output file
    pub fn write_to_disk(&mut self, record: impl Into<Payload>) -> Result<Option<Payload>> {
        self.call_parsed(Command::WriteToDisk {
            record: record.into(),
        })
    }

    pub fn save_queue(&mut self, filename: impl Into<String>) -> Result<Option<Payload>> {
        self.call_parsed(Command::SaveQueue {
            filename: filename.into(),
        })
    }

    pub fn load_queue(&mut self, filename: impl Into<String>) -> Result<Option<Payload>> {
        self.call_parsed(Command::LoadQueue {
            filename: filename.into(),
        })
    }

    // =========================================================================
    // 4x: variables
    // =========================================================================

    /// Value of `key`; `Some(Payload::Null)` if it was never set
    pub fn get_var(&mut self, key: impl Into<String>) -> Result<Option<Payload>> {
        self.call_parsed(Command::GetVar { key: key.into() })
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<Payload>) -> Result<Option<Payload>> {
        self.call_parsed(Command::SetVar {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn save_vars(&mut self, filename: impl Into<String>) -> Result<Option<Payload>> {
        self.call_parsed(Command::SaveVars {
            filename: filename.into(),
        })
    }

    pub fn load_vars(&mut self, filename: impl Into<String>) -> Result<Option<Payload>> {
        self.call_parsed(Command::LoadVars {
            filename: filename.into(),
        })
    }
}
