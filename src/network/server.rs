//! TCP Server
//!
//! Accepts connections and serializes their commands through one dispatcher.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::connection::{Connection, Request};
use crate::config::Config;
use crate::dispatcher::{Dispatcher, Outcome};
use crate::error::{Result, TnraError};

/// How often the acceptor and the dispatch loop re-check the shutdown flag
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Open client sockets, so shutdown can unblock their reader threads
type ConnectionRegistry = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// Handle for stopping a running server from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop after the command in flight
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server for TNRA
///
/// ## Threads
/// - one acceptor thread
/// - one reader thread per client connection
/// - the dispatch loop, on the thread that calls `run`
///
/// Readers forward decoded commands over a channel; the dispatch loop
/// executes them one at a time, in arrival order.
pub struct Server {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    connections: ConnectionRegistry,
}

impl Server {
    /// Bind the listen address from the config
    pub fn bind(config: Config) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            TnraError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
            connections: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Serve until an EXIT command arrives or the shutdown handle fires
    pub fn run(self) -> Result<()> {
        let Server {
            config,
            listener,
            local_addr,
            shutdown,
            connections,
        } = self;

        listener.set_nonblocking(true)?;
        tracing::info!(
            "Listening on {} (queue discipline: {})",
            local_addr,
            config.queue_discipline
        );

        let (requests_tx, requests_rx) = unbounded();

        let acceptor = {
            let shutdown = Arc::clone(&shutdown);
            let connections = Arc::clone(&connections);
            let config = config.clone();
            thread::Builder::new()
                .name("tnra-acceptor".to_string())
                .spawn(move || accept_loop(listener, requests_tx, shutdown, connections, config))?
        };

        let mut dispatcher = Dispatcher::new(&config);
        dispatch_loop(&mut dispatcher, &requests_rx, &shutdown);

        // Stop accepting, then unblock every reader still waiting on a socket
        shutdown.store(true, Ordering::SeqCst);
        acceptor
            .join()
            .map_err(|_| TnraError::Network("acceptor thread panicked".to_string()))?;

        let mut open = connections.lock();
        for (_, stream) in open.drain() {
            let _ = stream.shutdown(Shutdown::Both);
        }

        tracing::info!("Server on {} terminated", local_addr);
        Ok(())
    }
}

/// LISTENING → DISPATCHING → LISTENING … → TERMINATED
fn dispatch_loop(dispatcher: &mut Dispatcher, requests: &Receiver<Request>, shutdown: &AtomicBool) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            tracing::info!("Shutdown requested");
            dispatcher.shutdown();
            return;
        }

        let request = match requests.recv_timeout(POLL_INTERVAL) {
            Ok(request) => request,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("Acceptor stopped unexpectedly");
                dispatcher.shutdown();
                return;
            }
        };

        tracing::trace!("Dispatching {:?} from {}", request.command, request.peer_addr);
        let outcome = dispatcher.dispatch(request.command);
        let exit = outcome == Outcome::Exit;

        // The connection may already be gone; its client will never see a reply
        let _ = request.reply.send(outcome);

        if exit {
            tracing::info!("Exit requested by {}", request.peer_addr);
            return;
        }
    }
}

fn accept_loop(
    listener: TcpListener,
    requests: Sender<Request>,
    shutdown: Arc<AtomicBool>,
    connections: ConnectionRegistry,
    config: Config,
) {
    let mut next_id: u64 = 0;

    while !shutdown.load(Ordering::SeqCst) {
        let (stream, addr) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            Err(e) => {
                tracing::warn!("Accept failed: {}", e);
                thread::sleep(POLL_INTERVAL);
                continue;
            }
        };

        if connections.lock().len() >= config.max_connections {
            tracing::warn!(
                "Refusing {}: {} connections already open",
                addr,
                config.max_connections
            );
            continue;
        }

        if let Err(e) = register(&stream, next_id, &connections) {
            tracing::warn!("Dropping {}: {}", addr, e);
            continue;
        }

        let id = next_id;
        next_id += 1;

        let requests = requests.clone();
        let connections_for_thread = Arc::clone(&connections);
        let write_timeout_ms = config.write_timeout_ms;

        let spawned = thread::Builder::new()
            .name(format!("tnra-conn-{}", id))
            .spawn(move || {
                let result = Connection::new(stream, requests).and_then(|mut connection| {
                    connection.set_write_timeout(write_timeout_ms)?;
                    connection.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Connection {} closed with error: {}", addr, e);
                }
                connections_for_thread.lock().remove(&id);
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn handler for {}: {}", addr, e);
            connections.lock().remove(&id);
        }
    }
}

/// Make the accepted socket blocking and remember a handle to it
fn register(stream: &TcpStream, id: u64, connections: &ConnectionRegistry) -> Result<()> {
    // Some platforms let accepted sockets inherit the listener's non-blocking flag
    stream.set_nonblocking(false)?;
    let handle = stream.try_clone()?;
    connections.lock().insert(id, handle);
    Ok(())
}
