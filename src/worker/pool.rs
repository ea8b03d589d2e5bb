//! Worker pool
//!
//! Runs several routers against one server, each on its own connection.

use std::path::PathBuf;
use std::thread;

use super::router::{DistanceProvider, Router, RouterStats};
use crate::config::Config;
use crate::error::{Result, TnraError};
use crate::network::Client;

/// N routers draining the same queue
pub struct WorkerPool {
    config: Config,
    threads: usize,
    route_log: Option<PathBuf>,
}

impl WorkerPool {
    /// One router per available CPU, talking to `config.listen_addr`
    pub fn new(config: Config) -> Self {
        let threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            config,
            threads,
            route_log: None,
        }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn route_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.route_log = Some(path.into());
        self
    }

    /// Run every router until the queue is empty and sum their stats
    ///
    /// `factory` builds the provider for router `i` on that router's thread.
    /// If any router fails, the first error is returned once all have stopped.
    pub fn run<P, F>(&self, factory: F) -> Result<RouterStats>
    where
        P: DistanceProvider,
        F: Fn(usize) -> P + Sync,
    {
        let factory = &factory;

        let results: Vec<Result<RouterStats>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.threads)
                .map(|index| {
                    scope.spawn(move || {
                        let client = Client::from_config(&self.config)?;
                        let mut router = Router::new(client, factory(index));
                        if let Some(path) = &self.route_log {
                            router = router.with_route_log(path.clone());
                        }
                        tracing::debug!("Router {} started", index);
                        router.run()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(TnraError::Routing("router thread panicked".to_string())))
                })
                .collect()
        });

        let mut total = RouterStats::default();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(stats) => total += stats,
                Err(e) => {
                    tracing::warn!("Router stopped with error: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}
