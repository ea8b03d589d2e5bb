//! Router
//!
//! Pulls route jobs off the server until it is empty and records results.

use std::fs::OpenOptions;
use std::io::Write;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use super::departure::{departure_time, unix_now};
use super::job::{Coordinate, RouteJob};
use crate::error::{Result, TnraError};
use crate::network::Client;
use crate::payload::Payload;

/// What the routing engine returned for one trip
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Travel time in seconds
    pub duration: f64,

    /// Travel distance in meters
    pub distance: f64,

    /// Raw engine response, stored verbatim in the result record
    pub response: Value,
}

/// The external routing engine
///
/// `Ok(None)` means the engine found no route; errors mean the engine could
/// not be asked.
pub trait DistanceProvider {
    fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: &str,
        departure: u64,
    ) -> Result<Option<Route>>;
}

impl<F> DistanceProvider for F
where
    F: Fn(Coordinate, Coordinate, &str, u64) -> Result<Option<Route>>,
{
    fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: &str,
        departure: u64,
    ) -> Result<Option<Route>> {
        self(origin, destination, mode, departure)
    }
}

/// Per-router job counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Jobs whose result was written to the sink
    pub routed: u64,

    /// Jobs the engine had no route for
    pub unroutable: u64,

    /// Payloads that were not route jobs
    pub invalid: u64,

    /// Jobs the engine or the sink failed on
    pub failed: u64,
}

impl RouterStats {
    pub fn total(&self) -> u64 {
        self.routed + self.unroutable + self.invalid + self.failed
    }
}

impl AddAssign for RouterStats {
    fn add_assign(&mut self, other: Self) {
        self.routed += other.routed;
        self.unroutable += other.unroutable;
        self.invalid += other.invalid;
        self.failed += other.failed;
    }
}

/// One worker: a client connection plus a distance provider
pub struct Router<P> {
    client: Client,
    provider: P,
    route_log: Option<PathBuf>,
}

impl<P: DistanceProvider> Router<P> {
    pub fn new(client: Client, provider: P) -> Self {
        Self {
            client,
            provider,
            route_log: None,
        }
    }

    /// Append an attempt record for every job to a local JSON-lines file
    pub fn with_route_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.route_log = Some(path.into());
        self
    }

    /// Route one job; `Ok(true)` if a result was written
    ///
    /// Engine and sink failures come back as `TnraError::Routing`; anything
    /// else is a problem talking to the server.
    pub fn route(&mut self, job: &RouteJob) -> Result<bool> {
        let departure = departure_time(unix_now(), job.weekday, job.hour).ok_or_else(|| {
            TnraError::Routing(format!(
                "invalid departure weekday {} hour {}",
                job.weekday, job.hour
            ))
        })?;

        let result = self
            .provider
            .distance(job.origin, job.destination, &job.mode, departure)
            .map_err(|e| match e {
                TnraError::Routing(_) => e,
                other => TnraError::Routing(other.to_string()),
            })?;

        let success = match result {
            Some(route) => {
                tracing::debug!(
                    "{}: duration {:.1}s, distance {:.1}m, attributes {}",
                    job.mode,
                    route.duration,
                    route.distance,
                    job.attributes
                );
                let record = json!({
                    "response": route.response,
                    "attributes": job.attributes,
                });
                if self.client.write_to_disk(Payload::from(record))?.is_none() {
                    return Err(TnraError::Routing(
                        "server refused the result record (is an output file open?)".to_string(),
                    ));
                }
                true
            }
            None => {
                tracing::debug!("{}: no route, attributes {}", job.mode, job.attributes);
                false
            }
        };

        if let Some(path) = &self.route_log {
            append_route_log(path, job, departure, success)?;
        }

        Ok(success)
    }

    /// Pop and route jobs until the server reports an empty queue
    pub fn run(&mut self) -> Result<RouterStats> {
        let mut stats = RouterStats::default();

        while let Some(payload) = self.client.queue_pop()? {
            let job = match RouteJob::from_payload(&payload) {
                Ok(job) => job,
                Err(e) => {
                    tracing::warn!("Skipping job {}: {}", payload, e);
                    stats.invalid += 1;
                    continue;
                }
            };

            match self.route(&job) {
                Ok(true) => stats.routed += 1,
                Ok(false) => stats.unroutable += 1,
                Err(TnraError::Routing(reason)) => {
                    tracing::warn!("Routing failed for {:?}: {}", job.attributes, reason);
                    stats.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Queue drained: {} routed, {} without route, {} invalid, {} failed",
            stats.routed,
            stats.unroutable,
            stats.invalid,
            stats.failed
        );
        Ok(stats)
    }

    /// The router's server connection, still usable after `run`
    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }
}

fn append_route_log(path: &Path, job: &RouteJob, departure: u64, success: bool) -> Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    let entry = json!({
        "time": now,
        "success": u8::from(success),
        "origin_x": job.origin.x,
        "origin_y": job.origin.y,
        "dest_x": job.destination.x,
        "dest_y": job.destination.y,
        "departure_time": departure,
        "attributes": job.attributes,
    });

    let mut line = serde_json::to_vec(&entry)?;
    line.push(b'\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&line)?;
    Ok(())
}
