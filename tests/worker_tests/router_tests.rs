//! Tests for the worker side
//!
//! These tests verify:
//! - Route job encoding (map and positional/keyword shapes)
//! - Departure time computation
//! - A router drains the queue and writes `{response, attributes}` records
//! - Unroutable, invalid and failed jobs are counted, not fatal
//! - A worker pool drains one queue from several connections

use std::fs;
use std::path::Path;
use std::thread::{self, JoinHandle};

use serde_json::{json, Value};
use tempfile::TempDir;
use tnra::config::Config;
use tnra::network::{Client, Server};
use tnra::payload::Payload;
use tnra::protocol::FileMode;
use tnra::worker::departure::{departure_time, iso_weekday, next_weekday};
use tnra::worker::{
    Coordinate, DistanceProvider, Route, RouteJob, Router, RouterStats, WorkerPool,
};
use tnra::{Result, TnraError};

// =============================================================================
// Helper Functions
// =============================================================================

/// Monday 2024-01-01 00:00:00 UTC
const MONDAY: u64 = 1_704_067_200;
const DAY: u64 = 86_400;

/// Engine stand-in: "none" has no route, "broken" fails, anything else routes
struct FakeEngine;

impl DistanceProvider for FakeEngine {
    fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: &str,
        departure: u64,
    ) -> Result<Option<Route>> {
        match mode {
            "none" => Ok(None),
            "broken" => Err(TnraError::Network("engine unreachable".to_string())),
            _ => {
                let distance = ((destination.x - origin.x).powi(2)
                    + (destination.y - origin.y).powi(2))
                .sqrt()
                    * 111_000.0;
                Ok(Some(Route {
                    duration: distance / 10.0,
                    distance,
                    response: json!({"mode": mode, "departure": departure}),
                }))
            }
        }
    }
}

struct TestServer {
    config: Config,
    handle: JoinHandle<Result<()>>,
}

fn start_server(work_dir: &Path) -> TestServer {
    let server = Server::bind(
        Config::builder()
            .listen_addr("127.0.0.1:0")
            .work_dir(work_dir)
            .build(),
    )
    .unwrap();
    let config = Config::builder()
        .listen_addr(server.local_addr().to_string())
        .build();
    let handle = thread::spawn(move || server.run());
    TestServer { config, handle }
}

fn stop(server: TestServer) {
    Client::from_config(&server.config).unwrap().exit().unwrap();
    server.handle.join().unwrap().unwrap();
}

fn job(n: usize, mode: &str) -> RouteJob {
    RouteJob::new(
        Coordinate::new(-71.089824, 42.337874),
        Coordinate::new(-71.116708 + n as f64 / 1000.0, 42.372779),
    )
    .with_mode(mode)
    .with_attributes(json!({"id": n}))
}

fn read_records(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// =============================================================================
// Route Job Tests
// =============================================================================

#[test]
fn test_route_job_payload_roundtrip() {
    let original = job(3, "walk").with_departure(5, 8);
    let payload = original.to_payload().unwrap();

    assert_eq!(payload.get("mode"), Some(&Payload::from("walk")));
    assert_eq!(RouteJob::from_payload(&payload).unwrap(), original);
}

#[test]
fn test_route_job_defaults() {
    let payload = Payload::from(json!({
        "origin": {"x": 1.0, "y": 2.0},
        "destination": {"x": 3, "y": 4}
    }));
    let decoded = RouteJob::from_payload(&payload).unwrap();

    assert_eq!(decoded.destination, Coordinate::new(3.0, 4.0));
    assert_eq!(decoded.mode, "transit");
    assert_eq!(decoded.weekday, 3);
    assert_eq!(decoded.hour, 11);
    assert_eq!(decoded.attributes, Value::Null);
}

#[test]
fn test_route_job_from_call_shape() {
    let payload = Payload::from(json!([
        [-71.089824, 42.337874, -71.116708, 42.372779],
        {"mode": "transit", "attributes": {"start_name": "northeastern university"}}
    ]));
    let decoded = RouteJob::from_payload(&payload).unwrap();

    assert_eq!(decoded.origin, Coordinate::new(-71.089824, 42.337874));
    assert_eq!(decoded.destination, Coordinate::new(-71.116708, 42.372779));
    assert_eq!(decoded.attributes["start_name"], json!("northeastern university"));
}

#[test]
fn test_route_job_rejects_wrong_shape() {
    assert!(RouteJob::from_payload(&Payload::from("not a job")).is_err());
    assert!(RouteJob::from_payload(&Payload::from(json!([[1.0, 2.0], {}]))).is_err());
}

// =============================================================================
// Departure Tests
// =============================================================================

#[test]
fn test_iso_weekday() {
    assert_eq!(iso_weekday(0), 4); // 1970-01-01, Thursday
    assert_eq!(iso_weekday(MONDAY), 1);
    assert_eq!(iso_weekday(MONDAY + 6 * DAY + 3600), 7);
}

#[test]
fn test_next_weekday() {
    assert_eq!(next_weekday(MONDAY + 5000, 1), Some(MONDAY));
    assert_eq!(next_weekday(MONDAY + 5000, 3), Some(MONDAY + 2 * DAY));
    assert_eq!(next_weekday(MONDAY, 7), Some(MONDAY + 6 * DAY));
    // Sunday → next Monday wraps the week
    assert_eq!(next_weekday(MONDAY + 6 * DAY, 1), Some(MONDAY + 7 * DAY));
    assert_eq!(next_weekday(MONDAY, 0), None);
    assert_eq!(next_weekday(MONDAY, 8), None);
}

#[test]
fn test_departure_time() {
    assert_eq!(departure_time(MONDAY, 3, 11), Some(MONDAY + 2 * DAY + 11 * 3600));
    assert_eq!(departure_time(MONDAY, 3, 24), None);
}

// =============================================================================
// Router Tests
// =============================================================================

#[test]
fn test_router_drains_queue_and_writes_records() {
    let temp = TempDir::new().unwrap();
    let server = start_server(temp.path());

    let mut producer = Client::from_config(&server.config).unwrap();
    producer.open_file("routes.json", FileMode::Write).unwrap();
    for n in 0..4 {
        producer.enqueue(job(n, "transit").to_payload().unwrap()).unwrap();
    }
    producer.enqueue(job(4, "none").to_payload().unwrap()).unwrap();
    producer.enqueue("garbage").unwrap();

    let log_path = temp.path().join("routing_logs.json");
    let client = Client::from_config(&server.config).unwrap();
    let mut router = Router::new(client, FakeEngine).with_route_log(&log_path);
    let stats = router.run().unwrap();

    assert_eq!(
        stats,
        RouterStats { routed: 4, unroutable: 1, invalid: 1, failed: 0 }
    );
    // The router's own connection stays usable after draining
    assert_eq!(router.client().queue_size().unwrap(), Some(0));
    assert!(router.client().close_file().unwrap().is_some());

    let records = read_records(&temp.path().join("routes.json"));
    assert_eq!(records.len(), 4);
    for record in &records {
        assert_eq!(record["response"]["mode"], json!("transit"));
        assert!(record["attributes"]["id"].is_u64());
    }

    // Attempt log covers routed and unroutable jobs, not the garbage payload
    let attempts = read_records(&log_path);
    assert_eq!(attempts.len(), 5);
    let failures: Vec<&Value> = attempts.iter().filter(|a| a["success"] == json!(0)).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["attributes"]["id"], json!(4));
    assert!(attempts[0]["departure_time"].is_u64());

    stop(server);
}

#[test]
fn test_router_counts_engine_failures() {
    let temp = TempDir::new().unwrap();
    let server = start_server(temp.path());

    let mut producer = Client::from_config(&server.config).unwrap();
    producer.open_file("routes.json", FileMode::Write).unwrap();
    producer.enqueue(job(0, "broken").to_payload().unwrap()).unwrap();
    producer.enqueue(job(1, "walk").to_payload().unwrap()).unwrap();

    let client = Client::from_config(&server.config).unwrap();
    let stats = Router::new(client, FakeEngine).run().unwrap();

    assert_eq!(stats.routed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total(), 2);

    stop(server);
}

#[test]
fn test_router_without_open_sink_counts_failures() {
    let temp = TempDir::new().unwrap();
    let server = start_server(temp.path());

    let mut producer = Client::from_config(&server.config).unwrap();
    producer.enqueue(job(0, "walk").to_payload().unwrap()).unwrap();

    let client = Client::from_config(&server.config).unwrap();
    let stats = Router::new(client, FakeEngine).run().unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.routed, 0);

    // The server is unaffected
    assert!(producer.ping().unwrap().is_some());

    stop(server);
}

#[test]
fn test_router_on_empty_queue() {
    let temp = TempDir::new().unwrap();
    let server = start_server(temp.path());

    let client = Client::from_config(&server.config).unwrap();
    let stats = Router::new(client, FakeEngine).run().unwrap();
    assert_eq!(stats, RouterStats::default());

    stop(server);
}

// =============================================================================
// Worker Pool Tests
// =============================================================================

#[test]
fn test_pool_drains_queue_from_many_connections() {
    let temp = TempDir::new().unwrap();
    let server = start_server(temp.path());

    let mut producer = Client::from_config(&server.config).unwrap();
    producer.open_file("routes.json", FileMode::Write).unwrap();
    for n in 0..30 {
        producer.enqueue(job(n, "transit").to_payload().unwrap()).unwrap();
    }

    let stats = WorkerPool::new(server.config.clone())
        .threads(3)
        .run(|_index| FakeEngine)
        .unwrap();

    assert_eq!(stats.routed, 30);
    assert_eq!(stats.total(), 30);

    producer.close_file().unwrap();
    let mut ids: Vec<u64> = read_records(&temp.path().join("routes.json"))
        .iter()
        .map(|record| record["attributes"]["id"].as_u64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..30).collect::<Vec<u64>>());

    stop(server);
}

#[test]
fn test_pool_reports_unreachable_server() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let config = Config::builder().listen_addr(addr).build();
    let result = WorkerPool::new(config).threads(2).run(|_| FakeEngine);

    assert!(matches!(result, Err(TnraError::Network(_))));
}
