//! Tests for Sink
//!
//! These tests verify:
//! - One JSON record per line
//! - Write/append modes
//! - Reopening closes the previous file
//! - Writes and closes without an open file fail cleanly

use std::fs;

use serde_json::{json, Value};
use tempfile::TempDir;
use tnra::payload::Payload;
use tnra::protocol::FileMode;
use tnra::store::Sink;
use tnra::TnraError;

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_write_single_record() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out.log");

    let mut sink = Sink::new();
    sink.open(&path, FileMode::Write).unwrap();
    sink.write_record(&Payload::from(json!({"duration": 120.5}))).unwrap();
    sink.close().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.ends_with('\n'));
    assert_eq!(read_lines(&path), vec![json!({"duration": 120.5})]);
}

#[test]
fn test_records_are_visible_before_close() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out.log");

    let mut sink = Sink::new();
    sink.open(&path, FileMode::Write).unwrap();
    sink.write_record(&Payload::from("first")).unwrap();

    assert_eq!(read_lines(&path), vec![json!("first")]);
}

#[test]
fn test_write_mode_truncates() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out.log");
    fs::write(&path, "old line\n").unwrap();

    let mut sink = Sink::new();
    sink.open(&path, FileMode::Write).unwrap();
    sink.write_record(&Payload::Int(1)).unwrap();
    sink.close().unwrap();

    assert_eq!(read_lines(&path), vec![json!(1)]);
}

#[test]
fn test_append_mode_keeps_existing_lines() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out.log");

    let mut sink = Sink::new();
    sink.open(&path, FileMode::Write).unwrap();
    sink.write_record(&Payload::Int(1)).unwrap();
    sink.close().unwrap();

    sink.open(&path, FileMode::Append).unwrap();
    sink.write_record(&Payload::Int(2)).unwrap();
    sink.close().unwrap();

    assert_eq!(read_lines(&path), vec![json!(1), json!(2)]);
}

#[test]
fn test_reopen_switches_files() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first.log");
    let second = temp.path().join("second.log");

    let mut sink = Sink::new();
    sink.open(&first, FileMode::Write).unwrap();
    sink.write_record(&Payload::from("a")).unwrap();

    sink.open(&second, FileMode::Write).unwrap();
    assert_eq!(sink.path(), Some(second.as_path()));
    sink.write_record(&Payload::from("b")).unwrap();
    sink.close().unwrap();

    assert_eq!(read_lines(&first), vec![json!("a")]);
    assert_eq!(read_lines(&second), vec![json!("b")]);
    assert!(!sink.is_open());
}

#[test]
fn test_write_without_open_fails() {
    let mut sink = Sink::new();
    let result = sink.write_record(&Payload::from("orphan"));
    assert!(matches!(result, Err(TnraError::SinkNotOpen)));
}

#[test]
fn test_close_without_open_fails() {
    let mut sink = Sink::new();
    assert!(matches!(sink.close(), Err(TnraError::SinkNotOpen)));
}

#[test]
fn test_double_close_fails() {
    let temp = TempDir::new().unwrap();
    let mut sink = Sink::new();
    sink.open(&temp.path().join("out.log"), FileMode::Write).unwrap();

    sink.close().unwrap();
    assert!(matches!(sink.close(), Err(TnraError::SinkNotOpen)));
}

#[test]
fn test_open_in_missing_directory_fails() {
    let temp = TempDir::new().unwrap();
    let mut sink = Sink::new();

    let result = sink.open(&temp.path().join("nope").join("out.log"), FileMode::Write);
    assert!(matches!(result, Err(TnraError::Io(_))));
    assert!(!sink.is_open());
}
