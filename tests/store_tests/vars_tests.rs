//! Tests for VarStore
//!
//! These tests verify:
//! - Last write wins
//! - Save/load round trip
//! - Load replaces instead of merging
//! - Non-object documents are rejected

use std::fs;

use serde_json::json;
use tempfile::TempDir;
use tnra::payload::{Payload, MAX_NESTING_DEPTH};
use tnra::store::VarStore;
use tnra::TnraError;

/// `levels` nested one-element sequences around a string
fn nested(levels: usize) -> Payload {
    let mut payload = Payload::from("walk");
    for _ in 0..levels {
        payload = Payload::Seq(vec![payload]);
    }
    payload
}

#[test]
fn test_set_get() {
    let mut vars = VarStore::new();
    vars.set("mode", Payload::from("walk"));

    assert_eq!(vars.get("mode"), Some(&Payload::from("walk")));
    assert_eq!(vars.get("missing"), None);
}

#[test]
fn test_overwrite_last_write_wins() {
    let mut vars = VarStore::new();
    assert_eq!(vars.set("n", Payload::Int(1)), None);
    assert_eq!(vars.set("n", Payload::Int(2)), Some(Payload::Int(1)));

    assert_eq!(vars.get("n"), Some(&Payload::Int(2)));
    assert_eq!(vars.len(), 1);
}

#[test]
fn test_save_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v.json");

    let mut vars = VarStore::new();
    vars.set("mode", Payload::from("walk"));
    vars.set("scenario", Payload::Int(17));
    vars.set("bbox", Payload::from(json!([-71.19, 42.22, -70.74, 42.40])));
    vars.set("meta", Payload::from(json!({"city": "boston", "done": false})));
    vars.save(&path).unwrap();

    let mut restored = VarStore::new();
    restored.load(&path).unwrap();

    assert_eq!(restored.len(), 4);
    for key in vars.keys() {
        assert_eq!(restored.get(key), vars.get(key));
    }
}

#[test]
fn test_saved_file_is_one_json_object() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v.json");

    let mut vars = VarStore::new();
    vars.set("mode", Payload::from("walk"));
    vars.save(&path).unwrap();

    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document, json!({"mode": "walk"}));
}

#[test]
fn test_load_replaces_existing_vars() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v.json");
    fs::write(&path, r#"{"a": 1}"#).unwrap();

    let mut vars = VarStore::new();
    vars.set("b", Payload::Int(2));
    vars.load(&path).unwrap();

    assert_eq!(vars.get("a"), Some(&Payload::Int(1)));
    assert_eq!(vars.get("b"), None);
}

#[test]
fn test_load_rejects_non_object() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v.json");
    fs::write(&path, "[1, 2, 3]").unwrap();

    let mut vars = VarStore::new();
    vars.set("keep", Payload::Bool(true));

    let err = vars.load(&path).unwrap_err();
    assert!(err.to_string().contains("expected a JSON object"));
    assert_eq!(vars.get("keep"), Some(&Payload::Bool(true)));
}

#[test]
fn test_load_invalid_json() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v.json");
    fs::write(&path, "{ broken").unwrap();

    let mut vars = VarStore::new();
    assert!(vars.load(&path).is_err());
    assert!(vars.is_empty());
}

#[test]
fn test_save_load_roundtrip_at_nesting_limit() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v.json");

    let mut vars = VarStore::new();
    vars.set("deep", nested(MAX_NESTING_DEPTH));
    vars.save(&path).unwrap();

    let mut restored = VarStore::new();
    restored.load(&path).unwrap();
    assert_eq!(restored.get("deep"), Some(&nested(MAX_NESTING_DEPTH)));
}

#[test]
fn test_save_rejects_values_past_nesting_limit() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v.json");

    let mut vars = VarStore::new();
    vars.set("deep", nested(MAX_NESTING_DEPTH + 1));

    let result = vars.save(&path);
    assert!(matches!(result, Err(TnraError::InvalidDocument(_))));
    assert!(!path.exists());
}

#[test]
fn test_load_rejects_values_past_nesting_limit() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("v.json");
    let levels = MAX_NESTING_DEPTH + 1;
    fs::write(
        &path,
        format!("{{\"deep\": {}1{}}}", "[".repeat(levels), "]".repeat(levels)),
    )
    .unwrap();

    let mut vars = VarStore::new();
    vars.set("keep", Payload::Bool(true));

    assert!(vars.load(&path).is_err());
    assert_eq!(vars.get("keep"), Some(&Payload::Bool(true)));
}
