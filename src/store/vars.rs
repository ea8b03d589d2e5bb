//! Variable store
//!
//! Plain key/value table persisted as one JSON object.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde_json::Value;

use crate::error::{Result, TnraError};
use crate::payload::{Payload, MAX_NESTING_DEPTH};

/// Last-write-wins table of named values
#[derive(Debug, Default)]
pub struct VarStore {
    vars: BTreeMap<String, Payload>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.vars.get(key)
    }

    /// Insert or overwrite a value, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: Payload) -> Option<Payload> {
        self.vars.insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Write the whole table as a pretty-printed JSON object
    ///
    /// Fails before touching `path` if a value is nested too deeply to be
    /// loaded back.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(key) = too_deep(&self.vars) {
            return Err(TnraError::InvalidDocument(format!(
                "variable '{}' is nested deeper than {} levels",
                key, MAX_NESTING_DEPTH
            )));
        }

        let document = Value::from(Payload::Map(self.vars.clone()));

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Replace the whole table with the JSON object stored at `path`
    ///
    /// The table is untouched if the file cannot be read or is not an object.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(path)?);
        let document: Value = serde_json::from_reader(reader)?;

        match Payload::from(document) {
            Payload::Map(vars) => {
                if let Some(key) = too_deep(&vars) {
                    return Err(TnraError::InvalidDocument(format!(
                        "{}: variable '{}' is nested deeper than {} levels",
                        path.display(),
                        key,
                        MAX_NESTING_DEPTH
                    )));
                }
                self.vars = vars;
                Ok(())
            }
            other => Err(TnraError::InvalidDocument(format!(
                "{}: expected a JSON object, got {}",
                path.display(),
                other
            ))),
        }
    }
}

fn too_deep(vars: &BTreeMap<String, Payload>) -> Option<&str> {
    vars.iter()
        .find(|(_, value)| value.depth() > MAX_NESTING_DEPTH)
        .map(|(key, _)| key.as_str())
}
