//! Payload Module
//!
//! The generic structured value carried in command and response bodies.
//!
//! The server never interprets job payloads; it only moves them between the
//! wire (bincode, tag-preserving) and files (one JSON document per line or
//! per file).

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, DeserializeSeed, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::{Result, TnraError};

/// Deepest allowed nesting of sequences and maps
///
/// Kept well under serde_json's recursion limit so anything accepted on the
/// wire can also be saved and loaded back.
pub const MAX_NESTING_DEPTH: usize = 64;

/// A structured value: null, bool, number, string, sequence or string-keyed map
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum Payload {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Payload>),
    Map(BTreeMap<String, Payload>),
}

impl Payload {
    /// Build a map payload from key/value pairs
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Payload>,
        I: IntoIterator<Item = (K, V)>,
    {
        Payload::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Payload::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Payload::Int(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        }
    }

    /// Numeric value as f64 (integers are widened)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Payload::Int(i) => Some(*i as f64),
            Payload::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Payload]> {
        match self {
            Payload::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Payload>> {
        match self {
            Payload::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key if this payload is a map
    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Remove and return a key if this payload is a map
    pub fn take(&mut self, key: &str) -> Option<Payload> {
        match self {
            Payload::Map(map) => map.remove(key),
            _ => None,
        }
    }

    /// Number of nested sequence/map levels (0 for scalars)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 0usize)];

        while let Some((value, level)) = pending.pop() {
            match value {
                Payload::Seq(items) => {
                    deepest = deepest.max(level + 1);
                    pending.extend(items.iter().map(|item| (item, level + 1)));
                }
                Payload::Map(map) => {
                    deepest = deepest.max(level + 1);
                    pending.extend(map.values().map(|item| (item, level + 1)));
                }
                _ => {}
            }
        }

        deepest
    }

    /// Fail with `InvalidDocument` if nested deeper than `MAX_NESTING_DEPTH`
    pub fn check_depth(&self) -> Result<()> {
        let depth = self.depth();
        if depth > MAX_NESTING_DEPTH {
            return Err(TnraError::InvalidDocument(format!(
                "payload nested {} levels deep (max {})",
                depth, MAX_NESTING_DEPTH
            )));
        }
        Ok(())
    }

    // =========================================================================
    // JSON text form
    // =========================================================================

    /// Serialize as a single-line JSON document
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&Value::from(self.clone()))?)
    }

    /// Parse a JSON document no deeper than `MAX_NESTING_DEPTH`
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let payload = Payload::from(value);
        payload.check_depth()?;
        Ok(payload)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&Value::from(self.clone())) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

// =============================================================================
// Depth-limited deserialization
// =============================================================================

#[derive(Deserialize)]
enum Tag {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Seq,
    Map,
}

const VARIANTS: &[&str] = &["Null", "Bool", "Int", "Float", "Str", "Seq", "Map"];

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        PayloadSeed { depth: 0 }.deserialize(deserializer)
    }
}

/// A payload found inside `depth` enclosing sequences/maps
#[derive(Clone, Copy)]
struct PayloadSeed {
    depth: usize,
}

impl PayloadSeed {
    fn nested<E: de::Error>(self) -> std::result::Result<Self, E> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(E::custom(format!(
                "payload nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        Ok(PayloadSeed {
            depth: self.depth + 1,
        })
    }
}

impl<'de> DeserializeSeed<'de> for PayloadSeed {
    type Value = Payload;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Payload, D::Error> {
        deserializer.deserialize_enum("Payload", VARIANTS, self)
    }
}

impl<'de> Visitor<'de> for PayloadSeed {
    type Value = Payload;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a payload")
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> std::result::Result<Payload, A::Error> {
        let (tag, variant) = data.variant::<Tag>()?;
        match tag {
            Tag::Null => variant.unit_variant().map(|_| Payload::Null),
            Tag::Bool => variant.newtype_variant().map(Payload::Bool),
            Tag::Int => variant.newtype_variant().map(Payload::Int),
            Tag::Float => variant.newtype_variant().map(Payload::Float),
            Tag::Str => variant.newtype_variant().map(Payload::Str),
            Tag::Seq => variant
                .newtype_variant_seed(SeqSeed(self.nested::<A::Error>()?))
                .map(Payload::Seq),
            Tag::Map => variant
                .newtype_variant_seed(MapSeed(self.nested::<A::Error>()?))
                .map(Payload::Map),
        }
    }
}

/// Elements of a sequence, each one level deeper
struct SeqSeed(PayloadSeed);

impl<'de> DeserializeSeed<'de> for SeqSeed {
    type Value = Vec<Payload>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for SeqSeed {
    type Value = Vec<Payload>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence of payloads")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        // Length prefixes are untrusted
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element_seed(self.0)? {
            items.push(item);
        }
        Ok(items)
    }
}

/// Values of a map, each one level deeper
struct MapSeed(PayloadSeed);

impl<'de> DeserializeSeed<'de> for MapSeed {
    type Value = BTreeMap<String, Payload>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for MapSeed {
    type Value = BTreeMap<String, Payload>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of payloads")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((key, value)) = map.next_entry_seed(PhantomData::<String>, self.0)? {
            entries.insert(key, value);
        }
        Ok(entries)
    }
}

// =============================================================================
// JSON conversions
// =============================================================================

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Payload::Int(i)
                } else {
                    // u64 beyond i64::MAX and all non-integers
                    Payload::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Payload::Str(s),
            Value::Array(items) => Payload::Seq(items.into_iter().map(Payload::from).collect()),
            Value::Object(map) => {
                Payload::Map(map.into_iter().map(|(k, v)| (k, Payload::from(v))).collect())
            }
        }
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Null => Value::Null,
            Payload::Bool(b) => Value::Bool(b),
            Payload::Int(i) => Value::Number(Number::from(i)),
            // JSON has no NaN/inf
            Payload::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            Payload::Str(s) => Value::String(s),
            Payload::Seq(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Payload::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// =============================================================================
// Scalar conversions
// =============================================================================

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Bool(b)
    }
}

impl From<i64> for Payload {
    fn from(i: i64) -> Self {
        Payload::Int(i)
    }
}

impl From<i32> for Payload {
    fn from(i: i32) -> Self {
        Payload::Int(i64::from(i))
    }
}

impl From<u32> for Payload {
    fn from(i: u32) -> Self {
        Payload::Int(i64::from(i))
    }
}

impl From<usize> for Payload {
    fn from(i: usize) -> Self {
        i64::try_from(i)
            .map(Payload::Int)
            .unwrap_or(Payload::Float(i as f64))
    }
}

impl From<f64> for Payload {
    fn from(f: f64) -> Self {
        Payload::Float(f)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Str(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Str(s)
    }
}

impl<T: Into<Payload>> From<Vec<T>> for Payload {
    fn from(items: Vec<T>) -> Self {
        Payload::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Payload::Null)
    }
}

impl From<BTreeMap<String, Payload>> for Payload {
    fn from(map: BTreeMap<String, Payload>) -> Self {
        Payload::Map(map)
    }
}
