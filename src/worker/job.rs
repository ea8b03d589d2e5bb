//! Route jobs
//!
//! The job shape workers understand. The server never looks inside it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::departure::{DEPARTURE_HOUR, DEPARTURE_WEEKDAY};
use crate::error::{Result, TnraError};
use crate::payload::Payload;

/// A point as (longitude, latitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One origin/destination pair to route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteJob {
    pub origin: Coordinate,
    pub destination: Coordinate,

    /// Routing mode understood by the distance provider
    #[serde(default = "default_mode")]
    pub mode: String,

    /// ISO weekday of departure (1 = Monday … 7 = Sunday)
    #[serde(default = "default_weekday")]
    pub weekday: u8,

    /// Hour of departure (UTC)
    #[serde(default = "default_hour")]
    pub hour: u8,

    /// Caller metadata copied into the result record
    #[serde(default)]
    pub attributes: Value,
}

fn default_mode() -> String {
    "transit".to_string()
}

fn default_weekday() -> u8 {
    DEPARTURE_WEEKDAY
}

fn default_hour() -> u8 {
    DEPARTURE_HOUR
}

impl RouteJob {
    pub fn new(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            origin,
            destination,
            mode: default_mode(),
            weekday: default_weekday(),
            hour: default_hour(),
            attributes: Value::Null,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn with_departure(mut self, weekday: u8, hour: u8) -> Self {
        self.weekday = weekday;
        self.hour = hour;
        self
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = attributes;
        self
    }

    /// Encode as a queue payload
    pub fn to_payload(&self) -> Result<Payload> {
        Ok(Payload::from(serde_json::to_value(self)?))
    }

    /// Decode a queue payload
    ///
    /// Accepts the map produced by `to_payload` as well as the call shape
    /// `[[origin_x, origin_y, dest_x, dest_y], {mode, attributes, ...}]`.
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        if let Some([Payload::Seq(args), Payload::Map(kwargs)]) = payload.as_seq() {
            return Self::from_call(args, kwargs);
        }

        Ok(serde_json::from_value(Value::from(payload.clone()))?)
    }

    fn from_call(
        args: &[Payload],
        kwargs: &std::collections::BTreeMap<String, Payload>,
    ) -> Result<Self> {
        let coords: Vec<f64> = args.iter().filter_map(Payload::as_f64).collect();
        if args.len() != 4 || coords.len() != 4 {
            return Err(TnraError::InvalidDocument(format!(
                "route job needs 4 numeric positional arguments, got {}",
                Payload::Seq(args.to_vec())
            )));
        }

        let mut job = Self::new(
            Coordinate::new(coords[0], coords[1]),
            Coordinate::new(coords[2], coords[3]),
        );

        if let Some(mode) = kwargs.get("mode").and_then(Payload::as_str) {
            job.mode = mode.to_string();
        }
        if let Some(weekday) = kwargs.get("weekday").and_then(Payload::as_u64) {
            job.weekday = u8::try_from(weekday).unwrap_or(u8::MAX);
        }
        if let Some(hour) = kwargs.get("hour").and_then(Payload::as_u64) {
            job.hour = u8::try_from(hour).unwrap_or(u8::MAX);
        }
        if let Some(attributes) = kwargs.get("attributes") {
            job.attributes = Value::from(attributes.clone());
        }

        Ok(job)
    }
}
