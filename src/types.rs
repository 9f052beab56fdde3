//! Core types for parsed Line Protocol points.

use std::fmt;
use std::io;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::value::FieldValue;

/// A single point: one successfully parsed Line Protocol line.
///
/// Points are immutable once built. Tags and fields keep the order in which
/// they appeared on the line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Point {
    measurement: String,
    tags: IndexMap<String, String>,
    fields: IndexMap<String, FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
}

impl Point {
    /// Start building a point for the given measurement.
    pub fn builder(measurement: impl Into<String>) -> PointBuilder {
        let mut builder = PointBuilder::new();
        builder.set_measurement(measurement);
        builder
    }

    /// Get the measurement name.
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Get all tags in line order.
    pub fn tags(&self) -> &IndexMap<String, String> {
        &self.tags
    }

    /// Get all fields in line order.
    pub fn fields(&self) -> &IndexMap<String, FieldValue> {
        &self.fields
    }

    /// Get a tag value by key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Get a field value by key.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Get field as f64.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(|v| v.as_float())
    }

    /// Get field as i64.
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(|v| v.as_integer())
    }

    /// Get field as bool.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(|v| v.as_bool())
    }

    /// Get field as string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// Get the raw timestamp, if the line carried one.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Get the timestamp as a UTC date, treating it as nanoseconds since the epoch.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.timestamp.map(DateTime::from_timestamp_nanos)
    }

    /// Serialize the point as a single Line Protocol line (no trailing newline).
    pub fn write_to<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "{}", self)
    }
}

fn escape_measurement(s: &str) -> String {
    s.replace(' ', "\\ ").replace(',', "\\,")
}

fn escape_key(s: &str) -> String {
    s.replace(' ', "\\ ")
        .replace(',', "\\,")
        .replace('=', "\\=")
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape_measurement(&self.measurement))?;
        for (key, value) in &self.tags {
            write!(f, ",{}={}", escape_key(key), escape_key(value))?;
        }

        let mut separator = ' ';
        for (key, value) in &self.fields {
            write!(f, "{}{}={}", separator, escape_key(key), value)?;
            separator = ',';
        }

        if let Some(ts) = self.timestamp {
            write!(f, " {}", ts)?;
        }
        Ok(())
    }
}

/// Mutable accumulator for one point.
///
/// The tokenizer owns exactly one builder and resets it before every line.
/// Duplicate tag or field keys overwrite the earlier value in place.
#[derive(Clone, Debug, Default)]
pub struct PointBuilder {
    measurement: String,
    tags: IndexMap<String, String>,
    fields: IndexMap<String, FieldValue>,
    timestamp: Option<i64>,
}

impl PointBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state so the builder can be reused for the next line.
    pub fn reset(&mut self) {
        self.measurement.clear();
        self.tags.clear();
        self.fields.clear();
        self.timestamp = None;
    }

    /// Set the measurement name.
    pub fn set_measurement(&mut self, measurement: impl Into<String>) {
        self.measurement = measurement.into();
    }

    /// Add a tag. Empty keys or values are rejected.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            return Err(Error::Builder("tag key must not be empty".to_string()));
        }
        if value.is_empty() {
            return Err(Error::Builder(format!("tag '{}' has an empty value", key)));
        }
        self.tags.insert(key, value);
        Ok(())
    }

    /// Add a field. Empty keys are rejected.
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::Builder("field key must not be empty".to_string()));
        }
        self.fields.insert(key, value.into());
        Ok(())
    }

    /// Set the timestamp.
    pub fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = Some(timestamp);
    }

    /// Chainable form of [`add_tag`](Self::add_tag).
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        self.add_tag(key, value)?;
        Ok(self)
    }

    /// Chainable form of [`add_field`](Self::add_field).
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Result<Self> {
        self.add_field(key, value)?;
        Ok(self)
    }

    /// Chainable form of [`set_timestamp`](Self::set_timestamp).
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.set_timestamp(timestamp);
        self
    }

    /// Whether at least one field has been committed.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Produce a point from the accumulated state, leaving the builder empty.
    ///
    /// Fails unless a measurement and at least one field are present.
    pub fn build(&mut self) -> Result<Point> {
        if self.measurement.is_empty() {
            return Err(Error::Builder("measurement must not be empty".to_string()));
        }
        if self.fields.is_empty() {
            return Err(Error::Builder("a point needs at least one field".to_string()));
        }
        Ok(Point {
            measurement: std::mem::take(&mut self.measurement),
            tags: std::mem::take(&mut self.tags),
            fields: std::mem::take(&mut self.fields),
            timestamp: self.timestamp.take(),
        })
    }
}
