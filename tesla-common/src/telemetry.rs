use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// A node of the vehicle telemetry tree.
///
/// Mirrors the JSON document returned by the vehicle data endpoint, with
/// integers and floating-point numbers kept apart so that each leaf has exactly
/// one textual representation. Object members keep their document order.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryValue {
    /// Nested mapping, in document order.
    Object(Vec<(String, TelemetryValue)>),

    /// Integral number (covers the full `i64` and `u64` ranges).
    Integer(i128),

    /// Floating-point number.
    Float(f64),

    /// Boolean flag.
    Boolean(bool),

    /// Text value.
    Text(String),

    /// List of values.
    Array(Vec<TelemetryValue>),

    /// Explicit `null`.
    Null,
}

impl TelemetryValue {
    /// Parse a raw JSON document into a telemetry tree.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(data)?;
        Ok(Self::from(value))
    }

    /// Look up a direct member of an object node.
    pub fn get(&self, key: &str) -> Option<&TelemetryValue> {
        match self {
            TelemetryValue::Object(members) => members
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Follow a path of member names from this node.
    pub fn lookup(&self, path: &[&str]) -> Option<&TelemetryValue> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// The text of a `Text` node.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TelemetryValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for TelemetryValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => TelemetryValue::Null,
            Value::Bool(b) => TelemetryValue::Boolean(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    TelemetryValue::Integer(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    TelemetryValue::Integer(i128::from(u))
                } else {
                    TelemetryValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => TelemetryValue::Text(s),
            Value::Array(items) => {
                TelemetryValue::Array(items.into_iter().map(TelemetryValue::from).collect())
            }
            Value::Object(map) => TelemetryValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, TelemetryValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<i64> for TelemetryValue {
    fn from(v: i64) -> Self {
        TelemetryValue::Integer(i128::from(v))
    }
}

impl From<f64> for TelemetryValue {
    fn from(v: f64) -> Self {
        TelemetryValue::Float(v)
    }
}

impl From<bool> for TelemetryValue {
    fn from(v: bool) -> Self {
        TelemetryValue::Boolean(v)
    }
}

impl From<&str> for TelemetryValue {
    fn from(v: &str) -> Self {
        TelemetryValue::Text(v.to_string())
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
