//! Persisted copy of the last vehicle data document.

use std::path::PathBuf;
use std::time::SystemTime;

use tesla_common::TelemetryValue;
use tracing::warn;

use crate::storage::{self, StorageError};

/// The raw vehicle data payload, kept in a single file whose modification time
/// tells the poller when fresh data arrived.
#[derive(Debug, Clone)]
pub struct VehicleDataCache {
    path: PathBuf,
}

impl VehicleDataCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist `payload` if it is a JSON object with a top-level `response`
    /// member. Returns whether it was written.
    pub fn store(&self, payload: &str) -> Result<bool, StorageError> {
        if !has_response(payload) {
            return Ok(false);
        }
        storage::write_atomic(&self.path, payload)?;
        Ok(true)
    }

    /// Modification time of the cache file.
    pub fn age(&self) -> Option<SystemTime> {
        storage::file_age(&self.path)
    }

    /// Read and parse the cached document. Returns `None` if the file is
    /// missing or does not hold valid JSON.
    pub fn load(&self) -> Option<TelemetryValue> {
        let content = match storage::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Cannot load vehicle data");
                return None;
            }
        };

        match TelemetryValue::from_slice(content.as_bytes()) {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot parse vehicle data");
                None
            }
        }
    }
}

/// Whether a payload parses as a JSON object containing `response`.
pub fn has_response(payload: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(serde_json::Value::Object(map)) => map.contains_key("response"),
        _ => false,
    }
}
