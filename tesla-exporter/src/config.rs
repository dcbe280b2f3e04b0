//! Configuration for the vehicle metrics exporter.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tesla_common::LoggingConfig;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP endpoint settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Poll scheduling settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Vehicle API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Metric naming settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Persisted file locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address to listen on (default: "0.0.0.0:9100").
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "0.0.0.0:9100".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Poll cadence and staleness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Normal poll interval (seconds). Also bounds the health check: the loop
    /// is considered stalled after twice this long without a cycle.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Poll interval while the vehicle is in drive (seconds).
    #[serde(default = "default_drive_interval")]
    pub drive_interval_secs: u64,

    /// Published metrics are dropped once the data is older than this (seconds).
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold_secs: u64,

    /// How long a vehicle may stay asleep or offline before it is woken (seconds).
    #[serde(default = "default_sleep_allowed")]
    pub sleep_allowed_secs: u64,
}

fn default_check_interval() -> u64 {
    50
}

fn default_drive_interval() -> u64 {
    25
}

fn default_stale_threshold() -> u64 {
    90
}

fn default_sleep_allowed() -> u64 {
    60 * 60
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            drive_interval_secs: default_drive_interval(),
            stale_threshold_secs: default_stale_threshold(),
            sleep_allowed_secs: default_sleep_allowed(),
        }
    }
}

impl PollingConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn drive_interval(&self) -> Duration {
        Duration::from_secs(self.drive_interval_secs)
    }

    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs(self.stale_threshold_secs)
    }

    pub fn sleep_allowed(&self) -> Duration {
        Duration::from_secs(self.sleep_allowed_secs)
    }

    /// Maximum time between loop iterations before `/healthz` reports failure.
    pub fn max_loop_age(&self) -> Duration {
        self.check_interval() * 2
    }
}

/// Vehicle owner API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Owner API base URL.
    #[serde(default = "default_owner_url")]
    pub owner_url: String,

    /// OAuth service base URL.
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Attempts per API operation before giving up.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Pause between attempts (seconds).
    #[serde(default = "default_retry_sleep")]
    pub retry_sleep_secs: u64,

    /// Per-request transport timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_owner_url() -> String {
    "https://owner-api.teslamotors.com".to_string()
}

fn default_auth_url() -> String {
    "https://auth.tesla.com".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_retry_sleep() -> u64 {
    5
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            owner_url: default_owner_url(),
            auth_url: default_auth_url(),
            retries: default_retries(),
            retry_sleep_secs: default_retry_sleep(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn retry_sleep(&self) -> Duration {
        Duration::from_secs(self.retry_sleep_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Metric naming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Metric name prefix (default: "tesla").
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "tesla".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

/// Locations of the files owned by the exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Access token file (rewritten on every refresh).
    #[serde(default = "default_access_token_file")]
    pub access_token_file: PathBuf,

    /// Refresh token file (rewritten together with the access token).
    #[serde(default = "default_refresh_token_file")]
    pub refresh_token_file: PathBuf,

    /// Raw vehicle data document.
    #[serde(default = "default_vehicle_data_file")]
    pub vehicle_data_file: PathBuf,
}

fn default_access_token_file() -> PathBuf {
    PathBuf::from("/data/token.access")
}

fn default_refresh_token_file() -> PathBuf {
    PathBuf::from("/data/token.refresh")
}

fn default_vehicle_data_file() -> PathBuf {
    PathBuf::from("/data/vehicle.data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            access_token_file: default_access_token_file(),
            refresh_token_file: default_refresh_token_file(),
            vehicle_data_file: default_vehicle_data_file(),
        }
    }
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.http.listen
            )));
        }

        if self.polling.check_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "check_interval_secs must be > 0".to_string(),
            ));
        }

        if self.polling.drive_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "drive_interval_secs must be > 0".to_string(),
            ));
        }

        if self.polling.drive_interval_secs > self.polling.check_interval_secs {
            return Err(ConfigError::Validation(
                "drive_interval_secs must not exceed check_interval_secs".to_string(),
            ));
        }

        if self.polling.stale_threshold_secs == 0 {
            return Err(ConfigError::Validation(
                "stale_threshold_secs must be > 0".to_string(),
            ));
        }

        if self.api.retries == 0 {
            return Err(ConfigError::Validation("retries must be > 0".to_string()));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.api.owner_url.is_empty() || self.api.auth_url.is_empty() {
            return Err(ConfigError::Validation(
                "owner_url and auth_url must not be empty".to_string(),
            ));
        }

        let paths = [
            &self.storage.access_token_file,
            &self.storage.refresh_token_file,
            &self.storage.vehicle_data_file,
        ];
        if paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::Validation(
                "storage file paths must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tesla_common::LogFormat;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.http.listen, "0.0.0.0:9100");
        assert_eq!(config.polling.check_interval_secs, 50);
        assert_eq!(config.polling.drive_interval_secs, 25);
        assert_eq!(config.polling.stale_threshold_secs, 90);
        assert_eq!(config.polling.sleep_allowed_secs, 3600);
        assert_eq!(config.api.retries, 3);
        assert_eq!(config.api.retry_sleep_secs, 5);
        assert_eq!(config.metrics.prefix, "tesla");
        assert_eq!(
            config.storage.vehicle_data_file,
            PathBuf::from("/data/vehicle.data")
        );
        assert_eq!(config.polling.max_loop_age(), Duration::from_secs(100));
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            http: { listen: "127.0.0.1:9200" },
            polling: {
                check_interval_secs: 60,
                drive_interval_secs: 15,
                stale_threshold_secs: 120,
                sleep_allowed_secs: 7200,
            },
            api: {
                owner_url: "http://localhost:8080",
                auth_url: "http://localhost:8081",
                retries: 5,
                retry_sleep_secs: 1,
                timeout_secs: 10,
            },
            metrics: { prefix: "car" },
            storage: {
                access_token_file: "/tmp/a",
                refresh_token_file: "/tmp/r",
                vehicle_data_file: "/tmp/v",
            },
            logging: { level: "debug", format: "json" }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.http.listen, "127.0.0.1:9200");
        assert_eq!(config.polling.drive_interval(), Duration::from_secs(15));
        assert_eq!(config.polling.stale_threshold(), Duration::from_secs(120));
        assert_eq!(config.polling.sleep_allowed(), Duration::from_secs(7200));
        assert_eq!(config.api.owner_url, "http://localhost:8080");
        assert_eq!(config.api.retries, 5);
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(config.metrics.prefix, "car");
        assert_eq!(config.storage.access_token_file, PathBuf::from("/tmp/a"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_invalid_listen() {
        let result = ExporterConfig::parse(r#"{ http: { listen: "not-an-address" } }"#);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_zero_intervals() {
        assert!(ExporterConfig::parse("{ polling: { check_interval_secs: 0 } }").is_err());
        assert!(ExporterConfig::parse("{ polling: { drive_interval_secs: 0 } }").is_err());
        assert!(ExporterConfig::parse("{ polling: { stale_threshold_secs: 0 } }").is_err());
    }

    #[test]
    fn test_validate_drive_interval_not_longer_than_check() {
        let result = ExporterConfig::parse(
            "{ polling: { check_interval_secs: 20, drive_interval_secs: 30 } }",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_zero_retries() {
        assert!(ExporterConfig::parse("{ api: { retries: 0 } }").is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let result = ExporterConfig::parse("{ api: { timeout_secs: 0 } }");
        assert!(matches!(result, Err(ConfigError::Validation(msg)) if msg.contains("timeout_secs")));
        assert!(ExporterConfig::parse("{ api: { timeout_secs: 1 } }").is_ok());
    }

    #[test]
    fn test_validate_empty_path() {
        assert!(ExporterConfig::parse(r#"{ storage: { vehicle_data_file: "" } }"#).is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ExporterConfig::parse("{ http: "),
            Err(ConfigError::Parse(_))
        ));
    }
}
