//! Prometheus metrics exporter for Tesla vehicle telemetry.
//!
//! Polls the vehicle owner API on an adaptive schedule, persists the latest
//! vehicle data document, flattens it into metric lines and serves them over
//! HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Owner API     │────>│     Poller      │────>│   HTTP Server   │
//! │ (list/wake/data)│     │ (cache, flatten)│     │(/metrics,/healthz)
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! tesla-exporter --config config.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod cache;
pub mod client;
pub mod config;
pub mod http;
pub mod mapping;
pub mod poller;
pub mod snapshot;
pub mod state;
pub mod storage;
pub mod token;

pub use cache::VehicleDataCache;
pub use client::{ApiError, VehicleApiClient};
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use poller::VehiclePoller;
pub use snapshot::{MetricsSnapshot, SnapshotCache};
pub use state::{ExporterState, SharedState};
pub use token::TokenStore;
