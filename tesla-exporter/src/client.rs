//! Vehicle owner API client.
//!
//! Every operation runs the same bounded loop: up to `retries` attempts with a
//! fixed pause between them, refreshing the access token after each failed
//! attempt. Any failure (transport, non-2xx status, unexpected body, missing
//! token) is treated as possibly caused by an expired token.
//!
//! | Error | Disposition |
//! |-------|-------------|
//! | `Transport`, `Status`, `Malformed`, `MissingToken` | refresh token, retry |
//! | `Storage` | fatal, returned to the caller |

use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode};
use tesla_common::vehicle::WakeAck;
use tesla_common::{
    TokenRefreshRequest, TokenResponse, VehicleListResponse, VehicleStatus, WakeResponse,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::VehicleDataCache;
use crate::config::ApiConfig;
use crate::storage::StorageError;
use crate::token::{TokenKind, TokenStore};

/// Errors from a single API attempt.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected HTTP status: {0}")]
    Status(StatusCode),
    #[error("Unexpected response: {0}")]
    Malformed(String),
    #[error("No {0} token available")]
    MissingToken(TokenKind),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Whether the error must stop the exporter rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Storage(_))
    }
}

/// Client for the list, wake and vehicle data endpoints.
pub struct VehicleApiClient {
    http: reqwest::Client,
    owner_url: String,
    auth_url: String,
    retries: u32,
    retry_sleep: Duration,
    tokens: TokenStore,
    cache: VehicleDataCache,
}

impl VehicleApiClient {
    /// Create a client. Fetched vehicle data is persisted to `cache`.
    pub fn new(
        config: &ApiConfig,
        tokens: TokenStore,
        cache: VehicleDataCache,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            owner_url: config.owner_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            retries: config.retries,
            retry_sleep: config.retry_sleep(),
            tokens,
            cache,
        })
    }

    /// Identify the account's vehicle and its state.
    ///
    /// Returns `Ok(None)` when no attempt produced exactly one vehicle; `Err`
    /// only for fatal storage failures.
    pub async fn list_vehicle(&self) -> Result<Option<VehicleStatus>, ApiError> {
        self.with_retries("list_vehicle", || self.try_list_vehicle())
            .await
    }

    /// Ask the vehicle to wake up. Does not wait for it to come online.
    pub async fn wake_vehicle(&self, id: u64) -> Result<(), ApiError> {
        self.with_retries("wake_vehicle", || self.try_wake_vehicle(id))
            .await
            .map(|_| ())
    }

    /// Download the full vehicle data document into the cache file.
    ///
    /// A document without a `response` member is ignored.
    pub async fn fetch_vehicle_data(&self, id: u64) -> Result<(), ApiError> {
        self.with_retries("fetch_vehicle_data", || self.try_fetch_vehicle_data(id))
            .await
            .map(|_| ())
    }

    /// Exchange the refresh token for a new token pair and persist both.
    ///
    /// Returns whether new tokens were stored. Failing to obtain tokens is
    /// logged and leaves the stored ones untouched; failing to persist them is
    /// fatal.
    pub async fn refresh_access_token(&self) -> Result<bool, ApiError> {
        let Some(refresh_token) = self.tokens.read(TokenKind::Refresh) else {
            warn!("No refresh token available, cannot refresh access token");
            return Ok(false);
        };

        let url = format!("{}/oauth2/v3/token", self.auth_url);
        info!(url = %url, "Refreshing access token");

        let grant = match self.request_token(&url, &refresh_token).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(url = %url, error = %e, "Token refresh failed");
                return Ok(false);
            }
        };

        self.tokens.write(TokenKind::Access, &grant.access_token)?;
        self.tokens.write(TokenKind::Refresh, &grant.refresh_token)?;
        info!("Access token refreshed");
        Ok(true)
    }

    async fn with_retries<T, F, Fut>(
        &self,
        operation: &str,
        mut attempt: F,
    ) -> Result<Option<T>, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        for n in 1..=self.retries {
            match attempt().await {
                Ok(value) => return Ok(Some(value)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        operation,
                        attempt = n,
                        retries = self.retries,
                        error = %e,
                        "API call failed"
                    );
                    self.refresh_access_token().await?;
                    if n < self.retries {
                        tokio::time::sleep(self.retry_sleep).await;
                    }
                }
            }
        }

        warn!(operation, retries = self.retries, "Giving up after retries");
        Ok(None)
    }

    async fn try_list_vehicle(&self) -> Result<VehicleStatus, ApiError> {
        let url = format!("{}/api/1/vehicles", self.owner_url);
        info!(url = %url, "Listing vehicles");

        let body = self.send_authorized(self.http.get(&url)).await?;
        let list: VehicleListResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))?;
        let vehicle = list.single_vehicle().ok_or_else(|| {
            ApiError::Malformed("expected exactly one vehicle with id and state".to_string())
        })?;

        info!(id = vehicle.id, state = %vehicle.state, "Found vehicle");
        Ok(vehicle)
    }

    async fn try_wake_vehicle(&self, id: u64) -> Result<(), ApiError> {
        let url = format!("{}/api/1/vehicles/{}/wake_up", self.owner_url, id);
        info!(id, "Waking vehicle");

        let body = self.send_authorized(self.http.post(&url)).await?;
        let ack = serde_json::from_str::<WakeResponse>(&body)
            .ok()
            .and_then(|w| w.response);

        match ack {
            Some(WakeAck {
                state: Some(state),
                display_name: Some(name),
            }) => info!(vehicle = %name, state = %state, "Wakeup sent"),
            _ => warn!(body = %body, "Unexpected wakeup response"),
        }
        Ok(())
    }

    async fn try_fetch_vehicle_data(&self, id: u64) -> Result<(), ApiError> {
        let url = format!("{}/api/1/vehicles/{}/vehicle_data", self.owner_url, id);
        info!(url = %url, "Getting vehicle data");

        let body = self.send_authorized(self.http.get(&url)).await?;
        if self.cache.store(&body)? {
            debug!(bytes = body.len(), "Vehicle data stored");
        } else {
            warn!(url = %url, "Vehicle data has no response member, ignoring");
        }
        Ok(())
    }

    /// Send with the current access token; a non-2xx status is an error.
    async fn send_authorized(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let token = self
            .tokens
            .read(TokenKind::Access)
            .ok_or(ApiError::MissingToken(TokenKind::Access))?;

        let response = request
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        Ok(response.text().await?)
    }

    async fn request_token(
        &self,
        url: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        let response = self
            .http
            .post(url)
            .json(&TokenRefreshRequest::new(refresh_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}
