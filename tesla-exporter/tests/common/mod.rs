//! Loopback stand-in for the owner and auth APIs.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use parking_lot::Mutex;
use tempfile::TempDir;

use tesla_exporter::config::{ApiConfig, ExporterConfig, StorageConfig};
use tesla_exporter::{TokenStore, VehicleApiClient, VehicleDataCache};

pub const ONLINE_LIST: &str = r#"{"response":[{"id":42,"state":"online","display_name":"Roadrunner"}],"count":1}"#;
pub const ASLEEP_LIST: &str = r#"{"response":[{"id":42,"state":"asleep","display_name":"Roadrunner"}],"count":1}"#;
pub const WAKE_ACK: &str = r#"{"response":{"id":42,"state":"online","display_name":"Roadrunner"}}"#;

/// A vehicle data document for an online vehicle in the given shift state.
pub fn vehicle_data(shift_state: &str) -> String {
    format!(
        r#"{{"response":{{"id":42,"state":"online","odometer":1234.5,"locked":true,"car_version":"2023.6.9 8b27e21d9137","drive_state":{{"shift_state":"{}","speed":30}},"charge_state":{{"battery_level":67,"charging_state":""}}}}}}"#,
        shift_state
    )
}

#[derive(Clone)]
pub struct Canned {
    pub status: u16,
    pub body: String,
}

impl Canned {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

pub struct FakeState {
    pub list: Canned,
    pub wake: Canned,
    pub data: Canned,
    pub token: Canned,
    /// When set, owner API calls with another bearer token get 401.
    pub required_token: Option<String>,
    /// Hold the next list call for this long before answering.
    pub list_delay: Option<Duration>,
    /// Arrival time of every list call.
    pub list_times: Vec<Instant>,
    pub list_calls: usize,
    pub wake_calls: usize,
    pub data_calls: usize,
    pub token_calls: usize,
    pub last_authorization: Option<String>,
    pub last_token_request: Option<serde_json::Value>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            list: Canned::ok(ONLINE_LIST),
            wake: Canned::ok(WAKE_ACK),
            data: Canned::ok(vehicle_data("P")),
            token: Canned::ok(r#"{"access_token":"fresh-access","refresh_token":"fresh-refresh"}"#),
            required_token: None,
            list_delay: None,
            list_times: Vec::new(),
            list_calls: 0,
            wake_calls: 0,
            data_calls: 0,
            token_calls: 0,
            last_authorization: None,
            last_token_request: None,
        }
    }
}

pub type Shared = Arc<Mutex<FakeState>>;

pub struct FakeApi {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl FakeApi {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let router = Router::new()
            .route("/api/1/vehicles", get(list))
            .route("/api/1/vehicles/:id/wake_up", post(wake))
            .route("/api/1/vehicles/:id/vehicle_data", get(data))
            .route("/oauth2/v3/token", post(token))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            owner_url: self.url(),
            auth_url: self.url(),
            retries: 3,
            retry_sleep_secs: 0,
            timeout_secs: 5,
        }
    }
}

fn reply(canned: &Canned) -> Response {
    let status = StatusCode::from_u16(canned.status).unwrap();
    (status, canned.body.clone()).into_response()
}

fn authorize(state: &mut FakeState, headers: &HeaderMap) -> Option<Response> {
    let auth = headers
        .get("authorization")
        .map(|v| v.to_str().unwrap().to_string());
    state.last_authorization = auth.clone();

    let required = state.required_token.as_ref()?;
    if auth.as_deref() == Some(format!("Bearer {}", required).as_str()) {
        None
    } else {
        Some(StatusCode::UNAUTHORIZED.into_response())
    }
}

async fn list(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let delay = {
        let mut state = shared.lock();
        state.list_calls += 1;
        state.list_times.push(Instant::now());
        state.list_delay.take()
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = shared.lock();
    if let Some(denied) = authorize(&mut state, &headers) {
        return denied;
    }
    reply(&state.list)
}

async fn wake(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    state.wake_calls += 1;
    if let Some(denied) = authorize(&mut state, &headers) {
        return denied;
    }
    reply(&state.wake)
}

async fn data(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    state.data_calls += 1;
    if let Some(denied) = authorize(&mut state, &headers) {
        return denied;
    }
    reply(&state.data)
}

async fn token(State(state): State<Shared>, body: String) -> Response {
    let mut state = state.lock();
    state.token_calls += 1;
    state.last_token_request = serde_json::from_str(&body).ok();
    reply(&state.token)
}

/// Token and data files in a scratch directory.
pub struct Workspace {
    pub dir: TempDir,
    pub storage: StorageConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            access_token_file: dir.path().join("token.access"),
            refresh_token_file: dir.path().join("token.refresh"),
            vehicle_data_file: dir.path().join("vehicle.data"),
        };
        std::fs::write(&storage.access_token_file, "stale-access\n").unwrap();
        std::fs::write(&storage.refresh_token_file, "old-refresh\n").unwrap();
        Self { dir, storage }
    }

    pub fn tokens(&self) -> TokenStore {
        TokenStore::from_config(&self.storage)
    }

    pub fn cache(&self) -> VehicleDataCache {
        VehicleDataCache::new(&self.storage.vehicle_data_file)
    }

    pub fn data_path(&self) -> PathBuf {
        self.storage.vehicle_data_file.clone()
    }

    pub fn read(&self, path: &std::path::Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    pub fn client(&self, api: &FakeApi) -> VehicleApiClient {
        VehicleApiClient::new(&api.api_config(), self.tokens(), self.cache()).unwrap()
    }

    pub fn config(&self, api: &FakeApi) -> ExporterConfig {
        ExporterConfig {
            api: api.api_config(),
            storage: self.storage.clone(),
            ..Default::default()
        }
    }
}
