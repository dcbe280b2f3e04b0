//! Wire types for the vehicle owner API and its OAuth token endpoint.

use serde::{Deserialize, Serialize};

/// OAuth client id used for the owner API.
pub const OWNER_API_CLIENT_ID: &str = "ownerapi";

/// Scopes requested when refreshing the access token.
pub const TOKEN_SCOPE: &str = "openid email offline_access";

/// Connectivity state reported for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleState {
    Online,
    Asleep,
    Offline,
    Unknown,
}

impl VehicleState {
    /// Get the string representation used by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleState::Online => "online",
            VehicleState::Asleep => "asleep",
            VehicleState::Offline => "offline",
            VehicleState::Unknown => "unknown",
        }
    }
}

impl From<&str> for VehicleState {
    fn from(s: &str) -> Self {
        match s {
            "online" => VehicleState::Online,
            "asleep" => VehicleState::Asleep,
            "offline" => VehicleState::Offline,
            _ => VehicleState::Unknown,
        }
    }
}

impl std::fmt::Display for VehicleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The vehicle identified by the last list call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleStatus {
    pub id: u64,
    pub state: VehicleState,
}

impl VehicleStatus {
    pub fn is_online(&self) -> bool {
        self.state == VehicleState::Online
    }
}

/// Response envelope of `GET /api/1/vehicles`.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleListResponse {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub response: Option<Vec<VehicleListEntry>>,
}

/// One vehicle in the list response.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleListEntry {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl VehicleListResponse {
    /// The account's only vehicle, if the response describes exactly one
    /// vehicle with both an id and a state.
    pub fn single_vehicle(&self) -> Option<VehicleStatus> {
        if self.count != Some(1) {
            return None;
        }
        match self.response.as_deref() {
            Some([entry]) => Some(VehicleStatus {
                id: entry.id?,
                state: VehicleState::from(entry.state.as_deref()?),
            }),
            _ => None,
        }
    }
}

/// Response envelope of `POST /api/1/vehicles/{id}/wake_up`.
#[derive(Debug, Clone, Deserialize)]
pub struct WakeResponse {
    #[serde(default)]
    pub response: Option<WakeAck>,
}

/// Acknowledgement body of a wake request.
#[derive(Debug, Clone, Deserialize)]
pub struct WakeAck {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Body of the refresh-token grant posted to `/oauth2/v3/token`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRefreshRequest<'a> {
    pub grant_type: &'static str,
    pub client_id: &'static str,
    pub refresh_token: &'a str,
    pub scope: &'static str,
}

impl<'a> TokenRefreshRequest<'a> {
    pub fn new(refresh_token: &'a str) -> Self {
        Self {
            grant_type: "refresh_token",
            client_id: OWNER_API_CLIENT_ID,
            refresh_token,
            scope: TOKEN_SCOPE,
        }
    }
}

/// A successful token grant. Both tokens are always replaced together.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}
