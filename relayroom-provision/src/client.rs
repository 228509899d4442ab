//! Room creation against the vendor REST API

use relayroom_core::{RelayRoomError, RoomId};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Default vendor API base URL
pub const DEFAULT_API_BASE: &str = "https://api.videosdk.live";

/// Room creation endpoint path
pub const ROOMS_PATH: &str = "/v2/rooms";

/// Default request timeout for provisioning calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`RoomsClient`]
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// API base URL, without the `/v2/rooms` path
    pub api_base: String,
    /// Credential sent verbatim in the `authorization` header
    pub auth_token: String,
    /// Whole-request timeout
    pub request_timeout: Duration,
}

impl ProvisionConfig {
    /// Config for the default endpoint with the given credential
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            auth_token: auth_token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Point the client at another API base
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    #[serde(rename = "roomId")]
    room_id: Option<String>,
}

/// REST client that provisions rooms
#[derive(Debug, Clone)]
pub struct RoomsClient {
    base_url: String,
    auth_token: String,
    request_timeout: Duration,
    http: Client,
}

impl RoomsClient {
    /// Build a client; fails when the credential is blank
    pub fn new(config: &ProvisionConfig) -> Result<Self, RelayRoomError> {
        if config.auth_token.trim().is_empty() {
            return Err(RelayRoomError::MissingConfiguration {
                field: "auth_token".to_string(),
            });
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RelayRoomError::Transport {
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: config.api_base.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            request_timeout: config.request_timeout,
            http,
        })
    }

    /// Full URL of the room creation endpoint
    pub fn rooms_url(&self) -> String {
        format!("{}{}", self.base_url, ROOMS_PATH)
    }

    /// Create a room and return its identifier.
    ///
    /// Sends `POST /v2/rooms` with an empty JSON object. No retries.
    pub async fn create_room(&self) -> Result<RoomId, RelayRoomError> {
        tracing::debug!("Creating room via {}", self.rooms_url());

        let response = self
            .http
            .post(self.rooms_url())
            .header(AUTHORIZATION, &self.auth_token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.request_error(e))?;

        if !status.is_success() {
            tracing::error!("Room creation failed with status {}: {}", status, body);
            return Err(RelayRoomError::Provisioning {
                status: status.as_u16(),
                body,
            });
        }

        let room_id = room_id_from_body(&body)?;
        tracing::info!("🏠 Created room {}", room_id);
        Ok(room_id)
    }

    /// Use the id the user typed, or create a room when none was given
    pub async fn resolve_room(&self, entered: Option<&str>) -> Result<RoomId, RelayRoomError> {
        match entered.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Ok(RoomId::from(id)),
            None => self.create_room().await,
        }
    }

    fn request_error(&self, error: reqwest::Error) -> RelayRoomError {
        if error.is_timeout() {
            RelayRoomError::Timeout {
                operation: "create_room".to_string(),
                duration: self.request_timeout,
            }
        } else {
            RelayRoomError::Transport {
                reason: error.to_string(),
            }
        }
    }
}

/// Extract the room id from a successful creation response body
pub fn room_id_from_body(body: &str) -> Result<RoomId, RelayRoomError> {
    let parsed: CreateRoomResponse =
        serde_json::from_str(body).map_err(|e| RelayRoomError::MalformedResponse {
            reason: format!("unexpected body: {}", e),
        })?;

    match parsed.room_id {
        Some(id) if !id.trim().is_empty() => Ok(RoomId::from(id)),
        _ => Err(RelayRoomError::MalformedResponse {
            reason: "missing roomId field".to_string(),
        }),
    }
}
