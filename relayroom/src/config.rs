//! Configuration types and defaults

use relayroom_core::{MeetingConfig, RelayRoomError};
use relayroom_provision::{
    generate_token, ProvisionConfig, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TOKEN_TTL,
};
use std::time::Duration;

/// Environment variable holding a ready-made API credential
pub const ENV_AUTH_TOKEN: &str = "RELAYROOM_AUTH_TOKEN";
/// Environment variable holding the API key used to sign a credential
pub const ENV_API_KEY: &str = "RELAYROOM_API_KEY";
/// Environment variable holding the API secret used to sign a credential
pub const ENV_API_SECRET: &str = "RELAYROOM_API_SECRET";
/// Environment variable overriding the API base URL
pub const ENV_API_BASE: &str = "RELAYROOM_API_BASE";
/// Environment variable overriding the RTMP relay host
pub const ENV_RELAY_HOST: &str = "RELAYROOM_RELAY_HOST";
/// Environment variable overriding the local display name
pub const ENV_DISPLAY_NAME: &str = "RELAYROOM_DISPLAY_NAME";
/// Environment variable enabling debug logging
pub const ENV_DEBUG: &str = "RELAYROOM_DEBUG";
/// Environment variable overriding the request timeout in milliseconds
pub const ENV_REQUEST_TIMEOUT_MS: &str = "RELAYROOM_REQUEST_TIMEOUT_MS";

/// Default RTMP relay host
pub const DEFAULT_RELAY_HOST: &str = "localhost:1935";
/// Grace window a toggle guard stays set after the command settles
pub const DEFAULT_TOGGLE_GRACE: Duration = Duration::from_millis(500);
/// Fixed delay between leaving one room and binding the next
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(800);

/// Where the provisioning credential comes from
#[derive(Clone)]
pub enum CredentialSource {
    /// A pre-issued token
    Token(String),
    /// Sign a fresh token from the account key and secret
    Signed {
        /// API key
        api_key: String,
        /// API secret
        secret: String,
        /// Token lifetime
        ttl: Duration,
    },
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Token(_) => f.write_str("Token(<redacted>)"),
            CredentialSource::Signed { api_key, ttl, .. } => f
                .debug_struct("Signed")
                .field("api_key", api_key)
                .field("ttl", ttl)
                .finish_non_exhaustive(),
        }
    }
}

impl CredentialSource {
    /// Produce the token sent in the `authorization` header
    pub fn resolve(&self) -> Result<String, RelayRoomError> {
        match self {
            CredentialSource::Token(token) => Ok(token.clone()),
            CredentialSource::Signed {
                api_key,
                secret,
                ttl,
            } => generate_token(api_key, secret, *ttl),
        }
    }
}

/// How the room switcher decides the previous session has been torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Always wait this long after leaving
    FixedDelay(Duration),
    /// Wait for the SDK's left callback, giving up after `timeout`
    Acknowledged {
        /// Upper bound on the wait
        timeout: Duration,
    },
}

impl Default for SettlePolicy {
    fn default() -> Self {
        SettlePolicy::FixedDelay(DEFAULT_SETTLE_DELAY)
    }
}

/// Global relayroom configuration
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Vendor API base URL
    pub api_base: String,
    /// Provisioning credential
    pub credential: Option<CredentialSource>,
    /// Timeout for provisioning requests
    pub request_timeout: Duration,
    /// Per-room settings
    pub room: RoomConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            api_base: DEFAULT_API_BASE.to_string(),
            credential: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            room: RoomConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Resolve configuration from `RELAYROOM_*` environment variables
    pub fn from_env() -> Result<Self, RelayRoomError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    ///
    /// A credential is required: either `RELAYROOM_AUTH_TOKEN`, or both
    /// `RELAYROOM_API_KEY` and `RELAYROOM_API_SECRET`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayRoomError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.credential = match (get(ENV_AUTH_TOKEN), get(ENV_API_KEY), get(ENV_API_SECRET)) {
            (Some(token), _, _) => Some(CredentialSource::Token(token)),
            (None, Some(api_key), Some(secret)) => Some(CredentialSource::Signed {
                api_key,
                secret,
                ttl: DEFAULT_TOKEN_TTL,
            }),
            _ => {
                return Err(RelayRoomError::MissingConfiguration {
                    field: ENV_AUTH_TOKEN.to_string(),
                })
            }
        };

        if let Some(api_base) = get(ENV_API_BASE) {
            config.api_base = api_base;
        }
        if let Some(relay_host) = get(ENV_RELAY_HOST) {
            config.room.relay_host = relay_host;
        }
        if let Some(display_name) = get(ENV_DISPLAY_NAME) {
            config.room.display_name = display_name;
        }
        if let Some(debug) = get(ENV_DEBUG) {
            config.debug_logging = matches!(debug.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(ms) = get(ENV_REQUEST_TIMEOUT_MS) {
            let ms = ms
                .trim()
                .parse::<u64>()
                .map_err(|_| RelayRoomError::MissingConfiguration {
                    field: format!("{} (milliseconds)", ENV_REQUEST_TIMEOUT_MS),
                })?;
            config.request_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Provisioning client settings, resolving the credential
    pub fn provision_config(&self) -> Result<ProvisionConfig, RelayRoomError> {
        let credential =
            self.credential
                .as_ref()
                .ok_or_else(|| RelayRoomError::MissingConfiguration {
                    field: "credential".to_string(),
                })?;

        Ok(ProvisionConfig::new(credential.resolve()?)
            .with_api_base(self.api_base.clone())
            .with_request_timeout(self.request_timeout))
    }
}

/// Room-specific configuration
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Display name of the local participant
    pub display_name: String,
    /// Join with the microphone on
    pub mic_enabled: bool,
    /// Join with the webcam on
    pub webcam_enabled: bool,
    /// RTMP host relays publish to
    pub relay_host: String,
    /// How long a toggle guard stays set after the command settles
    pub toggle_grace: Duration,
    /// How a room switch waits for teardown
    pub settle_policy: SettlePolicy,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            display_name: "Guest".to_string(),
            mic_enabled: true,
            webcam_enabled: true,
            relay_host: DEFAULT_RELAY_HOST.to_string(),
            toggle_grace: DEFAULT_TOGGLE_GRACE,
            settle_policy: SettlePolicy::default(),
        }
    }
}

impl RoomConfig {
    /// Settings handed to the SDK when opening a meeting
    pub fn meeting_config(&self) -> MeetingConfig {
        MeetingConfig {
            display_name: self.display_name.clone(),
            mic_enabled: self.mic_enabled,
            webcam_enabled: self.webcam_enabled,
        }
    }
}
