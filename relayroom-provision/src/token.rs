//! API credential minting.
//!
//! The vendor API accepts an HS256 JWT signed with the account secret whose
//! claims carry the API key and a permission list.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use relayroom_core::RelayRoomError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default credential lifetime: one week
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Permission granted by a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Join meetings directly
    AllowJoin,
    /// Moderate meetings
    AllowMod,
    /// Start and stop livestreams
    AllowLiveStream,
}

impl Permission {
    /// Everything the relay flow needs
    pub fn all() -> Vec<Permission> {
        vec![
            Permission::AllowJoin,
            Permission::AllowMod,
            Permission::AllowLiveStream,
        ]
    }
}

/// JWT payload of an API credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account API key
    pub apikey: String,
    /// Granted permissions
    pub permissions: Vec<Permission>,
    /// Issued-at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// Sign a credential with full permissions valid for `ttl`
pub fn generate_token(api_key: &str, secret: &str, ttl: Duration) -> Result<String, RelayRoomError> {
    generate_token_with(api_key, secret, ttl, Permission::all())
}

/// Sign a credential with an explicit permission list
pub fn generate_token_with(
    api_key: &str,
    secret: &str,
    ttl: Duration,
    permissions: Vec<Permission>,
) -> Result<String, RelayRoomError> {
    if api_key.trim().is_empty() {
        return Err(RelayRoomError::MissingConfiguration {
            field: "api_key".to_string(),
        });
    }
    if secret.is_empty() {
        return Err(RelayRoomError::MissingConfiguration {
            field: "api_secret".to_string(),
        });
    }

    let now = Utc::now().timestamp();
    let exp = i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| RelayRoomError::TokenSigning {
            reason: format!("credential lifetime {:?} is out of range", ttl),
        })?;
    let claims = TokenClaims {
        apikey: api_key.to_string(),
        permissions,
        iat: now,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to sign credential: {e}");
        RelayRoomError::TokenSigning {
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const TEST_SECRET: &str = "super-secret-test-key";

    #[test]
    fn test_token_carries_key_and_permissions() {
        let token = generate_token("key-123", TEST_SECRET, DEFAULT_TOKEN_TTL).unwrap();

        let data = decode::<TokenClaims>(
            &token,
            &DecodingKey::from_secret(TEST_SECRET.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.apikey, "key-123");
        assert_eq!(data.claims.permissions, Permission::all());
        assert_eq!(data.claims.exp - data.claims.iat, 60 * 60 * 24 * 7);
    }

    #[test]
    fn test_permission_wire_names() {
        let json = serde_json::to_string(&Permission::all()).unwrap();
        assert_eq!(json, r#"["allow_join","allow_mod","allow_live_stream"]"#);
    }

    #[test]
    fn test_out_of_range_lifetime_rejected() {
        let err = generate_token("key", TEST_SECRET, Duration::from_secs(u64::MAX)).unwrap_err();
        assert_eq!(err.error_code(), "TOKEN_SIGNING_FAILED");

        let near_limit = Duration::from_secs(i64::MAX as u64);
        assert!(matches!(
            generate_token("key", TEST_SECRET, near_limit),
            Err(RelayRoomError::TokenSigning { .. })
        ));
    }

    #[test]
    fn test_missing_inputs_rejected() {
        assert!(matches!(
            generate_token("", TEST_SECRET, DEFAULT_TOKEN_TTL),
            Err(RelayRoomError::MissingConfiguration { .. })
        ));
        assert!(matches!(
            generate_token("key", "", DEFAULT_TOKEN_TTL),
            Err(RelayRoomError::MissingConfiguration { .. })
        ));
    }
}
