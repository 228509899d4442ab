//! Error types for relayroom

use std::time::Duration;
use thiserror::Error;

/// Main error type for relayroom operations
#[derive(Error, Debug)]
pub enum RelayRoomError {
    /// The provisioning endpoint answered with a non-success status
    #[error("Failed to create room: {status} {body}")]
    Provisioning {
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// The provisioning endpoint answered 2xx but the body was unusable
    #[error("Malformed provisioning response: {reason}")]
    MalformedResponse {
        /// What was wrong with the body
        reason: String,
    },

    /// A command against the meeting SDK was rejected or failed
    #[error("Meeting operation '{operation}' failed: {message}")]
    SdkOperation {
        /// Command that failed (join, leave, toggle_mic, ...)
        operation: String,
        /// Message reported by the SDK
        message: String,
    },

    /// No meeting handle is bound, or the relay target is unknown
    #[error("No active session")]
    NoActiveSession,

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Transport error talking to the provisioning API
    #[error("Transport error: {reason}")]
    Transport {
        /// Reason for transport error
        reason: String,
    },

    /// Operation timed out error
    #[error("Operation timed out: {operation} after {duration:?}")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Duration after which timeout occurred
        duration: Duration,
    },

    /// Credential signing failed
    #[error("Token signing failed: {reason}")]
    TokenSigning {
        /// Reason for failure
        reason: String,
    },
}

impl RelayRoomError {
    /// Build an [`RelayRoomError::SdkOperation`] from anything printable
    pub fn sdk(operation: &str, message: impl std::fmt::Display) -> Self {
        RelayRoomError::SdkOperation {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            RelayRoomError::Provisioning { .. } => "PROVISIONING_FAILED",
            RelayRoomError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            RelayRoomError::SdkOperation { .. } => "SDK_OPERATION_FAILED",
            RelayRoomError::NoActiveSession => "NO_ACTIVE_SESSION",
            RelayRoomError::MissingConfiguration { .. } => "MISSING_CONFIGURATION",
            RelayRoomError::InvalidState { .. } => "INVALID_STATE",
            RelayRoomError::Transport { .. } => "TRANSPORT_ERROR",
            RelayRoomError::Timeout { .. } => "TIMEOUT",
            RelayRoomError::TokenSigning { .. } => "TOKEN_SIGNING_FAILED",
        }
    }

    /// Whether the failure belongs to room provisioning rather than a live session
    pub fn is_provisioning_error(&self) -> bool {
        matches!(
            self,
            RelayRoomError::Provisioning { .. }
                | RelayRoomError::MalformedResponse { .. }
                | RelayRoomError::Transport { .. }
                | RelayRoomError::Timeout { .. }
        )
    }

    /// HTTP status carried by a provisioning failure
    pub fn status(&self) -> Option<u16> {
        match self {
            RelayRoomError::Provisioning { status, .. } => Some(*status),
            _ => None,
        }
    }
}
