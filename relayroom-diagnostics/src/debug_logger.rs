//! Structured debug logging system

use relayroom_core::RelayRoomError;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Filter used when debug logging is requested and `RUST_LOG` is unset
pub const DEBUG_FILTER: &str = "relayroom=debug,relayroom_core=debug,relayroom_provision=debug,info";

/// Debug logger for structured logging
#[derive(Debug, Default)]
pub struct DebugLogger;

impl DebugLogger {
    /// Filter directives for the given verbosity, honouring `RUST_LOG`
    pub fn filter(debug: bool) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if debug { DEBUG_FILTER } else { DEFAULT_FILTER })
        })
    }

    /// Install the global fmt subscriber.
    ///
    /// Fails if a global subscriber is already set.
    pub fn init_logging(debug: bool) -> Result<(), RelayRoomError> {
        tracing_subscriber::fmt()
            .with_env_filter(Self::filter(debug))
            .with_target(debug)
            .try_init()
            .map_err(|e| RelayRoomError::InvalidState {
                expected: "no global subscriber".to_string(),
                actual: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Whichever call wins, the other must report the conflict
        let first = DebugLogger::init_logging(false);
        let second = DebugLogger::init_logging(true);
        assert!(first.is_err() || second.is_err());
    }
}
