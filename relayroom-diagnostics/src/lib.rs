//! # relayroom diagnostics
//!
//! Logging initialization and serializable snapshots of session state.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod debug_logger;
pub mod session_snapshot;

// Re-export main types
pub use debug_logger::DebugLogger;
pub use session_snapshot::SessionSnapshot;

#[cfg(test)]
mod tests {
    /// Entries of the `[dependencies]` table of a manifest
    fn runtime_dependencies(manifest: &str) -> Vec<&str> {
        manifest
            .split("[dependencies]")
            .nth(1)
            .unwrap_or_default()
            .split("\n[")
            .next()
            .unwrap_or_default()
            .lines()
            .filter_map(|line| line.split_once('=').map(|(name, _)| name.trim()))
            .collect()
    }

    #[test]
    fn test_manifests_keep_test_only_crates_out_of_dependencies() {
        let diagnostics = runtime_dependencies(include_str!("../Cargo.toml"));
        assert!(diagnostics.contains(&"tracing-subscriber"));
        assert!(!diagnostics.contains(&"tracing"));

        let core = runtime_dependencies(include_str!("../../relayroom-core/Cargo.toml"));
        assert!(core.contains(&"serde"));
        assert!(!core.contains(&"serde_json"));
    }
}
