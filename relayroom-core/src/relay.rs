//! Livestream relay destinations

use crate::RoomId;
use serde::{Deserialize, Serialize};

/// Path prefix of the RTMP ingest application
pub const RELAY_APP: &str = "live";

/// One livestream output handed to the SDK's `start_livestream`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivestreamOutput {
    /// RTMP ingest URL
    pub url: String,
    /// Stream key
    pub stream_key: String,
}

/// Derive the relay output that republishes into `target`.
///
/// The target room id is both the last path segment and the stream key.
pub fn relay_output(relay_host: &str, target: &RoomId) -> LivestreamOutput {
    let host = relay_host
        .trim_start_matches("rtmp://")
        .trim_end_matches('/');

    LivestreamOutput {
        url: format!("rtmp://{}/{}/{}", host, RELAY_APP, target),
        stream_key: target.to_string(),
    }
}
