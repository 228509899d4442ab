//! Point-in-time view of a session controller

use chrono::{DateTime, Utc};
use relayroom_core::{RoomId, SessionState};
use serde::{Deserialize, Serialize};

/// Session controller state captured for logging or display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Room the controller is bound to
    pub room_id: RoomId,
    /// Whether an SDK handle is bound
    pub handle_bound: bool,
    /// Session state
    pub state: SessionState,
    /// Whether a relay is believed active
    pub relay_active: bool,
    /// Relay target, when active
    pub relay_target: Option<RoomId>,
    /// Mic toggle guard set
    pub toggling_mic: bool,
    /// Webcam toggle guard set
    pub toggling_webcam: bool,
    /// Local microphone on
    pub mic_on: bool,
    /// Local webcam on
    pub webcam_on: bool,
    /// Roster size
    pub participant_count: usize,
}

impl SessionSnapshot {
    /// One-line human summary
    pub fn summary(&self) -> String {
        let relay = match (&self.relay_target, self.relay_active) {
            (Some(target), true) => format!("relay->{}", target),
            _ => "relay off".to_string(),
        };
        format!(
            "room {} [{}] {} | mic {} | cam {} | {} participant(s)",
            self.room_id,
            self.state,
            relay,
            on_off(self.mic_on),
            on_off(self.webcam_on),
            self.participant_count
        )
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}
