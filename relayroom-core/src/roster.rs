//! Participant roster as reported by the meeting SDK

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a participant inside one meeting
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wrap a participant id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Microphone audio
    Audio,
    /// Webcam video
    Video,
}

/// Opaque reference to an SDK-owned media track
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaTrack {
    /// SDK track id
    pub id: String,
    /// Track kind
    pub kind: TrackKind,
}

impl MediaTrack {
    /// Audio track with the given id
    pub fn audio(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TrackKind::Audio,
        }
    }

    /// Video track with the given id
    pub fn video(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: TrackKind::Video,
        }
    }
}

/// One roster entry: a participant and its media capability flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    /// Participant id
    pub id: ParticipantId,
    /// Display name chosen by the participant
    pub display_name: String,
    /// Whether this entry is the caller's own participant
    pub is_local: bool,
    /// Microphone on
    pub mic_on: bool,
    /// Webcam on
    pub webcam_on: bool,
    /// Microphone track, when the SDK has one
    pub mic_track: Option<MediaTrack>,
    /// Webcam track, when the SDK has one
    pub webcam_track: Option<MediaTrack>,
}

impl ParticipantInfo {
    /// Participant with media off and no tracks
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            display_name: display_name.into(),
            is_local: false,
            mic_on: false,
            webcam_on: false,
            mic_track: None,
            webcam_track: None,
        }
    }

    /// Mark as the local participant
    pub fn local(mut self) -> Self {
        self.is_local = true;
        self
    }

    /// Turn the microphone on with a track
    pub fn with_mic(mut self, track: MediaTrack) -> Self {
        self.mic_on = true;
        self.mic_track = Some(track);
        self
    }

    /// Turn the webcam on with a track
    pub fn with_webcam(mut self, track: MediaTrack) -> Self {
        self.webcam_on = true;
        self.webcam_track = Some(track);
        self
    }
}

/// Snapshot of the live participant set, ordered by participant id
pub type Roster = BTreeMap<ParticipantId, ParticipantInfo>;
