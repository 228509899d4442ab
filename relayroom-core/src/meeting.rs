//! Meeting SDK collaborator abstractions
//!
//! The vendor SDK owns signaling, media and the participant roster. This
//! module describes the surface relayroom drives: a [`MeetingHandle`] that
//! accepts commands, a channel of [`MeetingEvent`] lifecycle callbacks, and a
//! [`MeetingProvider`] that opens a handle for a given room.

use crate::{LivestreamOutput, RelayRoomError, Roster};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Opaque room identifier issued by the provisioning endpoint
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wrap a room id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is blank
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Session state of the controller bound to a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Not in the meeting
    NotJoined,
    /// Join requested, waiting for confirmation
    Joining,
    /// Join confirmed by the SDK
    Joined,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::NotJoined => "NOT_JOINED",
            SessionState::Joining => "JOINING",
            SessionState::Joined => "JOINED",
        };
        f.write_str(name)
    }
}

/// Settings handed to the SDK when a meeting handle is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingConfig {
    /// Display name of the local participant
    pub display_name: String,
    /// Start with the microphone on
    pub mic_enabled: bool,
    /// Start with the webcam on
    pub webcam_enabled: bool,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            display_name: "Guest".to_string(),
            mic_enabled: true,
            webcam_enabled: true,
        }
    }
}

/// Lifecycle callbacks emitted by the SDK for one meeting handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingEvent {
    /// `onMeetingJoined`
    Joined,
    /// `onMeetingLeft`
    Left,
    /// `onError`
    Error {
        /// SDK error code
        code: u32,
        /// SDK error message
        message: String,
    },
    /// A participant entered the roster
    ParticipantJoined {
        /// Participant id
        participant_id: crate::ParticipantId,
    },
    /// A participant left the roster
    ParticipantLeft {
        /// Participant id
        participant_id: crate::ParticipantId,
    },
    /// Local microphone state changed
    LocalMicChanged {
        /// New state
        on: bool,
    },
    /// Local webcam state changed
    LocalWebcamChanged {
        /// New state
        on: bool,
    },
    /// The SDK reports the livestream is running
    LivestreamStarted,
    /// The SDK reports the livestream ended
    LivestreamStopped,
}

impl MeetingEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            MeetingEvent::Joined => "meeting_joined",
            MeetingEvent::Left => "meeting_left",
            MeetingEvent::Error { .. } => "error",
            MeetingEvent::ParticipantJoined { .. } => "participant_joined",
            MeetingEvent::ParticipantLeft { .. } => "participant_left",
            MeetingEvent::LocalMicChanged { .. } => "local_mic_changed",
            MeetingEvent::LocalWebcamChanged { .. } => "local_webcam_changed",
            MeetingEvent::LivestreamStarted => "livestream_started",
            MeetingEvent::LivestreamStopped => "livestream_stopped",
        }
    }

    /// Whether the event changes the roster
    pub fn is_roster_event(&self) -> bool {
        matches!(
            self,
            MeetingEvent::ParticipantJoined { .. }
                | MeetingEvent::ParticipantLeft { .. }
                | MeetingEvent::LocalMicChanged { .. }
                | MeetingEvent::LocalWebcamChanged { .. }
        )
    }
}

/// Command surface of one SDK meeting handle.
///
/// Commands resolve when the SDK accepts them; completion of `join` and
/// `leave` is reported separately through [`MeetingEvent`]s.
#[async_trait]
pub trait MeetingHandle: Send + Sync + fmt::Debug {
    /// Room this handle is bound to
    fn room_id(&self) -> &RoomId;

    /// Request to join the meeting
    async fn join(&self) -> Result<(), RelayRoomError>;

    /// Request to leave the meeting
    async fn leave(&self) -> Result<(), RelayRoomError>;

    /// Flip the local microphone
    async fn toggle_mic(&self) -> Result<(), RelayRoomError>;

    /// Flip the local webcam
    async fn toggle_webcam(&self) -> Result<(), RelayRoomError>;

    /// Start republishing local media to the given outputs
    async fn start_livestream(&self, outputs: &[LivestreamOutput]) -> Result<(), RelayRoomError>;

    /// Stop the livestream
    async fn stop_livestream(&self) -> Result<(), RelayRoomError>;

    /// Current roster snapshot
    fn participants(&self) -> Roster;

    /// Local microphone state
    fn local_mic_on(&self) -> bool;

    /// Local webcam state
    fn local_webcam_on(&self) -> bool;
}

/// A freshly opened meeting: the handle plus its callback channel
#[derive(Debug)]
pub struct MeetingSession {
    /// Command handle
    pub handle: Box<dyn MeetingHandle>,
    /// Lifecycle callbacks for this handle
    pub events: mpsc::UnboundedReceiver<MeetingEvent>,
}

/// Opens meeting handles; the Rust counterpart of the SDK's meeting provider
pub trait MeetingProvider: Send + Sync + fmt::Debug {
    /// Open a handle bound to `room_id`
    fn open(&self, room_id: &RoomId, config: &MeetingConfig)
        -> Result<MeetingSession, RelayRoomError>;
}
