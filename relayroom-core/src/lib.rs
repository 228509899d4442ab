//! # relayroom core
//!
//! Shared vocabulary for the relayroom crates: room identifiers, the meeting
//! SDK collaborator traits, the participant roster, relay destinations and
//! the common error type.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod meeting;
pub mod relay;
pub mod roster;
pub mod sim;

// Re-export main types
pub use error::RelayRoomError;
pub use meeting::{
    MeetingConfig, MeetingEvent, MeetingHandle, MeetingProvider, MeetingSession, RoomId,
    SessionState,
};
pub use relay::{relay_output, LivestreamOutput, RELAY_APP};
pub use roster::{MediaTrack, ParticipantId, ParticipantInfo, Roster, TrackKind};
pub use sim::{SimCommand, SimulatedMeeting, SimulatedProbe, SimulatedProvider};
