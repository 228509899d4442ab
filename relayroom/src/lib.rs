//! # relayroom - Two-room meetings with livestream relay
//!
//! relayroom drives a video meeting SDK for a two-room demo: provision two
//! rooms, join one of them, toggle local media, relay the session into the
//! other room over RTMP, and switch between the rooms without ever holding
//! two live meeting handles.
//!
//! ## Key Features
//!
//! - **Room provisioning**: create rooms through the vendor REST API
//! - **Session control**: join, leave, debounced mic/webcam toggles
//! - **Relay**: publish into the other room via `rtmp://<host>/live/<room>`
//! - **Room switching**: ordered teardown with a settle step before rebinding
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relayroom::{RelayRoom, SimulatedProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relayroom = RelayRoom::init()?;
//!     let client = relayroom.rooms_client()?;
//!
//!     let mut switcher = relayroom.switcher(Arc::new(SimulatedProvider::new()));
//!     switcher.provision(&client).await?;
//!
//!     if let Some(session) = switcher.session_mut() {
//!         session.join().await?;
//!     }
//!     switcher.start_relay().await?;
//!     switcher.switch_room().await?;
//!     switcher.leave_all().await?;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use relayroom_core::{
    relay_output, LivestreamOutput, MediaTrack, MeetingConfig, MeetingEvent, MeetingHandle,
    MeetingProvider, MeetingSession, ParticipantId, ParticipantInfo, RelayRoomError, RoomId,
    Roster, SessionState, SimCommand, SimulatedMeeting, SimulatedProbe, SimulatedProvider,
    TrackKind, RELAY_APP,
};

pub use relayroom_provision::{
    generate_token, Permission, ProvisionConfig, RoomsClient, TokenClaims, DEFAULT_API_BASE,
};

#[cfg(feature = "diagnostics")]
pub use relayroom_diagnostics::{DebugLogger, SessionSnapshot};

// Public API modules
pub mod config;
pub mod event;
pub mod participant;
pub mod session;
pub mod switch;

// Re-export main API types
pub use config::{CredentialSource, GlobalConfig, RoomConfig, SettlePolicy};
pub use event::{EventFilter, EventHandler, EventStream, FilteredEventStream, SessionEvent};
pub use participant::{render, render_into, AudioSink, MediaSurface, ParticipantView, VideoSink};
pub use session::{MediaDevice, SessionBuilder, SessionController};
pub use switch::{RoomPair, RoomSlot, RoomSwitcher, SwitchPhase};

use std::sync::Arc;

/// Main entry point for relayroom
#[derive(Debug, Clone)]
pub struct RelayRoom {
    inner: Arc<RelayRoomInner>,
}

#[derive(Debug)]
struct RelayRoomInner {
    config: GlobalConfig,
}

impl RelayRoom {
    /// Initialize from `RELAYROOM_*` environment variables
    ///
    /// # Example
    /// ```rust,no_run
    /// use relayroom::RelayRoom;
    ///
    /// let relayroom = RelayRoom::init()?;
    /// # Ok::<(), relayroom::RelayRoomError>(())
    /// ```
    pub fn init() -> Result<Self, RelayRoomError> {
        Self::init_with(GlobalConfig::from_env()?)
    }

    /// Initialize with explicit configuration
    pub fn init_with(config: GlobalConfig) -> Result<Self, RelayRoomError> {
        #[cfg(feature = "diagnostics")]
        {
            if config.debug_logging {
                if let Err(e) = DebugLogger::init_logging(true) {
                    tracing::debug!("Logging already initialized: {}", e);
                }
            }
        }

        Ok(Self {
            inner: Arc::new(RelayRoomInner { config }),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    /// Provisioning client built from the configured credential
    pub fn rooms_client(&self) -> Result<RoomsClient, RelayRoomError> {
        RoomsClient::new(&self.inner.config.provision_config()?)
    }

    /// Session builder for `room_id` using `provider`
    ///
    /// # Example
    /// ```rust,no_run
    /// use relayroom::{GlobalConfig, RelayRoom, SimulatedProvider};
    ///
    /// # async fn example() -> Result<(), relayroom::RelayRoomError> {
    /// let relayroom = RelayRoom::init_with(GlobalConfig::default())?;
    /// let provider = SimulatedProvider::new();
    /// let mut session = relayroom
    ///     .session(&provider, "abcd-efgh-ijkl")
    ///     .display_name("C.V. Raman")
    ///     .open()?;
    /// session.join().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn session<'a>(
        &self,
        provider: &'a dyn MeetingProvider,
        room_id: impl Into<RoomId>,
    ) -> SessionBuilder<'a> {
        SessionBuilder::new(provider, room_id.into(), self.inner.config.room.clone())
    }

    /// Room switcher for the two-room flow
    pub fn switcher(&self, provider: Arc<dyn MeetingProvider>) -> RoomSwitcher {
        RoomSwitcher::new(provider, self.inner.config.room.clone())
    }
}
