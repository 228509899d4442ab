//! Session controller bound to one room's meeting handle
//!
//! The controller owns the SDK handle for its room and is the only place
//! commands are issued against it. Lifecycle callbacks from the SDK arrive on
//! a channel and are applied with [`SessionController::handle_event`]; every
//! command drains pending callbacks first so state is applied in order.

use crate::event::{EventStream, SessionEvent, Subscribers};
use crate::participant::{render, ParticipantView};
use crate::RoomConfig;
use relayroom_core::{
    relay_output, LivestreamOutput, MeetingEvent, MeetingHandle, MeetingProvider, MeetingSession,
    RelayRoomError, RoomId, Roster, SessionState,
};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Local capture device a toggle applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDevice {
    /// Microphone
    Microphone,
    /// Webcam
    Webcam,
}

impl MediaDevice {
    fn operation(&self) -> &'static str {
        match self {
            MediaDevice::Microphone => "toggle_mic",
            MediaDevice::Webcam => "toggle_webcam",
        }
    }
}

impl fmt::Display for MediaDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaDevice::Microphone => f.write_str("mic"),
            MediaDevice::Webcam => f.write_str("webcam"),
        }
    }
}

/// In-flight flag for one toggle control.
///
/// Set while the command is outstanding and for a grace window after it
/// settles; the SDK gives no signal for device settling.
#[derive(Debug, Default, Clone, Copy)]
struct ToggleGuard {
    in_flight: bool,
    settles_at: Option<Instant>,
}

impl ToggleGuard {
    fn is_busy(&self) -> bool {
        self.in_flight || self.settles_at.is_some_and(|at| Instant::now() < at)
    }

    /// Mark the command outstanding until the returned marker is dropped
    fn begin(&mut self, grace: Duration) -> InFlight<'_> {
        self.in_flight = true;
        self.settles_at = None;
        InFlight { guard: self, grace }
    }

    fn settle(&mut self, grace: Duration) {
        self.in_flight = false;
        self.settles_at = Some(Instant::now() + grace);
    }
}

/// Outstanding toggle; starts the grace window when dropped, including when
/// the caller abandons the command future
struct InFlight<'a> {
    guard: &'a mut ToggleGuard,
    grace: Duration,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.guard.settle(self.grace);
    }
}

/// Fluent builder that opens a meeting handle and binds a controller to it
#[derive(Debug)]
pub struct SessionBuilder<'a> {
    provider: &'a dyn MeetingProvider,
    room_id: RoomId,
    config: RoomConfig,
}

impl<'a> SessionBuilder<'a> {
    pub(crate) fn new(provider: &'a dyn MeetingProvider, room_id: RoomId, config: RoomConfig) -> Self {
        Self {
            provider,
            room_id,
            config,
        }
    }

    /// Set the local display name
    pub fn display_name(mut self, name: &str) -> Self {
        self.config.display_name = name.to_string();
        self
    }

    /// Join with the microphone on or off
    pub fn mic_enabled(mut self, enabled: bool) -> Self {
        self.config.mic_enabled = enabled;
        self
    }

    /// Join with the webcam on or off
    pub fn webcam_enabled(mut self, enabled: bool) -> Self {
        self.config.webcam_enabled = enabled;
        self
    }

    /// Set the RTMP relay host
    pub fn relay_host(mut self, host: &str) -> Self {
        self.config.relay_host = host.to_string();
        self
    }

    /// Set the toggle grace window
    pub fn toggle_grace(mut self, grace: Duration) -> Self {
        self.config.toggle_grace = grace;
        self
    }

    /// Open the meeting handle and bind a controller to it
    pub fn open(self) -> Result<SessionController, RelayRoomError> {
        SessionController::open(self.provider, self.room_id, self.config)
    }
}

/// Per-room session state holder
#[derive(Debug)]
pub struct SessionController {
    room_id: RoomId,
    handle: Option<Box<dyn MeetingHandle>>,
    meeting_events: Option<mpsc::UnboundedReceiver<MeetingEvent>>,
    state: SessionState,
    relay_active: bool,
    relay_target: Option<RoomId>,
    left_acknowledged: bool,
    mic_guard: ToggleGuard,
    webcam_guard: ToggleGuard,
    config: RoomConfig,
    subscribers: Subscribers,
}

impl SessionController {
    /// Open a handle for `room_id` through `provider` and bind to it
    pub fn open(
        provider: &dyn MeetingProvider,
        room_id: RoomId,
        config: RoomConfig,
    ) -> Result<Self, RelayRoomError> {
        if room_id.is_empty() {
            return Err(RelayRoomError::NoActiveSession);
        }
        let session = provider.open(&room_id, &config.meeting_config())?;
        Ok(Self::bind(room_id, session, config))
    }

    /// Bind to an already opened meeting
    pub fn bind(room_id: RoomId, session: MeetingSession, config: RoomConfig) -> Self {
        info!("🔗 Binding session to room {}", room_id);
        Self {
            room_id,
            handle: Some(session.handle),
            meeting_events: Some(session.events),
            state: SessionState::NotJoined,
            relay_active: false,
            relay_target: None,
            left_acknowledged: false,
            mic_guard: ToggleGuard::default(),
            webcam_guard: ToggleGuard::default(),
            config,
            subscribers: Subscribers::default(),
        }
    }

    /// Room this controller is bound to
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the join has been confirmed
    pub fn is_joined(&self) -> bool {
        self.state == SessionState::Joined
    }

    /// Whether an SDK handle is bound
    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether a relay is believed active
    pub fn is_relay_active(&self) -> bool {
        self.relay_active
    }

    /// Room the active relay publishes into
    pub fn relay_target(&self) -> Option<&RoomId> {
        self.relay_target.as_ref()
    }

    /// Whether a mic toggle is in flight
    pub fn is_toggling_mic(&self) -> bool {
        self.mic_guard.is_busy()
    }

    /// Whether a webcam toggle is in flight
    pub fn is_toggling_webcam(&self) -> bool {
        self.webcam_guard.is_busy()
    }

    /// Local microphone state reported by the SDK
    pub fn local_mic_on(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.local_mic_on())
    }

    /// Local webcam state reported by the SDK
    pub fn local_webcam_on(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.local_webcam_on())
    }

    /// Roster snapshot; empty when unbound
    pub fn participants(&self) -> Roster {
        self.handle
            .as_ref()
            .map(|h| h.participants())
            .unwrap_or_default()
    }

    /// Views for every participant currently in the roster
    pub fn views(&self) -> Vec<ParticipantView> {
        render(&self.participants())
    }

    /// Subscribe to this controller's notifications
    pub fn events(&mut self) -> EventStream {
        self.subscribers.subscribe()
    }

    pub(crate) fn attach(&mut self, sender: mpsc::UnboundedSender<SessionEvent>) {
        self.subscribers.attach(sender);
    }

    /// Request to join.
    ///
    /// The state moves to `Joining` at once and to `Joined` only when the SDK
    /// confirms through its callback. Calls made while `Joining` or `Joined`
    /// return `Ok(())` without contacting the SDK; if the confirmation never
    /// arrives, [`leave`](Self::leave) is the way back to `NotJoined`.
    pub async fn join(&mut self) -> Result<(), RelayRoomError> {
        self.poll_events();
        if self.state != SessionState::NotJoined {
            debug!("Room {} already {}; join ignored", self.room_id, self.state);
            return Ok(());
        }
        if self.handle.is_none() {
            return Err(RelayRoomError::NoActiveSession);
        }

        self.left_acknowledged = false;
        self.set_state(SessionState::Joining);
        let result = match self.handle.as_deref() {
            Some(handle) => handle.join().await,
            None => Err(RelayRoomError::NoActiveSession),
        };

        match result {
            Ok(()) => {
                self.poll_events();
                Ok(())
            }
            Err(e) => {
                error!("❌ Join failed for room {}: {}", self.room_id, e);
                self.set_state(SessionState::NotJoined);
                self.notice(format!("Failed to join: {}", e));
                Err(e)
            }
        }
    }

    /// Leave the meeting.
    ///
    /// An active relay is stopped first on a best-effort basis. Relay state is
    /// false when this returns, whatever the outcome.
    pub async fn leave(&mut self) -> Result<(), RelayRoomError> {
        self.poll_events();
        if self.relay_active {
            if let Err(e) = self.stop_relay().await {
                warn!(
                    "⚠️ Relay stop failed while leaving room {}: {}",
                    self.room_id, e
                );
            }
        }
        self.clear_relay();

        let Some(handle) = self.handle.as_deref() else {
            self.set_state(SessionState::NotJoined);
            return Ok(());
        };

        let result = handle.leave().await;
        match result {
            Ok(()) => {
                info!("👋 Left room {}", self.room_id);
                self.set_state(SessionState::NotJoined);
                self.poll_events();
                Ok(())
            }
            Err(e) => {
                error!("❌ Leave failed for room {}: {}", self.room_id, e);
                self.notice(format!("Failed to leave: {}", e));
                Err(e)
            }
        }
    }

    /// Flip the microphone; `Ok(false)` when a toggle is already in flight
    pub async fn toggle_mic(&mut self) -> Result<bool, RelayRoomError> {
        self.toggle(MediaDevice::Microphone).await
    }

    /// Flip the webcam; `Ok(false)` when a toggle is already in flight
    pub async fn toggle_webcam(&mut self) -> Result<bool, RelayRoomError> {
        self.toggle(MediaDevice::Webcam).await
    }

    async fn toggle(&mut self, device: MediaDevice) -> Result<bool, RelayRoomError> {
        self.poll_events();

        let guard = match device {
            MediaDevice::Microphone => &mut self.mic_guard,
            MediaDevice::Webcam => &mut self.webcam_guard,
        };
        if guard.is_busy() {
            debug!("{} toggle in flight for room {}; ignored", device, self.room_id);
            return Ok(false);
        }
        let handle = self
            .handle
            .as_deref()
            .ok_or(RelayRoomError::NoActiveSession)?;

        let in_flight = guard.begin(self.config.toggle_grace);
        let result = match device {
            MediaDevice::Microphone => handle.toggle_mic().await,
            MediaDevice::Webcam => handle.toggle_webcam().await,
        };
        drop(in_flight);

        match result {
            Ok(()) => {
                debug!("{} toggled in room {}", device, self.room_id);
                self.poll_events();
                Ok(true)
            }
            Err(e) => {
                error!("❌ {} failed for room {}: {}", device.operation(), self.room_id, e);
                self.notice(format!("Failed to toggle {}: {}", device, e));
                Err(e)
            }
        }
    }

    /// Relay local media into `target` through the SDK livestream.
    ///
    /// The output URL is `rtmp://<relay-host>/live/<target>` with the target
    /// room id as stream key.
    pub async fn start_relay(&mut self, target: &RoomId) -> Result<LivestreamOutput, RelayRoomError> {
        self.poll_events();
        let handle = self
            .handle
            .as_deref()
            .ok_or(RelayRoomError::NoActiveSession)?;
        if target.is_empty() {
            return Err(RelayRoomError::NoActiveSession);
        }

        let output = relay_output(&self.config.relay_host, target);
        info!("📡 Relaying room {} to {}", self.room_id, output.url);
        let result = handle.start_livestream(std::slice::from_ref(&output)).await;

        match result {
            Ok(()) => {
                self.relay_active = true;
                self.relay_target = Some(target.clone());
                self.subscribers.publish(SessionEvent::RelayChanged {
                    room_id: self.room_id.clone(),
                    active: true,
                    target: Some(target.clone()),
                });
                Ok(output)
            }
            Err(e) => {
                error!("❌ Relay start failed for room {}: {}", self.room_id, e);
                self.clear_relay();
                self.notice(format!("Failed to start relay: {}", e));
                Err(e)
            }
        }
    }

    /// Stop the relay; relay state is cleared whether or not the SDK call succeeds
    pub async fn stop_relay(&mut self) -> Result<(), RelayRoomError> {
        let result = match self.handle.as_deref() {
            Some(handle) => handle.stop_livestream().await,
            None => Err(RelayRoomError::NoActiveSession),
        };
        self.clear_relay();

        if let Err(e) = &result {
            error!("❌ Relay stop failed for room {}: {}", self.room_id, e);
            self.notice(format!("Failed to stop relay: {}", e));
        }
        result
    }

    /// Apply one SDK lifecycle callback
    pub fn handle_event(&mut self, event: MeetingEvent) {
        debug!("Room {} received {}", self.room_id, event.event_type());
        match event {
            MeetingEvent::Joined => {
                if self.state == SessionState::Joining {
                    info!("✅ Joined room {}", self.room_id);
                    self.set_state(SessionState::Joined);
                } else {
                    debug!(
                        "Ignoring join confirmation for room {} while {}",
                        self.room_id, self.state
                    );
                }
            }
            MeetingEvent::Left => {
                self.left_acknowledged = true;
                self.clear_relay();
                self.set_state(SessionState::NotJoined);
            }
            MeetingEvent::Error { code, message } => {
                warn!("⚠️ Meeting error {} in room {}: {}", code, self.room_id, message);
                if self.state == SessionState::Joining {
                    self.set_state(SessionState::NotJoined);
                }
                self.notice(format!("Meeting error {}: {}", code, message));
            }
            MeetingEvent::LivestreamStopped => {
                if self.relay_active {
                    info!("Relay for room {} ended by the SDK", self.room_id);
                    self.clear_relay();
                }
            }
            MeetingEvent::LivestreamStarted => {}
            MeetingEvent::ParticipantJoined { .. }
            | MeetingEvent::ParticipantLeft { .. }
            | MeetingEvent::LocalMicChanged { .. }
            | MeetingEvent::LocalWebcamChanged { .. } => {
                self.subscribers.publish(SessionEvent::ParticipantsChanged {
                    room_id: self.room_id.clone(),
                });
            }
        }
    }

    /// Apply every callback already queued; returns how many were applied
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self
            .meeting_events
            .as_mut()
            .and_then(|rx| rx.try_recv().ok())
        {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next callback, apply it and return it
    pub async fn next_event(&mut self) -> Option<MeetingEvent> {
        let event = self.meeting_events.as_mut()?.recv().await?;
        self.handle_event(event.clone());
        Some(event)
    }

    /// Wait until the SDK confirms the join
    pub async fn wait_until_joined(&mut self, timeout: Duration) -> Result<(), RelayRoomError> {
        self.poll_events();
        match self.state {
            SessionState::Joined => return Ok(()),
            SessionState::NotJoined => {
                return Err(RelayRoomError::InvalidState {
                    expected: SessionState::Joining.to_string(),
                    actual: self.state.to_string(),
                })
            }
            SessionState::Joining => {}
        }

        let waited = tokio::time::timeout(timeout, async {
            while self.state == SessionState::Joining {
                if self.next_event().await.is_none() {
                    return Err(RelayRoomError::NoActiveSession);
                }
            }
            match self.state {
                SessionState::Joined => Ok(()),
                other => Err(RelayRoomError::InvalidState {
                    expected: SessionState::Joined.to_string(),
                    actual: other.to_string(),
                }),
            }
        })
        .await;

        waited.unwrap_or_else(|_| {
            Err(RelayRoomError::Timeout {
                operation: "join".to_string(),
                duration: timeout,
            })
        })
    }

    /// Wait for the SDK's left callback; false if it did not arrive in time
    pub async fn wait_until_left(&mut self, timeout: Duration) -> bool {
        self.poll_events();
        if self.left_acknowledged {
            return true;
        }

        tokio::time::timeout(timeout, async {
            while !self.left_acknowledged {
                if self.next_event().await.is_none() {
                    return false;
                }
            }
            true
        })
        .await
        .unwrap_or(false)
    }

    /// Unbind and hand back the SDK handle; the controller becomes inert
    pub fn release(&mut self) -> Option<Box<dyn MeetingHandle>> {
        self.poll_events();
        self.meeting_events = None;
        self.clear_relay();
        self.set_state(SessionState::NotJoined);
        self.mic_guard = ToggleGuard::default();
        self.webcam_guard = ToggleGuard::default();
        let handle = self.handle.take();
        if handle.is_some() {
            debug!("Released meeting handle for room {}", self.room_id);
        }
        handle
    }

    /// Point-in-time view for logging or display
    #[cfg(feature = "diagnostics")]
    pub fn snapshot(&self) -> relayroom_diagnostics::SessionSnapshot {
        relayroom_diagnostics::SessionSnapshot {
            taken_at: chrono::Utc::now(),
            room_id: self.room_id.clone(),
            handle_bound: self.is_bound(),
            state: self.state,
            relay_active: self.relay_active,
            relay_target: self.relay_target.clone(),
            toggling_mic: self.is_toggling_mic(),
            toggling_webcam: self.is_toggling_webcam(),
            mic_on: self.local_mic_on(),
            webcam_on: self.local_webcam_on(),
            participant_count: self.participants().len(),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("🔄 Room {} state: {} -> {}", self.room_id, self.state, state);
            self.state = state;
            self.subscribers.publish(SessionEvent::StateChanged {
                room_id: self.room_id.clone(),
                state,
            });
        }
    }

    fn clear_relay(&mut self) {
        if self.relay_active {
            self.relay_active = false;
            self.relay_target = None;
            self.subscribers.publish(SessionEvent::RelayChanged {
                room_id: self.room_id.clone(),
                active: false,
                target: None,
            });
        }
    }

    fn notice(&mut self, message: String) {
        self.subscribers.publish(SessionEvent::Notice {
            room_id: self.room_id.clone(),
            message,
        });
    }
}
