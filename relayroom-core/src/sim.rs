//! In-process simulated meeting SDK
//!
//! Stands in for the vendor SDK in demos and tests. Every command is counted,
//! any command can be made to fail, and join/leave acknowledgements can be
//! switched off to exercise the timer-based settling paths.

use crate::{
    LivestreamOutput, MediaTrack, MeetingConfig, MeetingEvent, MeetingHandle, MeetingProvider,
    MeetingSession, ParticipantId, ParticipantInfo, RelayRoomError, RoomId, Roster,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Commands understood by a meeting handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimCommand {
    /// `join`
    Join,
    /// `leave`
    Leave,
    /// `toggle_mic`
    ToggleMic,
    /// `toggle_webcam`
    ToggleWebcam,
    /// `start_livestream`
    StartLivestream,
    /// `stop_livestream`
    StopLivestream,
}

impl SimCommand {
    /// Operation name used in errors
    pub fn name(&self) -> &'static str {
        match self {
            SimCommand::Join => "join",
            SimCommand::Leave => "leave",
            SimCommand::ToggleMic => "toggle_mic",
            SimCommand::ToggleWebcam => "toggle_webcam",
            SimCommand::StartLivestream => "start_livestream",
            SimCommand::StopLivestream => "stop_livestream",
        }
    }
}

#[derive(Debug)]
struct MeetingState {
    room_id: RoomId,
    local: ParticipantInfo,
    joined: bool,
    livestream: Option<Vec<LivestreamOutput>>,
    remotes: Roster,
    calls: HashMap<SimCommand, usize>,
    failures: HashSet<SimCommand>,
    acknowledge: bool,
    released: bool,
    events: mpsc::UnboundedSender<MeetingEvent>,
}

impl MeetingState {
    fn emit(&self, event: MeetingEvent) {
        // Receiver gone means the controller was dropped
        let _ = self.events.send(event);
    }

    fn record(&mut self, command: SimCommand) -> Result<(), RelayRoomError> {
        *self.calls.entry(command).or_insert(0) += 1;
        if self.failures.contains(&command) {
            debug!("simulated {} failure in room {}", command.name(), self.room_id);
            return Err(RelayRoomError::sdk(command.name(), "simulated failure"));
        }
        Ok(())
    }
}

/// Inspection and fault-injection view of one simulated meeting
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    state: Arc<Mutex<MeetingState>>,
}

impl SimulatedProbe {
    /// Room the meeting was opened for
    pub fn room_id(&self) -> RoomId {
        self.state.lock().room_id.clone()
    }

    /// How many times `command` was issued
    pub fn calls(&self, command: SimCommand) -> usize {
        self.state.lock().calls.get(&command).copied().unwrap_or(0)
    }

    /// Whether the SDK side considers the local participant joined
    pub fn is_joined(&self) -> bool {
        self.state.lock().joined
    }

    /// Outputs of the running livestream, if any
    pub fn livestream(&self) -> Option<Vec<LivestreamOutput>> {
        self.state.lock().livestream.clone()
    }

    /// Whether the handle has been dropped by its owner
    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    /// Make `command` fail from now on
    pub fn fail(&self, command: SimCommand) {
        self.state.lock().failures.insert(command);
    }

    /// Make `command` succeed again
    pub fn succeed(&self, command: SimCommand) {
        self.state.lock().failures.remove(&command);
    }

    /// Add a remote participant to the roster
    pub fn add_remote(&self, participant: ParticipantInfo) {
        let mut state = self.state.lock();
        let participant_id = participant.id.clone();
        state.remotes.insert(participant_id.clone(), participant);
        state.emit(MeetingEvent::ParticipantJoined { participant_id });
    }

    /// Remove a remote participant from the roster
    pub fn remove_remote(&self, participant_id: &ParticipantId) {
        let mut state = self.state.lock();
        if state.remotes.remove(participant_id).is_some() {
            state.emit(MeetingEvent::ParticipantLeft {
                participant_id: participant_id.clone(),
            });
        }
    }

    /// Deliver an arbitrary callback, e.g. a late `Joined` or an `Error`
    pub fn emit(&self, event: MeetingEvent) {
        self.state.lock().emit(event);
    }
}

/// Simulated meeting handle
#[derive(Debug)]
pub struct SimulatedMeeting {
    room_id: RoomId,
    state: Arc<Mutex<MeetingState>>,
}

impl Drop for SimulatedMeeting {
    fn drop(&mut self) {
        self.state.lock().released = true;
    }
}

#[async_trait]
impl MeetingHandle for SimulatedMeeting {
    fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    async fn join(&self) -> Result<(), RelayRoomError> {
        let mut state = self.state.lock();
        state.record(SimCommand::Join)?;
        state.joined = true;
        if state.acknowledge {
            state.emit(MeetingEvent::Joined);
        }
        Ok(())
    }

    async fn leave(&self) -> Result<(), RelayRoomError> {
        let mut state = self.state.lock();
        state.record(SimCommand::Leave)?;
        state.joined = false;
        state.livestream = None;
        if state.acknowledge {
            state.emit(MeetingEvent::Left);
        }
        Ok(())
    }

    async fn toggle_mic(&self) -> Result<(), RelayRoomError> {
        let mut state = self.state.lock();
        state.record(SimCommand::ToggleMic)?;
        let on = !state.local.mic_on;
        state.local.mic_on = on;
        let track = on.then(|| MediaTrack::audio(format!("{}-mic", state.local.id)));
        state.local.mic_track = track;
        state.emit(MeetingEvent::LocalMicChanged { on });
        Ok(())
    }

    async fn toggle_webcam(&self) -> Result<(), RelayRoomError> {
        let mut state = self.state.lock();
        state.record(SimCommand::ToggleWebcam)?;
        let on = !state.local.webcam_on;
        state.local.webcam_on = on;
        let track = on.then(|| MediaTrack::video(format!("{}-cam", state.local.id)));
        state.local.webcam_track = track;
        state.emit(MeetingEvent::LocalWebcamChanged { on });
        Ok(())
    }

    async fn start_livestream(&self, outputs: &[LivestreamOutput]) -> Result<(), RelayRoomError> {
        let mut state = self.state.lock();
        state.record(SimCommand::StartLivestream)?;
        state.livestream = Some(outputs.to_vec());
        state.emit(MeetingEvent::LivestreamStarted);
        Ok(())
    }

    async fn stop_livestream(&self) -> Result<(), RelayRoomError> {
        let mut state = self.state.lock();
        state.record(SimCommand::StopLivestream)?;
        if state.livestream.take().is_some() {
            state.emit(MeetingEvent::LivestreamStopped);
        }
        Ok(())
    }

    fn participants(&self) -> Roster {
        let state = self.state.lock();
        let mut roster = state.remotes.clone();
        if state.joined {
            roster.insert(state.local.id.clone(), state.local.clone());
        }
        roster
    }

    fn local_mic_on(&self) -> bool {
        self.state.lock().local.mic_on
    }

    fn local_webcam_on(&self) -> bool {
        self.state.lock().local.webcam_on
    }
}

#[derive(Debug)]
struct ProviderState {
    opened: Vec<SimulatedProbe>,
    failures: HashSet<SimCommand>,
    acknowledge: bool,
}

/// Provider handing out [`SimulatedMeeting`]s
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    inner: Arc<Mutex<ProviderState>>,
}

impl SimulatedProvider {
    /// Provider whose meetings acknowledge join and leave
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProviderState {
                opened: Vec::new(),
                failures: HashSet::new(),
                acknowledge: true,
            })),
        }
    }

    /// Provider whose meetings never emit `Joined`/`Left` on their own
    pub fn without_acknowledgements() -> Self {
        let provider = Self::new();
        provider.inner.lock().acknowledge = false;
        provider
    }

    /// Make `command` fail on every meeting opened from now on
    pub fn fail_on(&self, command: SimCommand) {
        self.inner.lock().failures.insert(command);
    }

    /// Probes of every meeting opened so far, oldest first
    pub fn probes(&self) -> Vec<SimulatedProbe> {
        self.inner.lock().opened.clone()
    }

    /// Probe of the most recently opened meeting
    pub fn latest(&self) -> Option<SimulatedProbe> {
        self.inner.lock().opened.last().cloned()
    }

    /// Rooms opened so far, oldest first
    pub fn opened_rooms(&self) -> Vec<RoomId> {
        self.probes().iter().map(SimulatedProbe::room_id).collect()
    }

    /// Number of handles not yet dropped
    pub fn live_handles(&self) -> usize {
        self.probes().iter().filter(|p| !p.is_released()).count()
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MeetingProvider for SimulatedProvider {
    fn open(
        &self,
        room_id: &RoomId,
        config: &MeetingConfig,
    ) -> Result<MeetingSession, RelayRoomError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let local_id = uuid::Uuid::new_v4().to_string();

        let mut local = ParticipantInfo::new(local_id.clone(), config.display_name.clone()).local();
        if config.mic_enabled {
            local = local.with_mic(MediaTrack::audio(format!("{}-mic", local_id)));
        }
        if config.webcam_enabled {
            local = local.with_webcam(MediaTrack::video(format!("{}-cam", local_id)));
        }

        let mut provider = self.inner.lock();
        let state = Arc::new(Mutex::new(MeetingState {
            room_id: room_id.clone(),
            local,
            joined: false,
            livestream: None,
            remotes: Roster::new(),
            calls: HashMap::new(),
            failures: provider.failures.clone(),
            acknowledge: provider.acknowledge,
            released: false,
            events: tx,
        }));
        provider.opened.push(SimulatedProbe {
            state: Arc::clone(&state),
        });
        debug!("opened simulated meeting for room {}", room_id);

        Ok(MeetingSession {
            handle: Box::new(SimulatedMeeting {
                room_id: room_id.clone(),
                state,
            }),
            events: rx,
        })
    }
}
