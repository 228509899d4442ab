//! Two-room switching and relay orchestration
//!
//! The switcher holds the two provisioned rooms and at most one bound
//! [`SessionController`]. Switching tears the current session down (relay
//! first, then leave), waits for settlement, drops the old handle and only
//! then opens a handle for the other room, so two live handles never coexist.

use crate::config::{RoomConfig, SettlePolicy};
use crate::event::{EventStream, SessionEvent, Subscribers};
use crate::session::SessionController;
use relayroom_core::{LivestreamOutput, MeetingProvider, RelayRoomError, RoomId, SessionState};
use relayroom_provision::RoomsClient;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which of the two rooms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomSlot {
    /// First room
    A,
    /// Second room
    B,
}

impl RoomSlot {
    /// The other slot
    pub fn other(self) -> Self {
        match self {
            RoomSlot::A => RoomSlot::B,
            RoomSlot::B => RoomSlot::A,
        }
    }
}

impl fmt::Display for RoomSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomSlot::A => f.write_str("A"),
            RoomSlot::B => f.write_str("B"),
        }
    }
}

/// The two provisioned rooms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPair {
    /// Room A
    pub a: RoomId,
    /// Room B
    pub b: RoomId,
}

impl RoomPair {
    /// Room in `slot`
    pub fn get(&self, slot: RoomSlot) -> &RoomId {
        match slot {
            RoomSlot::A => &self.a,
            RoomSlot::B => &self.b,
        }
    }
}

/// Phase of the room switch state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchPhase {
    /// No switch has happened since rooms were bound
    Idle,
    /// Tearing down the current session
    Switching,
    /// A switch completed and the other room is bound
    Settled,
}

/// Application-level holder of the two rooms and the bound session
#[derive(Debug)]
pub struct RoomSwitcher {
    provider: Arc<dyn MeetingProvider>,
    config: RoomConfig,
    rooms: Option<RoomPair>,
    current: RoomSlot,
    phase: SwitchPhase,
    session: Option<SessionController>,
    subscribers: Subscribers,
}

impl RoomSwitcher {
    /// Switcher with no rooms bound
    pub fn new(provider: Arc<dyn MeetingProvider>, config: RoomConfig) -> Self {
        Self {
            provider,
            config,
            rooms: None,
            current: RoomSlot::A,
            phase: SwitchPhase::Idle,
            session: None,
            subscribers: Subscribers::default(),
        }
    }

    /// Provisioned rooms, if any
    pub fn rooms(&self) -> Option<&RoomPair> {
        self.rooms.as_ref()
    }

    /// Slot of the bound room
    pub fn current_slot(&self) -> RoomSlot {
        self.current
    }

    /// Identifier of the bound room
    pub fn current_room(&self) -> Option<&RoomId> {
        self.rooms.as_ref().map(|r| r.get(self.current))
    }

    /// Identifier of the room not currently bound
    pub fn other_room(&self) -> Option<&RoomId> {
        self.rooms.as_ref().map(|r| r.get(self.current.other()))
    }

    /// Switch phase
    pub fn phase(&self) -> SwitchPhase {
        self.phase
    }

    /// Bound session controller
    pub fn session(&self) -> Option<&SessionController> {
        self.session.as_ref()
    }

    /// Bound session controller, mutably
    pub fn session_mut(&mut self) -> Option<&mut SessionController> {
        self.session.as_mut()
    }

    /// Subscribe to switch events and to every session bound from now on
    pub fn events(&mut self) -> EventStream {
        let stream = self.subscribers.subscribe();
        if let (Some(session), Some(sender)) =
            (self.session.as_mut(), self.subscribers.senders().last())
        {
            session.attach(sender.clone());
        }
        stream
    }

    /// Create two fresh rooms and bind room A
    pub async fn provision(&mut self, client: &RoomsClient) -> Result<&RoomPair, RelayRoomError> {
        self.enter_rooms(client, None, None).await
    }

    /// Use the ids the user entered, creating any that are missing, and bind room A
    pub async fn enter_rooms(
        &mut self,
        client: &RoomsClient,
        room_a: Option<&str>,
        room_b: Option<&str>,
    ) -> Result<&RoomPair, RelayRoomError> {
        self.ensure_unbound()?;
        let a = client.resolve_room(room_a).await?;
        let b = client.resolve_room(room_b).await?;
        self.bind_rooms(a, b)
    }

    /// Bind an already known pair of rooms; the session opens on room A
    pub fn bind_rooms(&mut self, a: RoomId, b: RoomId) -> Result<&RoomPair, RelayRoomError> {
        self.ensure_unbound()?;
        if a.is_empty() || b.is_empty() {
            return Err(RelayRoomError::MissingConfiguration {
                field: "room id".to_string(),
            });
        }

        info!("🏠 Rooms bound: A={} B={}", a, b);
        let session = self.open_session(&a)?;
        self.session = Some(session);
        self.current = RoomSlot::A;
        self.set_phase(SwitchPhase::Idle);
        Ok(self.rooms.insert(RoomPair { a, b }))
    }

    /// Leave the current room and bind the other one.
    ///
    /// The new session is not joined automatically. Returns the id of the
    /// newly bound room.
    pub async fn switch_room(&mut self) -> Result<RoomId, RelayRoomError> {
        let rooms = self.rooms.clone().ok_or(RelayRoomError::NoActiveSession)?;
        let from = rooms.get(self.current).clone();
        let to = rooms.get(self.current.other()).clone();

        info!("🔀 Switching from room {} to room {}", from, to);
        self.set_phase(SwitchPhase::Switching);

        if let Some(mut session) = self.session.take() {
            session.poll_events();
            let was_active = session.state() != SessionState::NotJoined;
            if was_active || session.is_relay_active() {
                if let Err(e) = session.leave().await {
                    warn!("⚠️ Leave failed while switching from {}: {}", from, e);
                }
            }
            self.settle(&mut session, was_active).await;
            drop(session.release());
        }

        self.current = self.current.other();
        match self.open_session(&to) {
            Ok(session) => self.session = Some(session),
            Err(e) => {
                self.set_phase(SwitchPhase::Idle);
                return Err(e);
            }
        }

        self.set_phase(SwitchPhase::Settled);
        self.subscribers.publish(SessionEvent::RoomSwitched {
            from,
            to: to.clone(),
        });
        Ok(to)
    }

    /// Stop the relay, leave, and discard both rooms
    pub async fn leave_all(&mut self) -> Result<(), RelayRoomError> {
        let mut outcome = Ok(());
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.leave().await {
                warn!("⚠️ Leave failed while leaving all rooms: {}", e);
                outcome = Err(e);
            }
            drop(session.release());
        }

        self.rooms = None;
        self.current = RoomSlot::A;
        self.set_phase(SwitchPhase::Idle);
        self.subscribers.publish(SessionEvent::RoomsCleared);
        info!("🚪 Left all rooms");
        outcome
    }

    /// Relay the bound session into the other room
    pub async fn start_relay(&mut self) -> Result<LivestreamOutput, RelayRoomError> {
        let target = self
            .other_room()
            .cloned()
            .ok_or(RelayRoomError::NoActiveSession)?;
        let session = self
            .session
            .as_mut()
            .ok_or(RelayRoomError::NoActiveSession)?;
        session.start_relay(&target).await
    }

    /// Stop the bound session's relay
    pub async fn stop_relay(&mut self) -> Result<(), RelayRoomError> {
        let session = self
            .session
            .as_mut()
            .ok_or(RelayRoomError::NoActiveSession)?;
        session.stop_relay().await
    }

    async fn settle(&self, session: &mut SessionController, was_active: bool) {
        match self.config.settle_policy {
            SettlePolicy::FixedDelay(delay) => {
                debug!("Waiting {:?} for room {} to settle", delay, session.room_id());
                tokio::time::sleep(delay).await;
            }
            SettlePolicy::Acknowledged { timeout } => {
                if was_active && !session.wait_until_left(timeout).await {
                    warn!(
                        "⚠️ No left acknowledgement from room {} within {:?}",
                        session.room_id(),
                        timeout
                    );
                }
            }
        }
    }

    fn open_session(&mut self, room_id: &RoomId) -> Result<SessionController, RelayRoomError> {
        let mut session =
            SessionController::open(self.provider.as_ref(), room_id.clone(), self.config.clone())?;
        for sender in self.subscribers.senders() {
            session.attach(sender.clone());
        }
        Ok(session)
    }

    fn ensure_unbound(&self) -> Result<(), RelayRoomError> {
        if self.rooms.is_some() {
            return Err(RelayRoomError::InvalidState {
                expected: "no rooms bound".to_string(),
                actual: "rooms already bound".to_string(),
            });
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: SwitchPhase) {
        if self.phase != phase {
            debug!("Switch phase: {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
            self.subscribers
                .publish(SessionEvent::PhaseChanged { phase });
        }
    }
}
