//! Event system for session and room-switch notifications

use crate::switch::SwitchPhase;
use futures::Stream;
use relayroom_core::{RoomId, SessionState};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

/// Notifications published by session controllers and the room switcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session state changed
    StateChanged {
        /// Room of the session
        room_id: RoomId,
        /// New state
        state: SessionState,
    },
    /// Relay state changed
    RelayChanged {
        /// Room publishing the relay
        room_id: RoomId,
        /// Whether the relay is now active
        active: bool,
        /// Target room while active
        target: Option<RoomId>,
    },
    /// The roster or local media state changed; views should re-render
    ParticipantsChanged {
        /// Room whose roster changed
        room_id: RoomId,
    },
    /// A user-facing notice, typically a failed command
    Notice {
        /// Room the notice relates to
        room_id: RoomId,
        /// Message to show
        message: String,
    },
    /// Room switcher phase changed
    PhaseChanged {
        /// New phase
        phase: SwitchPhase,
    },
    /// The switcher bound a session to a different room
    RoomSwitched {
        /// Room that was left
        from: RoomId,
        /// Room now bound
        to: RoomId,
    },
    /// Both rooms were discarded
    RoomsCleared,
}

impl SessionEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::RelayChanged { .. } => "relay_changed",
            SessionEvent::ParticipantsChanged { .. } => "participants_changed",
            SessionEvent::Notice { .. } => "notice",
            SessionEvent::PhaseChanged { .. } => "phase_changed",
            SessionEvent::RoomSwitched { .. } => "room_switched",
            SessionEvent::RoomsCleared => "rooms_cleared",
        }
    }

    /// Check if this is a session lifecycle event
    pub fn is_session_event(&self) -> bool {
        matches!(
            self,
            SessionEvent::StateChanged { .. } | SessionEvent::RelayChanged { .. }
        )
    }

    /// Check if this is a roster event
    pub fn is_roster_event(&self) -> bool {
        matches!(self, SessionEvent::ParticipantsChanged { .. })
    }

    /// Check if this is a room switch event
    pub fn is_switch_event(&self) -> bool {
        matches!(
            self,
            SessionEvent::PhaseChanged { .. }
                | SessionEvent::RoomSwitched { .. }
                | SessionEvent::RoomsCleared
        )
    }

    /// Check if this is a user-facing notice
    pub fn is_notice(&self) -> bool {
        matches!(self, SessionEvent::Notice { .. })
    }
}

/// Fan-out of [`SessionEvent`]s to every live subscriber
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    senders: Vec<mpsc::UnboundedSender<SessionEvent>>,
}

impl Subscribers {
    /// Register a new subscriber
    pub(crate) fn subscribe(&mut self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        EventStream::new(rx)
    }

    /// Register an existing sender
    pub(crate) fn attach(&mut self, sender: mpsc::UnboundedSender<SessionEvent>) {
        self.senders.push(sender);
    }

    /// Senders of subscribers still listening
    pub(crate) fn senders(&self) -> impl Iterator<Item = &mpsc::UnboundedSender<SessionEvent>> {
        self.senders.iter().filter(|tx| !tx.is_closed())
    }

    /// Deliver to all subscribers, dropping closed ones
    pub(crate) fn publish(&mut self, event: SessionEvent) {
        debug!("📡 Publishing event: {}", event.event_type());
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Stream of session events for async iteration
#[derive(Debug)]
pub struct EventStream {
    /// Receiver for events
    receiver: mpsc::UnboundedReceiver<SessionEvent>,
}

impl EventStream {
    /// Create a new event stream with a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<SessionEvent> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<SessionEvent>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Drain every event already queued
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Close the event stream
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Stream for EventStream {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Event handler for callback-style event processing
#[derive(Debug)]
pub struct EventHandler {
    /// Background task handle
    task_handle: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    /// Run `callback` for every event of `stream` on a background task
    pub fn spawn<F>(mut stream: EventStream, mut callback: F) -> Self
    where
        F: FnMut(SessionEvent) + Send + 'static,
    {
        let task_handle = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                callback(event);
            }
        });

        Self { task_handle }
    }

    /// Stop processing events
    pub fn abort(&self) {
        self.task_handle.abort();
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.task_handle.abort();
    }
}

/// Event filter for selective event processing
#[derive(Debug, Clone)]
pub struct EventFilter {
    /// Whether to include state and relay events
    pub include_session_events: bool,
    /// Whether to include roster events
    pub include_roster_events: bool,
    /// Whether to include room switch events
    pub include_switch_events: bool,
    /// Whether to include notices
    pub include_notices: bool,
    /// Specific event types to include (if specified, overrides other filters)
    pub specific_event_types: Option<Vec<String>>,
}

impl EventFilter {
    /// Create a filter that includes all events
    pub fn all() -> Self {
        Self {
            include_session_events: true,
            include_roster_events: true,
            include_switch_events: true,
            include_notices: true,
            specific_event_types: None,
        }
    }

    /// Create a filter that includes only notices
    pub fn notices_only() -> Self {
        Self {
            include_session_events: false,
            include_roster_events: false,
            include_switch_events: false,
            include_notices: true,
            specific_event_types: None,
        }
    }

    /// Create a filter that includes only roster events
    pub fn roster_only() -> Self {
        Self {
            include_session_events: false,
            include_roster_events: true,
            include_switch_events: false,
            include_notices: false,
            specific_event_types: None,
        }
    }

    /// Create a filter for specific event types
    pub fn specific(event_types: Vec<String>) -> Self {
        Self {
            include_session_events: false,
            include_roster_events: false,
            include_switch_events: false,
            include_notices: false,
            specific_event_types: Some(event_types),
        }
    }

    /// Check if an event should be included based on this filter
    pub fn should_include(&self, event: &SessionEvent) -> bool {
        if let Some(ref specific_types) = self.specific_event_types {
            return specific_types.iter().any(|t| t == event.event_type());
        }

        (self.include_session_events && event.is_session_event())
            || (self.include_roster_events && event.is_roster_event())
            || (self.include_switch_events && event.is_switch_event())
            || (self.include_notices && event.is_notice())
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Filtered event stream that only yields events matching a filter
#[derive(Debug)]
pub struct FilteredEventStream {
    /// Underlying event stream
    stream: EventStream,
    /// Event filter
    filter: EventFilter,
}

impl FilteredEventStream {
    /// Create a new filtered event stream
    pub fn new(stream: EventStream, filter: EventFilter) -> Self {
        Self { stream, filter }
    }

    /// Get the next event that matches the filter
    pub async fn next(&mut self) -> Option<SessionEvent> {
        while let Some(event) = self.stream.next().await {
            if self.filter.should_include(&event) {
                return Some(event);
            }
        }
        None
    }

    /// Try to get the next filtered event without blocking
    pub fn try_next(&mut self) -> Result<Option<SessionEvent>, mpsc::error::TryRecvError> {
        while let Some(event) = self.stream.try_next()? {
            if self.filter.should_include(&event) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    /// Update the filter
    pub fn set_filter(&mut self, filter: EventFilter) {
        self.filter = filter;
    }

    /// Get the current filter
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}
