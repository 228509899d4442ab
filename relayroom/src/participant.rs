//! Participant rendering over the SDK roster

use relayroom_core::{MediaTrack, ParticipantId, ParticipantInfo, Roster};
use std::fmt;

/// Audio output bound to a participant's microphone track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSink {
    /// Owner of the track
    pub participant_id: ParticipantId,
    /// Microphone track
    pub track: MediaTrack,
    /// Muted locally; set only for the caller's own entry to avoid echo
    pub muted: bool,
}

/// Video output bound to a participant's webcam track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSink {
    /// Owner of the track
    pub participant_id: ParticipantId,
    /// Webcam track
    pub track: MediaTrack,
}

/// What to show for one roster entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantView {
    /// Participant id
    pub participant_id: ParticipantId,
    /// Display name
    pub display_name: String,
    /// Caller's own entry
    pub is_local: bool,
    /// Microphone on
    pub mic_on: bool,
    /// Webcam on
    pub webcam_on: bool,
    /// Audio binding, when the mic is on and a track exists
    pub audio: Option<AudioSink>,
    /// Video binding, when the webcam is on and a track exists
    pub video: Option<VideoSink>,
}

impl ParticipantView {
    /// Build the view for one roster entry
    pub fn from_info(info: &ParticipantInfo) -> Self {
        let audio = match (&info.mic_track, info.mic_on) {
            (Some(track), true) => Some(AudioSink {
                participant_id: info.id.clone(),
                track: track.clone(),
                muted: info.is_local,
            }),
            _ => None,
        };
        let video = match (&info.webcam_track, info.webcam_on) {
            (Some(track), true) => Some(VideoSink {
                participant_id: info.id.clone(),
                track: track.clone(),
            }),
            _ => None,
        };

        Self {
            participant_id: info.id.clone(),
            display_name: info.display_name.clone(),
            is_local: info.is_local,
            mic_on: info.mic_on,
            webcam_on: info.webcam_on,
            audio,
            video,
        }
    }

    /// `Participant: <name> | Webcam: ON|OFF | Mic: ON|OFF`
    pub fn status_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParticipantView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Participant: {} | Webcam: {} | Mic: {}",
            self.display_name,
            if self.webcam_on { "ON" } else { "OFF" },
            if self.mic_on { "ON" } else { "OFF" }
        )
    }
}

/// Render every roster entry, in participant id order
pub fn render(roster: &Roster) -> Vec<ParticipantView> {
    roster.values().map(ParticipantView::from_info).collect()
}

/// Output surface views are applied to (audio elements, video players, labels)
pub trait MediaSurface {
    /// Remove everything previously attached
    fn clear(&mut self);

    /// Show the status line of a participant
    fn show_status(&mut self, participant_id: &ParticipantId, line: &str);

    /// Play a participant's microphone
    fn attach_audio(&mut self, sink: &AudioSink);

    /// Show a participant's webcam
    fn attach_video(&mut self, sink: &VideoSink);
}

/// Re-render the roster onto `surface`; returns the number of participants
pub fn render_into(roster: &Roster, surface: &mut dyn MediaSurface) -> usize {
    let views = render(roster);
    surface.clear();
    for view in &views {
        surface.show_status(&view.participant_id, &view.status_line());
        if let Some(audio) = &view.audio {
            surface.attach_audio(audio);
        }
        if let Some(video) = &view.video {
            surface.attach_video(video);
        }
    }
    views.len()
}
