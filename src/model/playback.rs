//! Playback information prepared for rendering

use crate::player::{PlaybackState, SessionPhase};

/// Metadata about the currently playing track
#[derive(Clone, Debug)]
pub struct TrackMetadata {
    pub name: String,
    pub author: String,
    pub source_id: String,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            name: "No track playing".to_string(),
            author: String::new(),
            source_id: String::new(),
        }
    }
}

/// Complete playback information for rendering the transport bar
#[derive(Clone, Debug)]
pub struct PlaybackInfo {
    pub track: TrackMetadata,
    pub progress_ms: u32,
    pub duration_ms: u32,
    pub is_playing: bool,
    pub is_loading: bool,
    pub volume_percent: u8,
    pub playlist_name: Option<String>,
    pub visible: bool,
}

impl Default for PlaybackInfo {
    fn default() -> Self {
        Self::from_state(&PlaybackState::default())
    }
}

impl PlaybackInfo {
    pub fn from_state(state: &PlaybackState) -> Self {
        let track = state
            .current_track
            .as_ref()
            .map(|track| TrackMetadata {
                name: track.name.clone(),
                author: track.author.clone(),
                source_id: track.source_id.clone(),
            })
            .unwrap_or_default();

        Self {
            track,
            progress_ms: state.position.as_millis() as u32,
            duration_ms: state.duration.as_millis() as u32,
            is_playing: state.is_playing,
            is_loading: state.phase == SessionPhase::Loading,
            volume_percent: (state.volume * 100.0).round() as u8,
            playlist_name: state.playlist.as_ref().map(|p| p.name.clone()),
            visible: state.visible,
        }
    }

    /// Position as 0-100 of the duration
    pub fn progress_percent(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.progress_ms as f64 / self.duration_ms as f64 * 100.0).clamp(0.0, 100.0)
        }
    }
}
