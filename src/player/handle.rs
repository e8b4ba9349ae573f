//! Handle injected into the UI layer
//!
//! The handle is the only way the rest of the application reaches the
//! playback session: commands go in through the session inbox and state
//! comes back through a watch channel.

use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::model::{PlaylistSummary, Track};
use super::session::{PlaybackState, PlayerCommand, SeekTarget, SessionInput};

#[derive(Clone)]
pub struct PlayerHandle {
    inbox: mpsc::UnboundedSender<SessionInput>,
    state: watch::Receiver<PlaybackState>,
}

impl PlayerHandle {
    pub fn new(inbox: mpsc::UnboundedSender<SessionInput>, state: watch::Receiver<PlaybackState>) -> Self {
        Self { inbox, state }
    }

    fn send(&self, command: PlayerCommand) {
        if self.inbox.send(SessionInput::Command(command)).is_err() {
            tracing::warn!("Playback session is closed, dropping command");
        }
    }

    /// Latest published session state
    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    pub fn play(&self, track: Track, playlist: Option<PlaylistSummary>, sequence: Option<Vec<Track>>) {
        self.send(PlayerCommand::Play {
            track,
            playlist,
            sequence,
        });
    }

    /// Play/pause button of the transport bar. The session decides which,
    /// since a track that is still loading has not published `is_playing` yet.
    pub fn toggle(&self) {
        self.send(PlayerCommand::Toggle);
    }

    pub fn seek_percent(&self, percent: f64) {
        self.send(PlayerCommand::Seek(SeekTarget::Percent(percent)));
    }

    pub fn seek_to(&self, position: Duration) {
        self.send(PlayerCommand::Seek(SeekTarget::Absolute(position)));
    }

    pub fn set_volume(&self, level: f32) {
        self.send(PlayerCommand::SetVolume(level));
    }

    pub fn next(&self) {
        self.send(PlayerCommand::Next(None));
    }

    pub fn previous(&self) {
        self.send(PlayerCommand::Previous(None));
    }

    pub fn update_sequence(&self, tracks: Vec<Track>) {
        self.send(PlayerCommand::UpdateSequence(tracks));
    }

    pub fn stop(&self) {
        self.send(PlayerCommand::Stop);
    }

    pub fn shutdown(&self) {
        self.send(PlayerCommand::Shutdown);
    }
}
