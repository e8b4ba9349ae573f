//! Playback control methods

use std::time::Duration;

use crate::model::{CatalogTrack, SearchHit, SelectedItem};
use super::AppController;

const VOLUME_STEP: f32 = 0.05;
const SEEK_STEP_PERCENT: f64 = 5.0;

impl AppController {
    /// Play the selected row: playlist tracks carry their playlist as context
    pub async fn play_selected_item(&self, item: SelectedItem) {
        match item {
            SelectedItem::PlaylistTrack {
                track,
                playlist,
                tracks,
                ..
            } => {
                tracing::info!(track = %track.name, playlist = %playlist.name, "Playing from playlist");
                self.player.play(track, Some(playlist), Some(tracks));
            }
            SelectedItem::SearchHit(hit) => self.play_search_hit(&hit),
            SelectedItem::CatalogTrack(row) => self.play_catalog_track(&row).await,
        }
    }

    /// Catalog rows play on their own, outside any playlist
    async fn play_catalog_track(&self, row: &CatalogTrack) {
        if !row.is_playable() {
            tracing::debug!(source_id = %row.track.source_id, fails = row.fails, "Catalog track gave up resolving");
            self.model
                .lock()
                .await
                .set_error(format!("\"{}\" failed too often to play", row.track.name))
                .await;
            return;
        }
        tracing::info!(track = %row.track.name, "Playing catalog track");
        self.player.play(row.to_track(), None, None);
    }

    fn play_search_hit(&self, hit: &SearchHit) {
        tracing::info!(track = %hit.track, "Playing search hit");
        self.player.play(hit.to_track(), None, None);
    }

    pub async fn toggle_playback(&self) {
        self.player.toggle();
    }

    pub async fn next_track(&self) {
        self.player.next();
    }

    pub async fn previous_track(&self) {
        self.player.previous();
    }

    pub async fn stop_playback(&self) {
        self.player.stop();
    }

    pub async fn volume_up(&self) {
        let volume = self.player.state().volume;
        self.player.set_volume((volume + VOLUME_STEP).min(1.0));
    }

    pub async fn volume_down(&self) {
        let volume = self.player.state().volume;
        self.player.set_volume((volume - VOLUME_STEP).max(0.0));
    }

    pub async fn seek_forward(&self) {
        self.seek_by(SEEK_STEP_PERCENT);
    }

    pub async fn seek_backward(&self) {
        self.seek_by(-SEEK_STEP_PERCENT);
    }

    pub async fn restart_track(&self) {
        self.player.seek_to(Duration::ZERO);
    }

    fn seek_by(&self, delta_percent: f64) {
        let state = self.player.state();
        if state.duration.is_zero() {
            return;
        }
        let current = state.position.as_secs_f64() / state.duration.as_secs_f64() * 100.0;
        self.player.seek_percent((current + delta_percent).clamp(0.0, 100.0));
    }
}
