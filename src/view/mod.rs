//! View module - UI rendering
//!
//! - `utils`: Shared helpers (formatting, scrollable lists)
//! - `layout`: Top bar and playlist sidebar
//! - `content`: Main content area
//! - `progress`: Transport bar
//! - `overlays`: Messages, text prompt, help

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{ContentState, PlaybackInfo, UiState};

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, playback: &PlaybackInfo, ui_state: &UiState, content_state: &ContentState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search bar + user
                Constraint::Min(0),    // Sidebar + content
                Constraint::Length(3), // Transport bar
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], ui_state);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(chunks[1]);

        layout::render_sidebar(frame, main_chunks[0], ui_state);

        let current_source_id = playback
            .visible
            .then_some(playback.track.source_id.as_str())
            .filter(|id| !id.is_empty());
        content::render_main_content(frame, main_chunks[1], ui_state, content_state, current_source_id);

        progress::render_progress_bar(frame, chunks[2], playback);

        if ui_state.message.is_some() {
            overlays::render_message_notification(frame, ui_state);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }

        if let Some(prompt) = &ui_state.prompt {
            overlays::render_prompt(frame, prompt);
        }
    }
}
