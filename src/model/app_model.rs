//! Main application model with state management

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use super::content::{CatalogTrack, ContentState, ContentView, PlaylistDetail, PlaylistSummary, SearchHit, Track, User};
use super::service_client::ServiceClient;
use super::types::{ActiveSection, MessageLevel, PlaylistItem, Prompt, PromptKind, UiState};

const MESSAGE_TTL_SECS: u64 = 5;

/// The row under the cursor in the main content area
#[derive(Clone, Debug)]
pub enum SelectedItem {
    PlaylistTrack {
        track: Track,
        playlist: PlaylistSummary,
        tracks: Vec<Track>,
        editable: bool,
    },
    SearchHit(SearchHit),
    CatalogTrack(CatalogTrack),
}

/// Main application model containing all UI state
pub struct AppModel {
    pub service: Option<ServiceClient>,
    pub user: Option<User>,
    pub ui_state: Arc<Mutex<UiState>>,
    pub content_state: Arc<Mutex<ContentState>>,
    pub should_quit: Arc<Mutex<bool>>,
}

impl AppModel {
    pub fn new() -> Self {
        Self {
            service: None,
            user: None,
            ui_state: Arc::new(Mutex::new(UiState::default())),
            content_state: Arc::new(Mutex::new(ContentState::default())),
            should_quit: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_service_client(&mut self, client: ServiceClient) {
        self.service = Some(client);
    }

    pub async fn get_service_client(&self) -> Option<ServiceClient> {
        self.service.clone()
    }

    pub async fn set_user(&mut self, user: User) {
        self.ui_state.lock().await.username = user.username.clone();
        self.user = Some(user);
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }

    // ========================================================================
    // Sections & Sidebar
    // ========================================================================

    pub async fn get_ui_state(&self) -> UiState {
        self.ui_state.lock().await.clone()
    }

    pub async fn cycle_section_forward(&self) {
        let mut state = self.ui_state.lock().await;
        state.active_section = state.active_section.next();
    }

    pub async fn cycle_section_backward(&self) {
        let mut state = self.ui_state.lock().await;
        state.active_section = state.active_section.prev();
    }

    pub async fn set_active_section(&self, section: ActiveSection) {
        self.ui_state.lock().await.active_section = section;
    }

    pub async fn move_selection_up(&self) {
        let mut state = self.ui_state.lock().await;
        if state.active_section == ActiveSection::Playlists && state.playlist_selected > 0 {
            state.playlist_selected -= 1;
        }
    }

    pub async fn move_selection_down(&self) {
        let mut state = self.ui_state.lock().await;
        if state.active_section == ActiveSection::Playlists
            && state.playlist_selected < state.playlists.len().saturating_sub(1)
        {
            state.playlist_selected += 1;
        }
    }

    pub async fn append_to_search(&self, c: char) {
        self.ui_state.lock().await.search_query.push(c);
    }

    pub async fn backspace_search(&self) {
        self.ui_state.lock().await.search_query.pop();
    }

    pub async fn clear_search(&self) {
        self.ui_state.lock().await.search_query.clear();
    }

    pub async fn get_search_query(&self) -> String {
        self.ui_state.lock().await.search_query.trim().to_string()
    }

    /// Replace the sidebar, keeping the cursor in range
    pub async fn set_playlists(&self, playlists: Vec<PlaylistItem>) {
        let mut state = self.ui_state.lock().await;
        state.playlist_selected = state.playlist_selected.min(playlists.len().saturating_sub(1));
        state.playlists = playlists;
    }

    pub async fn get_selected_playlist(&self) -> Option<PlaylistItem> {
        let state = self.ui_state.lock().await;
        state.playlists.get(state.playlist_selected).cloned()
    }

    // ========================================================================
    // Messages & Overlays
    // ========================================================================

    pub async fn set_message(&self, level: MessageLevel, message: String) {
        let mut state = self.ui_state.lock().await;
        state.message = Some(message);
        state.message_level = level;
        state.message_timestamp = Some(Instant::now());
    }

    pub async fn set_error(&self, message: String) {
        self.set_message(MessageLevel::Error, message).await;
    }

    pub async fn set_info(&self, message: String) {
        self.set_message(MessageLevel::Info, message).await;
    }

    pub async fn clear_message(&self) {
        let mut state = self.ui_state.lock().await;
        state.message = None;
        state.message_timestamp = None;
    }

    pub async fn has_message(&self) -> bool {
        self.ui_state.lock().await.message.is_some()
    }

    pub async fn auto_clear_old_messages(&self) {
        let mut state = self.ui_state.lock().await;
        if let Some(timestamp) = state.message_timestamp {
            if timestamp.elapsed().as_secs() >= MESSAGE_TTL_SECS {
                state.message = None;
                state.message_timestamp = None;
            }
        }
    }

    pub async fn show_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = true;
    }

    pub async fn hide_help_popup(&self) {
        self.ui_state.lock().await.show_help_popup = false;
    }

    pub async fn is_help_popup_open(&self) -> bool {
        self.ui_state.lock().await.show_help_popup
    }

    pub async fn open_prompt(&self, kind: PromptKind, initial: String) {
        self.ui_state.lock().await.prompt = Some(Prompt { kind, input: initial });
    }

    pub async fn get_prompt(&self) -> Option<Prompt> {
        self.ui_state.lock().await.prompt.clone()
    }

    pub async fn prompt_push(&self, c: char) {
        if let Some(prompt) = self.ui_state.lock().await.prompt.as_mut() {
            prompt.input.push(c);
        }
    }

    pub async fn prompt_backspace(&self) {
        if let Some(prompt) = self.ui_state.lock().await.prompt.as_mut() {
            prompt.input.pop();
        }
    }

    /// Close the prompt and hand back what was typed
    pub async fn take_prompt(&self) -> Option<Prompt> {
        self.ui_state.lock().await.prompt.take()
    }

    // ========================================================================
    // Main Content
    // ========================================================================

    pub async fn get_content_state(&self) -> ContentState {
        self.content_state.lock().await.clone()
    }

    pub async fn set_content_loading(&self, loading: bool) {
        self.content_state.lock().await.is_loading = loading;
    }

    /// Show a playlist. Reopening the one already shown keeps the cursor.
    pub async fn set_playlist_detail(&self, detail: PlaylistDetail, editable: bool) {
        let mut state = self.content_state.lock().await;

        let selected_index = match &state.view {
            ContentView::PlaylistDetail {
                detail: shown,
                selected_index,
                ..
            } if shown.summary.id == detail.summary.id => {
                (*selected_index).min(detail.tracks.len().saturating_sub(1))
            }
            _ => 0,
        };

        if editable {
            state.target_playlist = Some(detail.summary.clone());
        }
        state.view = ContentView::PlaylistDetail {
            detail,
            selected_index,
            editable,
        };
        state.is_loading = false;
    }

    pub async fn set_search_results(&self, query: String, results: Vec<SearchHit>) {
        let mut state = self.content_state.lock().await;
        state.view = ContentView::SearchResults {
            query,
            results,
            selected_index: 0,
        };
        state.is_loading = false;
    }

    pub async fn set_catalog(&self, tracks: Vec<CatalogTrack>) {
        let mut state = self.content_state.lock().await;
        state.view = ContentView::Catalog {
            tracks,
            selected_index: 0,
        };
        state.is_loading = false;
    }

    /// Drop every reference to a deleted playlist
    pub async fn forget_playlist(&self, playlist_id: i64) {
        let mut state = self.content_state.lock().await;
        if matches!(&state.view, ContentView::PlaylistDetail { detail, .. } if detail.summary.id == playlist_id) {
            state.view = ContentView::Empty;
        }
        if state.target_playlist.as_ref().is_some_and(|p| p.id == playlist_id) {
            state.target_playlist = None;
        }
    }

    pub async fn content_move_up(&self) {
        let mut state = self.content_state.lock().await;
        match &mut state.view {
            ContentView::PlaylistDetail { selected_index, .. }
            | ContentView::SearchResults { selected_index, .. }
            | ContentView::Catalog { selected_index, .. } => {
                *selected_index = selected_index.saturating_sub(1);
            }
            ContentView::Empty => {}
        }
    }

    pub async fn content_move_down(&self) {
        let mut state = self.content_state.lock().await;
        match &mut state.view {
            ContentView::PlaylistDetail {
                detail,
                selected_index,
                ..
            } => {
                if *selected_index < detail.tracks.len().saturating_sub(1) {
                    *selected_index += 1;
                }
            }
            ContentView::SearchResults {
                results,
                selected_index,
                ..
            } => {
                if *selected_index < results.len().saturating_sub(1) {
                    *selected_index += 1;
                }
            }
            ContentView::Catalog {
                tracks,
                selected_index,
            } => {
                if *selected_index < tracks.len().saturating_sub(1) {
                    *selected_index += 1;
                }
            }
            ContentView::Empty => {}
        }
    }

    pub async fn get_selected_content_item(&self) -> Option<SelectedItem> {
        let state = self.content_state.lock().await;
        match &state.view {
            ContentView::PlaylistDetail {
                detail,
                selected_index,
                editable,
            } => detail.tracks.get(*selected_index).map(|track| SelectedItem::PlaylistTrack {
                track: track.clone(),
                playlist: detail.summary.clone(),
                tracks: detail.tracks.clone(),
                editable: *editable,
            }),
            ContentView::SearchResults {
                results,
                selected_index,
                ..
            } => results.get(*selected_index).cloned().map(SelectedItem::SearchHit),
            ContentView::Catalog {
                tracks,
                selected_index,
            } => tracks.get(*selected_index).cloned().map(SelectedItem::CatalogTrack),
            ContentView::Empty => None,
        }
    }

    /// Playlist shown in the main content area, if any
    pub async fn get_open_playlist(&self) -> Option<PlaylistDetail> {
        match &self.content_state.lock().await.view {
            ContentView::PlaylistDetail { detail, .. } => Some(detail.clone()),
            _ => None,
        }
    }

    pub async fn get_target_playlist(&self) -> Option<PlaylistSummary> {
        self.content_state.lock().await.target_playlist.clone()
    }
}

impl Default for AppModel {
    fn default() -> Self {
        Self::new()
    }
}
