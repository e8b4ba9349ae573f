//! Core type definitions for the application

use std::time::Instant;

use super::content::PlaylistSummary;

/// Which section of the UI is currently active/focused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveSection {
    Search,
    Playlists,
    MainContent,
}

impl ActiveSection {
    pub fn next(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Playlists,
            ActiveSection::Playlists => ActiveSection::MainContent,
            ActiveSection::MainContent => ActiveSection::Search,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::MainContent,
            ActiveSection::Playlists => ActiveSection::Search,
            ActiveSection::MainContent => ActiveSection::Playlists,
        }
    }
}

/// A playlist in the sidebar
#[derive(Clone, Debug)]
pub struct PlaylistItem {
    pub summary: PlaylistSummary,
    /// Owned by the logged-in user (public playlists of others are read-only)
    pub owned: bool,
}

/// What a text prompt is collecting
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptKind {
    NewPlaylist,
    RenamePlaylist { playlist_id: i64 },
    /// Yes/no question; the input stays empty
    ConfirmDelete { playlist_id: i64, name: String },
}

#[derive(Clone, Debug)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        match self.kind {
            PromptKind::NewPlaylist => " New playlist name ",
            PromptKind::RenamePlaylist { .. } => " Rename playlist ",
            PromptKind::ConfirmDelete { .. } => " Delete playlist ",
        }
    }

    pub fn is_confirmation(&self) -> bool {
        matches!(self.kind, PromptKind::ConfirmDelete { .. })
    }
}

/// Severity of the overlay message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Error,
}

/// UI state for the application
#[derive(Clone)]
pub struct UiState {
    pub active_section: ActiveSection,
    pub search_query: String,
    pub playlists: Vec<PlaylistItem>,
    pub playlist_selected: usize,
    pub message: Option<String>,
    pub message_level: MessageLevel,
    pub message_timestamp: Option<Instant>,
    pub prompt: Option<Prompt>,
    pub show_help_popup: bool,
    pub username: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active_section: ActiveSection::Playlists,
            search_query: String::new(),
            playlists: vec![], // Loaded from the service after login
            playlist_selected: 0,
            message: None,
            message_level: MessageLevel::Info,
            message_timestamp: None,
            prompt: None,
            show_help_popup: false,
            username: String::new(),
        }
    }
}
