//! Model module - Application state and data types
//!
//! - `types`: UI enums and state
//! - `playback`: transport bar data derived from the session state
//! - `content`: tracks, playlists, search hits and the main content view
//! - `service_client`: playlist service API client
//! - `app_model`: application model with state management methods

mod types;
mod playback;
mod content;
mod service_client;
mod app_model;

pub use types::{ActiveSection, MessageLevel, PlaylistItem, Prompt, PromptKind, UiState};

pub use playback::PlaybackInfo;

pub use content::{
    CatalogTrack, ContentState, ContentView, PlaylistDetail, PlaylistSummary, SearchHit, Track, User,
    Visibility,
};

pub use service_client::{ServiceClient, ServiceError};

pub use app_model::{AppModel, SelectedItem};
