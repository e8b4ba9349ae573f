//! Controller module - Application logic and event handling
//!
//! - `input`: Key event handling
//! - `playback`: Transport controls forwarded to the player session
//! - `navigation`: Playlists, search and playlist editing
//! - `player_events`: Player notice listener

mod input;
mod playback;
mod navigation;
mod player_events;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::model::{AppModel, ServiceClient, ServiceError};
use crate::player::PlayerHandle;

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<Mutex<AppModel>>,
    pub(crate) player: PlayerHandle,
}

impl AppController {
    pub fn new(model: Arc<Mutex<AppModel>>, player: PlayerHandle) -> Self {
        Self { model, player }
    }

    pub(crate) async fn service(&self) -> Option<ServiceClient> {
        self.model.lock().await.get_service_client().await
    }

    /// Show a failed action in the message overlay
    pub(crate) async fn report(&self, action: &str, result: Result<()>) {
        if let Err(e) = result {
            tracing::error!(action, error = %e, "Action failed");
            let model = self.model.lock().await;
            model.set_content_loading(false).await;
            model.set_error(Self::format_error(&e)).await;
        }
    }

    pub(crate) fn format_error(error: &anyhow::Error) -> String {
        match error.downcast_ref::<ServiceError>() {
            Some(ServiceError::Unauthorized) => {
                "Session expired. Restart the app to sign in again.".to_string()
            }
            Some(ServiceError::Forbidden(_)) => "You don't have permission to do that.".to_string(),
            Some(ServiceError::NotFound(detail)) => format!("Not found: {detail}"),
            Some(ServiceError::Rejected { detail, .. }) => detail.clone(),
            Some(ServiceError::Transport(_)) => {
                "Playlist service unreachable. Check that it is running.".to_string()
            }
            Some(ServiceError::Decode(_)) => "Unexpected response from the playlist service.".to_string(),
            None => format!("Error: {error}"),
        }
    }
}
