//! Navigation-related controller methods (playlists, search, editing)

use anyhow::{anyhow, Context, Result};

use crate::model::{
    ActiveSection, PlaylistItem, PlaylistSummary, PromptKind, SearchHit, ServiceClient, Track,
};
use super::AppController;

impl AppController {
    async fn require_service(&self) -> Result<ServiceClient> {
        self.service().await.context("Not connected to the playlist service")
    }

    // ========================================================================
    // Sidebar
    // ========================================================================

    pub async fn load_user_playlists(&self) {
        let result = self.try_load_user_playlists().await;
        self.report("load_playlists", result).await;
    }

    async fn try_load_user_playlists(&self) -> Result<()> {
        let service = self.require_service().await?;
        let (own, public) = futures::join!(service.list_playlists(), service.public_playlists());
        let own = own?;

        let user_id = self.model.lock().await.user_id();
        let mut items: Vec<PlaylistItem> = own
            .into_iter()
            .map(|summary| PlaylistItem { summary, owned: true })
            .collect();

        // Public playlists are a nice-to-have; the own list is what matters
        match public {
            Ok(public) => items.extend(
                public
                    .into_iter()
                    .filter(|p| Some(p.owner_id) != user_id)
                    .map(|summary| PlaylistItem { summary, owned: false }),
            ),
            Err(e) => tracing::warn!(error = %e, "Could not load public playlists"),
        }

        tracing::info!(count = items.len(), "Loaded playlists");
        self.model.lock().await.set_playlists(items).await;
        Ok(())
    }

    // ========================================================================
    // Main content
    // ========================================================================

    pub async fn open_playlist(&self, playlist_id: i64, owned: bool) {
        let result = self.try_show_playlist(playlist_id, owned, true).await;
        self.report("open_playlist", result).await;
    }

    /// Re-fetch the playlist in the main view after an edit
    async fn refresh_open_playlist(&self) -> Result<()> {
        let open = self.model.lock().await.get_open_playlist().await;
        if let Some(detail) = open {
            let editable = self.owns(&detail.summary).await;
            self.try_show_playlist(detail.summary.id, editable, false).await?;
        }
        Ok(())
    }

    async fn try_show_playlist(&self, playlist_id: i64, editable: bool, focus: bool) -> Result<()> {
        let service = self.require_service().await?;
        self.model.lock().await.set_content_loading(true).await;

        let detail = service.get_playlist(playlist_id).await?;
        tracing::debug!(playlist_id, tracks = detail.tracks.len(), "Playlist loaded");

        // Keep the session's sequence in step with what the user sees
        let playing_from = self.player.state().playlist.map(|p| p.id);
        if playing_from == Some(playlist_id) {
            self.player.update_sequence(detail.tracks.clone());
        }

        let model = self.model.lock().await;
        model.set_playlist_detail(detail, editable).await;
        if focus {
            model.set_active_section(ActiveSection::MainContent).await;
        }
        Ok(())
    }

    pub async fn perform_search(&self, query: &str) {
        let result = self.try_search(query).await;
        self.report("search", result).await;
    }

    async fn try_search(&self, query: &str) -> Result<()> {
        let service = self.require_service().await?;
        self.model.lock().await.set_content_loading(true).await;

        let results = service.search(query).await?;
        tracing::info!(query, results = results.len(), "Search completed successfully");

        let model = self.model.lock().await;
        model.set_search_results(query.to_string(), results).await;
        model.set_active_section(ActiveSection::MainContent).await;
        Ok(())
    }

    /// Show every track the service knows about
    pub async fn show_catalog(&self) {
        let result = self.try_show_catalog().await;
        self.report("list_tracks", result).await;
    }

    async fn try_show_catalog(&self) -> Result<()> {
        let service = self.require_service().await?;
        self.model.lock().await.set_content_loading(true).await;

        let tracks = service.list_tracks().await?;
        tracing::info!(tracks = tracks.len(), "Track catalog loaded");

        let model = self.model.lock().await;
        model.set_catalog(tracks).await;
        model.set_active_section(ActiveSection::MainContent).await;
        Ok(())
    }

    // ========================================================================
    // Editing
    // ========================================================================

    async fn owns(&self, playlist: &PlaylistSummary) -> bool {
        self.model.lock().await.user_id() == Some(playlist.owner_id)
    }

    /// The playlist an edit key applies to: the sidebar selection, or the
    /// open playlist when the main content has focus.
    pub(crate) async fn editable_playlist(&self) -> Option<PlaylistSummary> {
        let model = self.model.lock().await;
        let section = model.get_ui_state().await.active_section;

        let candidate = match section {
            ActiveSection::MainContent => model.get_open_playlist().await.map(|d| d.summary),
            _ => model
                .get_selected_playlist()
                .await
                .filter(|item| item.owned)
                .map(|item| item.summary),
        };
        drop(model);

        let playlist = candidate?;
        self.owns(&playlist).await.then_some(playlist)
    }

    pub async fn begin_create_playlist(&self) {
        self.model
            .lock()
            .await
            .open_prompt(PromptKind::NewPlaylist, String::new())
            .await;
    }

    pub async fn begin_rename_playlist(&self) {
        let Some(playlist) = self.editable_playlist().await else {
            return;
        };
        self.model
            .lock()
            .await
            .open_prompt(PromptKind::RenamePlaylist { playlist_id: playlist.id }, playlist.name)
            .await;
    }

    /// Ask before deleting; nothing reaches the service until the prompt is confirmed
    pub async fn begin_delete_playlist(&self) {
        let Some(playlist) = self.editable_playlist().await else {
            return;
        };
        self.model
            .lock()
            .await
            .open_prompt(
                PromptKind::ConfirmDelete {
                    playlist_id: playlist.id,
                    name: playlist.name,
                },
                String::new(),
            )
            .await;
    }

    /// Act on a confirmed prompt
    pub async fn submit_prompt(&self, kind: PromptKind, input: String) {
        let name = input.trim();
        let (action, result) = match kind {
            PromptKind::NewPlaylist if !name.is_empty() => {
                ("create_playlist", self.try_create_playlist(name).await)
            }
            PromptKind::RenamePlaylist { playlist_id } if !name.is_empty() => {
                ("rename_playlist", self.try_rename_playlist(playlist_id, name).await)
            }
            PromptKind::ConfirmDelete { playlist_id, name } => {
                ("delete_playlist", self.try_delete_playlist(playlist_id, &name).await)
            }
            _ => return,
        };
        self.report(action, result).await;
    }

    async fn try_create_playlist(&self, name: &str) -> Result<()> {
        let service = self.require_service().await?;
        let created = service.create_playlist(name, Default::default()).await?;
        self.try_load_user_playlists().await?;
        self.model
            .lock()
            .await
            .set_info(format!("Created playlist \"{}\"", created.name))
            .await;
        self.try_show_playlist(created.id, true, true).await
    }

    async fn try_rename_playlist(&self, playlist_id: i64, name: &str) -> Result<()> {
        let service = self.require_service().await?;
        service.update_playlist(playlist_id, Some(name), None).await?;
        self.try_load_user_playlists().await?;
        self.refresh_open_playlist().await
    }

    pub async fn toggle_playlist_visibility(&self) {
        let result = self.try_toggle_visibility().await;
        self.report("toggle_visibility", result).await;
    }

    async fn try_toggle_visibility(&self) -> Result<()> {
        let Some(playlist) = self.editable_playlist().await else {
            return Ok(());
        };
        let service = self.require_service().await?;
        let updated = service
            .update_playlist(playlist.id, None, Some(playlist.publicity.toggled()))
            .await?;

        self.model
            .lock()
            .await
            .set_info(format!("\"{}\" is now {}", updated.name, updated.publicity))
            .await;
        self.try_load_user_playlists().await?;
        self.refresh_open_playlist().await
    }

    async fn try_delete_playlist(&self, playlist_id: i64, name: &str) -> Result<()> {
        let service = self.require_service().await?;
        service.delete_playlist(playlist_id).await?;
        tracing::info!(playlist_id, "Playlist deleted");

        {
            let model = self.model.lock().await;
            model.forget_playlist(playlist_id).await;
            model.set_info(format!("Deleted \"{}\"", name)).await;
        }
        self.try_load_user_playlists().await
    }

    /// Add a search hit to the last playlist of ours that was opened
    pub async fn add_hit_to_playlist(&self, hit: SearchHit) {
        let result = self.try_add_hit(hit).await;
        self.report("add_track", result).await;
    }

    async fn try_add_hit(&self, hit: SearchHit) -> Result<()> {
        let target = self
            .model
            .lock()
            .await
            .get_target_playlist()
            .await
            .ok_or_else(|| anyhow!("Open one of your playlists first"))?;
        let service = self.require_service().await?;

        let added = service.add_track(target.id, &hit.to_track()).await?;
        self.model
            .lock()
            .await
            .set_info(format!("Added \"{}\" to \"{}\"", added.name, target.name))
            .await;
        self.refresh_open_playlist().await
    }

    pub async fn remove_track(&self, playlist: PlaylistSummary, track: Track) {
        let result = self.try_remove_track(&playlist, &track).await;
        self.report("remove_track", result).await;
    }

    async fn try_remove_track(&self, playlist: &PlaylistSummary, track: &Track) -> Result<()> {
        let service = self.require_service().await?;
        service.remove_track(playlist.id, track.id).await?;
        tracing::info!(playlist_id = playlist.id, track = %track.name, "Track removed");
        self.refresh_open_playlist().await
    }
}
