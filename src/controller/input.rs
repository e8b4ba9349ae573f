//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::future::Future;

use crate::model::{ActiveSection, SelectedItem};
use super::AppController;

impl AppController {
    /// Run a service-backed action without blocking the draw loop
    fn spawn_action<F>(&self, action: impl FnOnce(AppController) -> F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(action(self.clone()));
    }

    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        let model = self.model.lock().await;

        // Prompts capture everything
        if let Some(confirming) = model.get_prompt().await.map(|p| p.is_confirmation()) {
            if confirming {
                match key.code {
                    KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                        if let Some(prompt) = model.take_prompt().await {
                            drop(model);
                            self.spawn_action(|c| async move { c.submit_prompt(prompt.kind, prompt.input).await });
                        }
                    }
                    KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                        model.take_prompt().await;
                    }
                    _ => {}
                }
                return Ok(());
            }
            match key.code {
                KeyCode::Enter => {
                    if let Some(prompt) = model.take_prompt().await {
                        drop(model);
                        self.spawn_action(|c| async move { c.submit_prompt(prompt.kind, prompt.input).await });
                    }
                }
                KeyCode::Esc => {
                    model.take_prompt().await;
                }
                KeyCode::Backspace => model.prompt_backspace().await,
                KeyCode::Char(c) => model.prompt_push(c).await,
                _ => {}
            }
            return Ok(());
        }

        // Messages auto-clear; Esc/Enter dismiss early
        if model.has_message().await && matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            model.clear_message().await;
            return Ok(());
        }

        if model.is_help_popup_open().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H')) {
                model.hide_help_popup().await;
            }
            return Ok(());
        }

        let ui_state = model.get_ui_state().await;

        // Search box takes typed characters
        if ui_state.active_section == ActiveSection::Search {
            match key.code {
                KeyCode::Enter => {
                    let query = model.get_search_query().await;
                    drop(model);
                    if !query.is_empty() {
                        self.spawn_action(|c| async move { c.perform_search(&query).await });
                    }
                    return Ok(());
                }
                KeyCode::Esc => {
                    model.clear_search().await;
                    return Ok(());
                }
                KeyCode::Backspace => {
                    model.backspace_search().await;
                    return Ok(());
                }
                KeyCode::Char(c) => {
                    // Ctrl+Q still quits while typing
                    if (c == 'q' || c == 'Q') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        model.set_should_quit(true).await;
                    } else {
                        model.append_to_search(c).await;
                    }
                    return Ok(());
                }
                _ => {}
            }
        }

        if ui_state.active_section == ActiveSection::MainContent {
            match key.code {
                KeyCode::Up => {
                    model.content_move_up().await;
                    return Ok(());
                }
                KeyCode::Down => {
                    model.content_move_down().await;
                    return Ok(());
                }
                KeyCode::Enter => {
                    let selected = model.get_selected_content_item().await;
                    drop(model);
                    if let Some(item) = selected {
                        self.play_selected_item(item).await;
                    }
                    return Ok(());
                }
                KeyCode::Char('a') | KeyCode::Char('A') => {
                    if let Some(SelectedItem::SearchHit(hit)) = model.get_selected_content_item().await {
                        drop(model);
                        self.spawn_action(|c| async move { c.add_hit_to_playlist(hit).await });
                    }
                    return Ok(());
                }
                KeyCode::Delete => {
                    if let Some(SelectedItem::PlaylistTrack {
                        track,
                        playlist,
                        editable: true,
                        ..
                    }) = model.get_selected_content_item().await
                    {
                        drop(model);
                        self.spawn_action(|c| async move { c.remove_track(playlist, track).await });
                    }
                    return Ok(());
                }
                _ => {}
            }
        }

        if ui_state.active_section == ActiveSection::Playlists {
            match key.code {
                KeyCode::Enter => {
                    if let Some(item) = model.get_selected_playlist().await {
                        drop(model);
                        let (id, owned) = (item.summary.id, item.owned);
                        self.spawn_action(move |c| async move { c.open_playlist(id, owned).await });
                    }
                    return Ok(());
                }
                KeyCode::Delete => {
                    drop(model);
                    self.begin_delete_playlist().await;
                    return Ok(());
                }
                _ => {}
            }
        }

        // Global keybindings
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                model.set_should_quit(true).await;
            }
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    model.cycle_section_backward().await;
                } else {
                    model.cycle_section_forward().await;
                }
            }
            KeyCode::BackTab => {
                model.cycle_section_backward().await;
            }
            KeyCode::Up => {
                model.move_selection_up().await;
            }
            KeyCode::Down => {
                model.move_selection_down().await;
            }
            KeyCode::Char(' ') => {
                drop(model);
                self.toggle_playback().await;
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                drop(model);
                self.next_track().await;
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                drop(model);
                self.previous_track().await;
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                drop(model);
                self.stop_playback().await;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                drop(model);
                self.volume_up().await;
            }
            KeyCode::Char('-') => {
                drop(model);
                self.volume_down().await;
            }
            KeyCode::Char('.') => {
                drop(model);
                self.seek_forward().await;
            }
            KeyCode::Char(',') => {
                drop(model);
                self.seek_backward().await;
            }
            KeyCode::Char('0') => {
                drop(model);
                self.restart_track().await;
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                drop(model);
                self.begin_create_playlist().await;
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                drop(model);
                self.begin_rename_playlist().await;
            }
            KeyCode::Char('v') | KeyCode::Char('V') => {
                drop(model);
                self.spawn_action(|c| async move { c.toggle_playlist_visibility().await });
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                drop(model);
                self.spawn_action(|c| async move { c.show_catalog().await });
            }
            // Focus search
            KeyCode::Char('/') => {
                model.set_active_section(ActiveSection::Search).await;
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                model.show_help_popup().await;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppModel, PlaylistItem, PlaylistSummary, PromptKind, User, Visibility};
    use crate::player::{PlaybackState, PlayerHandle};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, watch, Mutex};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// Controller for user 1 with one owned playlist selected and no service connection
    async fn controller() -> AppController {
        let mut model = AppModel::new();
        model
            .set_user(User {
                id: 1,
                username: "ana".to_string(),
                email: "ana@example.com".to_string(),
                is_active: true,
            })
            .await;
        model
            .set_playlists(vec![PlaylistItem {
                summary: PlaylistSummary {
                    id: 7,
                    name: "Mix".to_string(),
                    owner_id: 1,
                    publicity: Visibility::Private,
                    created_at: None,
                    modified_at: None,
                    track_count: 0,
                },
                owned: true,
            }])
            .await;

        let (inbox, _rx) = mpsc::unbounded_channel();
        let (_state_tx, state_rx) = watch::channel(PlaybackState::default());
        AppController::new(Arc::new(Mutex::new(model)), PlayerHandle::new(inbox, state_rx))
    }

    async fn prompt_kind(controller: &AppController) -> Option<PromptKind> {
        controller.model.lock().await.get_prompt().await.map(|p| p.kind)
    }

    #[tokio::test]
    async fn delete_asks_before_touching_the_playlist() {
        let controller = controller().await;

        controller.handle_key_event(press(KeyCode::Delete)).await.unwrap();
        assert_eq!(
            prompt_kind(&controller).await,
            Some(PromptKind::ConfirmDelete {
                playlist_id: 7,
                name: "Mix".to_string(),
            })
        );

        // Unrelated keys leave the question open
        controller.handle_key_event(press(KeyCode::Char('x'))).await.unwrap();
        assert!(prompt_kind(&controller).await.is_some());

        controller.handle_key_event(press(KeyCode::Char('n'))).await.unwrap();
        assert_eq!(prompt_kind(&controller).await, None);
        let model = controller.model.lock().await;
        assert_eq!(model.get_ui_state().await.playlists.len(), 1);
        assert!(!model.has_message().await);
    }

    #[tokio::test]
    async fn confirmed_delete_goes_to_the_service() {
        let controller = controller().await;

        controller.handle_key_event(press(KeyCode::Delete)).await.unwrap();
        controller.handle_key_event(press(KeyCode::Char('y'))).await.unwrap();
        assert_eq!(prompt_kind(&controller).await, None);

        // Without a service connection the attempt surfaces as an error
        let mut reported = false;
        for _ in 0..50 {
            if controller.model.lock().await.has_message().await {
                reported = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(reported);
    }

    #[tokio::test]
    async fn public_playlists_of_others_cannot_be_deleted() {
        let controller = controller().await;
        {
            let model = controller.model.lock().await;
            let mut items = model.get_ui_state().await.playlists;
            items[0].owned = false;
            items[0].summary.owner_id = 2;
            model.set_playlists(items).await;
        }

        controller.handle_key_event(press(KeyCode::Delete)).await.unwrap();
        assert_eq!(prompt_kind(&controller).await, None);
    }
}
