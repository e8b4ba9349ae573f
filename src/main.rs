mod audio;
mod auth;
mod config;
mod controller;
mod logging;
mod model;
mod player;
mod view;

use std::io;
use std::sync::Arc;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::Mutex;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use view::AppView;
use audio::RodioOutput;
use config::AppConfig;
use controller::AppController;
use model::{AppModel, PlaybackInfo, ServiceClient};
use player::PlayerHandle;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== Playlist Player Starting ===");

    let config = AppConfig::from_env();

    if std::env::args().nth(1).as_deref() == Some("logout") {
        auth::logout(&config)?;
        println!("Signed out.");
        return Ok(());
    }

    // Step 1: Sign in (before the TUI takes over the terminal)
    let service = ServiceClient::new(&config.api_url)?;
    let user = auth::authenticate(&service, &config).await?;
    tracing::info!(username = %user.username, "Signed in");

    // Step 2: Playback session owning the audio output
    let output = RodioOutput::new()?;
    let (player, notices, session_task) =
        player::spawn_session(service.clone(), Box::new(output), config.session.clone());

    let mut app_model = AppModel::new();
    app_model.set_service_client(service);
    app_model.set_user(user).await;
    let model = Arc::new(Mutex::new(app_model));

    let controller = AppController::new(model.clone(), player.clone());
    controller.start_notice_listener(notices);
    controller.load_user_playlists().await;

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model, controller, &player).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    player.shutdown();
    if let Err(e) = session_task.await {
        tracing::warn!(error = %e, "Playback session task failed");
    }

    tracing::info!("Playlist Player shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<Mutex<AppModel>>,
    controller: AppController,
    player: &PlayerHandle,
) -> io::Result<()> {
    let mut window_title = String::new();

    loop {
        let state = player.state();
        if state.title != window_title {
            execute!(terminal.backend_mut(), SetTitle(&state.title))?;
            window_title = state.title.clone();
        }
        let playback = PlaybackInfo::from_state(&state);

        let (ui_state, content_state, should_quit) = {
            let model_guard = model.lock().await;

            model_guard.auto_clear_old_messages().await;

            (
                model_guard.get_ui_state().await,
                model_guard.get_content_state().await,
                model_guard.should_quit().await,
            )
        };

        if should_quit {
            break;
        }

        terminal.draw(|f| {
            AppView::render(f, &playback, &ui_state, &content_state);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                // Failures are reported through the message overlay
                let _ = controller.handle_key_event(key).await;
            }
        }
    }

    Ok(())
}
