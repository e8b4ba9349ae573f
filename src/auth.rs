use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::config::AppConfig;
use crate::model::{ServiceClient, ServiceError, User};

const MAX_LOGIN_ATTEMPTS: usize = 3;

struct Credentials {
    username: String,
    password: String,
}

fn read_cached_token(path: &Path) -> Option<String> {
    let token = fs::read_to_string(path).ok()?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn save_token(path: &Path, token: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, token)?;
    tracing::debug!(path = %path.display(), "Saved access token");
    Ok(())
}

/// Forget the cached access token.
pub fn logout(config: &AppConfig) -> Result<()> {
    let path = config.token_path();
    match fs::remove_file(&path) {
        Ok(()) => tracing::info!("Cached token removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Sign in with the cached token, or interactively when there is none.
///
/// Leaves the client holding a verified token.
pub async fn authenticate(client: &ServiceClient, config: &AppConfig) -> Result<User> {
    let token_path = config.token_path();

    if let Some(token) = read_cached_token(&token_path) {
        client.set_token(Some(token)).await;
        match client.current_user().await {
            Ok(user) => {
                tracing::info!(username = %user.username, "Signed in with cached token");
                return Ok(user);
            }
            Err(ServiceError::Unauthorized) => {
                tracing::warn!("Cached token rejected, logging in again");
                client.set_token(None).await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("Sign in to {}", client.base_url());

    for attempt in 1..=MAX_LOGIN_ATTEMPTS {
        let creds = tokio::task::spawn_blocking(prompt_credentials).await??;

        match client.login(&creds.username, &creds.password).await {
            Ok(token) => {
                save_token(&token_path, &token)?;
                return Ok(client.current_user().await?);
            }
            Err(ServiceError::Unauthorized | ServiceError::Rejected { .. }) => {
                println!("Incorrect username or password.");
                if tokio::task::spawn_blocking(|| confirm("Create a new account with this username?")).await?? {
                    let user = register(client, &creds).await?;
                    let token = client.login(&creds.username, &creds.password).await?;
                    save_token(&token_path, &token)?;
                    return Ok(user);
                }
                tracing::info!(attempt, "Login rejected");
            }
            Err(e) => return Err(e.into()),
        }
    }

    bail!("Too many failed login attempts")
}

async fn register(client: &ServiceClient, creds: &Credentials) -> Result<User> {
    let email = tokio::task::spawn_blocking(|| read_line("Email: ")).await??;
    let user = client.register(&creds.username, &email, &creds.password).await?;
    tracing::info!(username = %user.username, "Registered new account");
    println!("Account created for {}", user.username);
    Ok(user)
}

fn prompt_credentials() -> Result<Credentials> {
    let username = loop {
        let name = read_line("Username: ")?;
        if !name.is_empty() {
            break name;
        }
    };
    let password = read_hidden("Password: ")?;
    Ok(Credentials { username, password })
}

fn confirm(question: &str) -> Result<bool> {
    let answer = read_line(&format!("{question} [y/N] "))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

fn read_line(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        bail!("Input closed");
    }
    Ok(line.trim().to_string())
}

/// Read without echo using the terminal's raw mode
fn read_hidden(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    enable_raw_mode()?;
    let result = read_hidden_raw();
    disable_raw_mode()?;
    println!();
    result
}

fn read_hidden_raw() -> Result<String> {
    let mut input = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(input),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Esc => bail!("Login cancelled"),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("Login cancelled")
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            cache_dir: dir.join("cache"),
            ..AppConfig::default()
        }
    }

    #[test]
    fn token_survives_round_trip_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        assert_eq!(read_cached_token(&config.token_path()), None);
        save_token(&config.token_path(), "abc.def").unwrap();
        assert_eq!(read_cached_token(&config.token_path()).as_deref(), Some("abc.def"));
    }

    #[test]
    fn blank_token_file_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        save_token(&config.token_path(), "  \n").unwrap();
        assert_eq!(read_cached_token(&config.token_path()), None);
    }

    #[test]
    fn logout_removes_token_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        save_token(&config.token_path(), "abc").unwrap();

        logout(&config).unwrap();
        assert!(!config.token_path().exists());
        logout(&config).unwrap();
    }
}
