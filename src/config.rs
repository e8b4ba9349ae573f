//! Runtime configuration read from the environment

use std::path::PathBuf;
use std::time::Duration;

use crate::player::SessionConfig;

pub const API_URL_VAR: &str = "PLAYLIST_API_URL";
pub const CACHE_DIR_VAR: &str = "PLAYLIST_CACHE_DIR";
pub const ADVANCE_DELAY_VAR: &str = "PLAYLIST_ADVANCE_DELAY_MS";

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_CACHE_DIR: &str = ".cache";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub cache_dir: PathBuf,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or invalid values keep their defaults.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_VAR).map(|v| v.trim().to_string()) {
            if url.starts_with("http://") || url.starts_with("https://") {
                config.api_url = url;
            } else {
                tracing::warn!(var = API_URL_VAR, value = %url, "Not an http(s) URL, using default");
            }
        }

        if let Some(dir) = lookup(CACHE_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.cache_dir = PathBuf::from(dir.trim());
        }

        if let Some(raw) = lookup(ADVANCE_DELAY_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.session.advance_delay = Duration::from_millis(ms),
                Err(e) => {
                    tracing::warn!(var = ADVANCE_DELAY_VAR, value = %raw, error = %e, "Invalid delay, using default")
                }
            }
        }

        tracing::debug!(api_url = %config.api_url, cache_dir = %config.cache_dir.display(), "Configuration loaded");
        config
    }

    pub fn token_path(&self) -> PathBuf {
        self.cache_dir.join("token")
    }
}
