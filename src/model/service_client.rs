//! Playlist service API client

use anyhow::Result;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::player::{LinkOutcome, LinkResolver};
use crate::{log_api_request, log_api_result};
use super::content::{CatalogTrack, PlaylistDetail, PlaylistSummary, SearchHit, Track, User, Visibility};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors reported by the playlist service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("permission denied: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ServiceError {
    fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = detail_from_body(body);
        match status {
            StatusCode::UNAUTHORIZED => ServiceError::Unauthorized,
            StatusCode::FORBIDDEN => ServiceError::Forbidden(detail),
            StatusCode::NOT_FOUND => ServiceError::NotFound(detail),
            _ => ServiceError::Rejected {
                status: status.as_u16(),
                detail,
            },
        }
    }
}

/// FastAPI error bodies carry `detail` as a string or a list of validation errors
fn detail_from_body(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ServiceError> {
    serde_json::from_slice(bytes).map_err(|e| ServiceError::Decode(e.to_string()))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct LinkedTrack {
    #[serde(default)]
    link: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum PlayResponse {
    Success {
        track: LinkedTrack,
    },
    Pending {
        #[serde(default)]
        message: String,
    },
    NoAlternatives {
        #[allow(dead_code)]
        #[serde(default)]
        message: Option<String>,
    },
}

fn link_outcome_from_body(bytes: &[u8]) -> Result<LinkOutcome, ServiceError> {
    let outcome = match decode::<PlayResponse>(bytes)? {
        PlayResponse::Success { track } => match track.link {
            Some(link) if !link.is_empty() => LinkOutcome::Ready(link),
            _ => LinkOutcome::NoAlternatives,
        },
        PlayResponse::Pending { message } => LinkOutcome::Pending(message),
        PlayResponse::NoAlternatives { .. } => LinkOutcome::NoAlternatives,
    };
    Ok(outcome)
}

#[derive(Serialize)]
struct PlaylistUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publicity: Option<Visibility>,
}

/// Playlist service client with bearer-token auth
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    token: Arc<RwLock<Option<String>>>,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("playlist-player/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let response = self.authorized(builder).await.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::from_status(status, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ServiceError> {
        let bytes = self.send(builder).await?.bytes().await?;
        decode(&bytes)
    }

    // ========================================================================
    // Auth
    // ========================================================================

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User, ServiceError> {
        log_api_request!("register", username);
        let body = json!({ "username": username, "email": email, "password": password });
        let result = self.fetch(self.http.post(self.url("/signup")).json(&body)).await;
        log_api_result!("register", result);
        result
    }

    /// Exchange credentials for a bearer token and start using it.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ServiceError> {
        log_api_request!("login", username);
        let form = [("username", username), ("password", password)];
        let result: Result<TokenResponse, ServiceError> =
            self.fetch(self.http.post(self.url("/token")).form(&form)).await;
        log_api_result!("login", result);

        let token = result?.access_token;
        self.set_token(Some(token.clone())).await;
        Ok(token)
    }

    pub async fn current_user(&self) -> Result<User, ServiceError> {
        self.fetch(self.http.get(self.url("/users/me"))).await
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    pub async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, ServiceError> {
        let result = self.fetch(self.http.get(self.url("/playlists"))).await;
        log_api_result!("list_playlists", result);
        result
    }

    pub async fn public_playlists(&self) -> Result<Vec<PlaylistSummary>, ServiceError> {
        let result = self.fetch(self.http.get(self.url("/public-playlists"))).await;
        log_api_result!("public_playlists", result);
        result
    }

    pub async fn get_playlist(&self, playlist_id: i64) -> Result<PlaylistDetail, ServiceError> {
        log_api_request!("get_playlist", playlist_id);
        let result = self
            .fetch(self.http.get(self.url(&format!("/playlists/{playlist_id}"))))
            .await;
        log_api_result!("get_playlist", result);
        result
    }

    pub async fn create_playlist(
        &self,
        name: &str,
        publicity: Visibility,
    ) -> Result<PlaylistSummary, ServiceError> {
        log_api_request!("create_playlist", name, %publicity);
        let body = json!({ "name": name, "publicity": publicity });
        let result = self.fetch(self.http.post(self.url("/playlists")).json(&body)).await;
        log_api_result!("create_playlist", result);
        result
    }

    pub async fn update_playlist(
        &self,
        playlist_id: i64,
        name: Option<&str>,
        publicity: Option<Visibility>,
    ) -> Result<PlaylistSummary, ServiceError> {
        log_api_request!("update_playlist", playlist_id, ?name, ?publicity);
        let body = PlaylistUpdate { name, publicity };
        let result = self
            .fetch(
                self.http
                    .put(self.url(&format!("/playlists/{playlist_id}")))
                    .json(&body),
            )
            .await;
        log_api_result!("update_playlist", result);
        result
    }

    pub async fn delete_playlist(&self, playlist_id: i64) -> Result<(), ServiceError> {
        log_api_request!("delete_playlist", playlist_id);
        let result = self
            .send(self.http.delete(self.url(&format!("/playlists/{playlist_id}"))))
            .await
            .map(|_| ());
        log_api_result!("delete_playlist", result);
        result
    }

    pub async fn add_track(&self, playlist_id: i64, track: &Track) -> Result<Track, ServiceError> {
        log_api_request!("add_track", playlist_id, source_id = %track.source_id);
        let body = json!({
            "spotify_uid": track.source_id,
            "name": track.name,
            "author": track.author,
        });
        let result = self
            .fetch(
                self.http
                    .post(self.url(&format!("/playlists/{playlist_id}/tracks")))
                    .json(&body),
            )
            .await;
        log_api_result!("add_track", result);
        result
    }

    pub async fn remove_track(&self, playlist_id: i64, track_id: i64) -> Result<(), ServiceError> {
        log_api_request!("remove_track", playlist_id, track_id);
        let result = self
            .send(
                self.http
                    .delete(self.url(&format!("/playlists/{playlist_id}/tracks/{track_id}"))),
            )
            .await
            .map(|_| ());
        log_api_result!("remove_track", result);
        result
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    /// Every track the service has been asked to play, resolved or not
    pub async fn list_tracks(&self) -> Result<Vec<CatalogTrack>, ServiceError> {
        let result = self.fetch(self.http.get(self.url("/tracks"))).await;
        log_api_result!("list_tracks", result);
        result
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        log_api_request!("search", query);
        let result: Result<SearchResponse, ServiceError> = self
            .fetch(self.http.get(self.url("/search")).query(&[("q", query)]))
            .await;
        log_api_result!("search", result);
        Ok(result?.results)
    }

    /// Ask for a playable link, optionally reporting the one that just failed.
    pub async fn request_link(
        &self,
        source_id: &str,
        failed_link: Option<&str>,
    ) -> Result<LinkOutcome, ServiceError> {
        log_api_request!("request_link", source_id, ?failed_link);
        let mut builder = self.http.post(self.url(&format!("/tracks/play/{source_id}")));
        if let Some(link) = failed_link {
            builder = builder.query(&[("failed_link", link)]);
        }

        let bytes = self.send(builder).await?.bytes().await?;
        let result = link_outcome_from_body(&bytes);
        log_api_result!("request_link", result);
        result
    }
}

impl LinkResolver for ServiceClient {
    async fn resolve_link(&self, source_id: String, failed_link: Option<String>) -> Result<LinkOutcome> {
        Ok(self.request_link(&source_id, failed_link.as_deref()).await?)
    }
}
