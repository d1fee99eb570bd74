//! Spotify Web API client: OAuth token upkeep, track search, and adding to
//! the configured playlist.

pub mod auth;
pub mod token;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use radio_proto::config::{SpotifyConfig, SpotifyCredentials};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{PlaylistService, Track};
use token::{Token, TokenResponse};

pub const API_BASE: &str = "https://api.spotify.com/v1";
pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Stored playlist handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(rename = "playlist_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylist {
    id: String,
    #[serde(default)]
    name: String,
}

pub struct SpotifyClient {
    http: reqwest::Client,
    credentials: SpotifyCredentials,
    config: SpotifyConfig,
    api_base: String,
    token_url: String,
    token: Mutex<Option<Token>>,
}

impl SpotifyClient {
    pub fn new(credentials: SpotifyCredentials, config: SpotifyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            credentials,
            config,
            api_base: API_BASE.to_string(),
            token_url: TOKEN_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Point at other hosts (a local stub in tests).
    pub fn with_endpoints(mut self, api_base: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.token_url = token_url.into();
        self
    }

    pub fn redirect_uri(&self) -> String {
        auth::redirect_uri(self.config.redirect_port)
    }

    /// Whether a usable (or refreshable) token is available.
    pub async fn is_authenticated(&self) -> bool {
        self.access_token().await.is_ok()
    }

    /// Run the authorization-code flow unless already authenticated.
    /// `show_url` receives the authorize URL for the user to open.  Creates
    /// the playlist when no handle is stored yet.
    pub async fn authenticate(&self, show_url: impl FnOnce(&str) + Send) -> Result<String> {
        if self.is_authenticated().await {
            return Ok("Spotify already authenticated.".to_string());
        }

        let state = auth::random_state();
        let redirect_uri = self.redirect_uri();
        let server = auth::CallbackServer::bind(self.config.redirect_port, state.clone()).await?;
        let url = auth::authorize_url(&self.credentials.client_id, &redirect_uri, &state)?;
        show_url(&url);

        let code = server
            .wait_for_code(Duration::from_secs(self.config.auth_timeout_secs))
            .await
            .context("Failed to receive auth code")?;

        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .await
            .context("Failed to exchange code for token")?
            .into_token(None, chrono::Utc::now().timestamp());
        self.store_token(token.clone()).await?;
        info!("spotify: authenticated");

        if self.load_playlist()?.is_none() {
            let playlist = self.create_playlist(&token.access_token).await?;
            return Ok(format!(
                "Authentication successful. Playlist {} created.",
                playlist.name
            ));
        }
        Ok("Authentication successful.".to_string())
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let mut form: Vec<(&str, &str)> = params.to_vec();
        form.push(("client_id", self.credentials.client_id.as_str()));
        form.push(("client_secret", self.credentials.client_secret.as_str()));

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .context("Token request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Token endpoint returned {}: {}", status, body);
        }
        response
            .json()
            .await
            .context("Failed to parse token response")
    }

    async fn store_token(&self, token: Token) -> Result<()> {
        token::save_token(&self.config.token_file, &token)?;
        *self.token.lock().await = Some(token);
        Ok(())
    }

    /// Valid access token, loading it from disk and refreshing as needed.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if cached.is_none() {
            *cached = token::load_token(&self.config.token_file)?;
        }
        let current = cached
            .clone()
            .context("Spotify is not authenticated yet")?;

        let now = chrono::Utc::now().timestamp();
        if !current.is_expired(now) {
            return Ok(current.access_token);
        }

        debug!("spotify: access token expired, refreshing");
        let refreshed = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .await
            .context("Failed to refresh token")?
            .into_token(Some(&current.refresh_token), now);
        token::save_token(&self.config.token_file, &refreshed)?;
        let access = refreshed.access_token.clone();
        *cached = Some(refreshed);
        Ok(access)
    }

    fn load_playlist(&self) -> Result<Option<Playlist>> {
        load_playlist(&self.config.playlist_file)
    }

    async fn create_playlist(&self, access_token: &str) -> Result<Playlist> {
        let response = self
            .http
            .post(format!("{}/me/playlists", self.api_base))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "name": self.config.playlist_name }))
            .send()
            .await
            .context("Create playlist request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to create playlist: {} {}", status, body);
        }
        let created: CreatedPlaylist = response
            .json()
            .await
            .context("Failed to parse playlist response")?;

        let playlist = Playlist {
            id: created.id,
            name: if created.name.is_empty() {
                self.config.playlist_name.clone()
            } else {
                created.name
            },
        };
        save_playlist(&self.config.playlist_file, &playlist)?;
        info!("spotify: created playlist {} ({})", playlist.name, playlist.id);
        Ok(playlist)
    }

    async fn playlist(&self, access_token: &str) -> Result<Playlist> {
        match self.load_playlist()? {
            Some(playlist) => Ok(playlist),
            None => self.create_playlist(access_token).await,
        }
    }
}

pub fn load_playlist(path: &Path) -> Result<Option<Playlist>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let playlist = serde_json::from_str(&data).context("Failed to parse playlist file")?;
    Ok(Some(playlist))
}

pub fn save_playlist(path: &Path, playlist: &Playlist) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(playlist)?)?;
    Ok(())
}

#[async_trait]
impl PlaylistService for SpotifyClient {
    async fn search_track(&self, query: &str) -> Result<Track> {
        let query = query.trim();
        if query.is_empty() {
            anyhow::bail!("invalid song string: {:?}", query);
        }
        let access = self.access_token().await?;

        let response = self
            .http
            .get(format!("{}/search", self.api_base))
            .bearer_auth(&access)
            .query(&[("q", query), ("type", "track"), ("limit", "1")])
            .send()
            .await
            .context("Search request failed")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Spotify search failed: {}", status);
        }

        let data: SearchResponse = response
            .json()
            .await
            .context("Could not decode search response")?;
        data.tracks
            .items
            .into_iter()
            .next()
            .with_context(|| format!("no tracks found for {:?}", query))
    }

    async fn add_to_playlist(&self, uri: &str) -> Result<String> {
        let access = self.access_token().await?;
        let playlist = self.playlist(&access).await?;

        let response = self
            .http
            .post(format!("{}/playlists/{}/tracks", self.api_base, playlist.id))
            .bearer_auth(&access)
            .json(&serde_json::json!({ "uris": [uri] }))
            .send()
            .await
            .context("Add to playlist request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to add track: {} {}", status, body);
        }
        info!("spotify: added {} to {}", uri, playlist.name);
        Ok("Song Added".to_string())
    }
}
