//! Song recognition through the Shazam RapidAPI endpoint.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, info};

use super::{DetectedSong, PlaylistService, SongRecognizer};
use crate::recorder::ClipRecorder;

#[derive(Debug, Default, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub track: Option<DetectedTrack>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetectedTrack {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub hub: Hub,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hub {
    #[serde(default)]
    pub providers: Vec<Provider>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Provider {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub uri: String,
}

/// Where the track's Spotify URI comes from.
#[derive(Debug, PartialEq, Eq)]
pub enum SpotifyLink<'a> {
    Track(&'a str),
    /// Only a search action: resolve "title subtitle" through the playlist
    /// service's search.
    Search,
}

impl DetectedTrack {
    pub fn display_title(&self) -> String {
        format!("{} - {}", self.title, self.subtitle)
    }

    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.subtitle)
    }

    /// First `spotify:track:` action of the SPOTIFY provider, else a
    /// `spotify:search:` fallback.
    pub fn spotify_link(&self) -> Option<SpotifyLink<'_>> {
        let provider = self.hub.providers.iter().find(|p| p.kind == "SPOTIFY")?;
        if let Some(action) = provider
            .actions
            .iter()
            .find(|a| a.uri.starts_with("spotify:track:"))
        {
            return Some(SpotifyLink::Track(&action.uri));
        }
        provider
            .actions
            .iter()
            .any(|a| a.uri.starts_with("spotify:search:"))
            .then_some(SpotifyLink::Search)
    }
}

pub struct ShazamRecognizer {
    http: reqwest::Client,
    endpoint: String,
    host: String,
    api_key: String,
    recorder: ClipRecorder,
    search: Arc<dyn PlaylistService>,
}

impl ShazamRecognizer {
    pub fn new(
        api_key: String,
        host: String,
        recorder: ClipRecorder,
        search: Arc<dyn PlaylistService>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: format!("https://{}/songs/v2/detect", host),
            host,
            api_key,
            recorder,
            search,
        })
    }

    async fn identify(&self, clip: &[u8]) -> Result<DetectResponse> {
        let body = base64::engine::general_purpose::STANDARD.encode(clip);
        let response = self
            .http
            .post(&self.endpoint)
            .header("content-type", "text/plain")
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .body(body)
            .send()
            .await
            .context("Recognition request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("non-200 response: {}\n{}", status, body);
        }
        response
            .json()
            .await
            .context("Failed to parse recognition response")
    }

    async fn resolve(&self, track: &DetectedTrack) -> Result<DetectedSong> {
        let uri = match track.spotify_link() {
            Some(SpotifyLink::Track(uri)) => uri.to_string(),
            Some(SpotifyLink::Search) => {
                debug!("shazam: no direct track URI, searching {:?}", track.search_query());
                self.search
                    .search_track(&track.search_query())
                    .await
                    .context("Error getting track from Spotify")?
                    .uri
            }
            None => anyhow::bail!("song URI could not be found"),
        };
        Ok(DetectedSong {
            uri,
            title: track.display_title(),
        })
    }
}

#[async_trait]
impl SongRecognizer for ShazamRecognizer {
    async fn detect_song(&self) -> Result<DetectedSong> {
        let clip = self.recorder.record().await.context("error recording clip")?;
        let response = self.identify(&clip).await.context("error identifying song")?;
        let track = response.track.context("no match for the recorded clip")?;
        let song = self.resolve(&track).await?;
        info!("shazam: detected {} ({})", song.title, song.uri);
        Ok(song)
    }
}
