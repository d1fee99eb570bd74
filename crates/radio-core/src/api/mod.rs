//! External collaborators: station directory, playlist service, song
//! recognition.  The session only talks to the traits; the concrete
//! clients are plain HTTP glue.

pub mod matching;
pub mod radio_browser;
pub mod shazam;
pub mod spotify;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use radio_proto::config::{Config, Credentials};
use radio_proto::protocol::Station;
use serde::Deserialize;
use tracing::warn;

use crate::recorder::ClipRecorder;

/// Best search hit from the playlist service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artist {
    pub name: String,
}

impl Track {
    pub fn first_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first_artist() {
            Some(artist) => write!(f, "{} - {}", artist, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Song identified from recorded audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedSong {
    pub uri: String,
    /// "title - subtitle"
    pub title: String,
}

#[async_trait]
pub trait StationDirectory: Send + Sync {
    /// A random station matching the configured filters.
    async fn fetch_station(&self) -> anyhow::Result<Station>;
}

#[async_trait]
pub trait PlaylistService: Send + Sync {
    async fn search_track(&self, query: &str) -> anyhow::Result<Track>;
    /// Returns a confirmation message.
    async fn add_to_playlist(&self, uri: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait SongRecognizer: Send + Sync {
    async fn detect_song(&self) -> anyhow::Result<DetectedSong>;
}

/// Stand-in for a collaborator whose credentials are missing.  Every call
/// fails with the same explanation.
#[derive(Debug, Clone)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl StationDirectory for Unavailable {
    async fn fetch_station(&self) -> anyhow::Result<Station> {
        anyhow::bail!("{}", self.reason)
    }
}

#[async_trait]
impl PlaylistService for Unavailable {
    async fn search_track(&self, _query: &str) -> anyhow::Result<Track> {
        anyhow::bail!("{}", self.reason)
    }

    async fn add_to_playlist(&self, _uri: &str) -> anyhow::Result<String> {
        anyhow::bail!("{}", self.reason)
    }
}

#[async_trait]
impl SongRecognizer for Unavailable {
    async fn detect_song(&self) -> anyhow::Result<DetectedSong> {
        anyhow::bail!("{}", self.reason)
    }
}

/// Concrete collaborators for a session.  Anything that can't be built
/// (missing secrets, missing ffmpeg) is replaced by [`Unavailable`].
pub struct Collaborators {
    pub directory: Arc<dyn StationDirectory>,
    pub playlist: Arc<dyn PlaylistService>,
    pub recognizer: Arc<dyn SongRecognizer>,
    /// Kept separately so the front-end can run the OAuth flow.
    pub spotify: Option<Arc<spotify::SpotifyClient>>,
}

impl Collaborators {
    pub fn from_config(config: &Config, credentials: &Credentials) -> Self {
        let directory: Arc<dyn StationDirectory> =
            match radio_browser::RadioBrowser::new(config.directory.clone()) {
                Ok(directory) => Arc::new(directory),
                Err(e) => {
                    warn!("station directory unavailable: {:#}", e);
                    Arc::new(Unavailable::new(format!("station directory unavailable: {:#}", e)))
                }
            };

        let spotify = match &credentials.spotify {
            Some(creds) => match spotify::SpotifyClient::new(creds.clone(), config.spotify.clone()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("spotify client unavailable: {:#}", e);
                    None
                }
            },
            None => None,
        };
        let playlist: Arc<dyn PlaylistService> = match &spotify {
            Some(client) => client.clone(),
            None => Arc::new(Unavailable::new(
                "Spotify is disabled: set CLIENT_ID and CLIENT_SECRET",
            )),
        };

        let recognizer: Arc<dyn SongRecognizer> = match &credentials.rapidapi_key {
            None => Arc::new(Unavailable::new(
                "song detection is disabled: set RAPID_API_KEY",
            )),
            Some(key) => {
                let built = ClipRecorder::from_config(config.recognition.clone()).and_then(|recorder| {
                    shazam::ShazamRecognizer::new(
                        key.clone(),
                        config.recognition.rapidapi_host.clone(),
                        recorder,
                        playlist.clone(),
                    )
                });
                match built {
                    Ok(recognizer) => Arc::new(recognizer),
                    Err(e) => {
                        warn!("song detection unavailable: {:#}", e);
                        Arc::new(Unavailable::new(format!("song detection unavailable: {:#}", e)))
                    }
                }
            }
        };

        Self {
            directory,
            playlist,
            recognizer,
            spotify,
        }
    }
}
