use std::fmt;
use std::sync::Arc;

use radio_proto::protocol::SONG_UNAVAILABLE;
use tokio::sync::RwLock;

/// What the live stream last reported as its title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CurrentSong {
    /// Nothing reported yet for this station.
    #[default]
    Unknown,
    /// The station sent an empty or `-` title.
    Unavailable,
    Title(String),
}

impl CurrentSong {
    /// Title usable as a search query, if any.
    pub fn title(&self) -> Option<&str> {
        match self {
            CurrentSong::Title(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for CurrentSong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrentSong::Unknown => Ok(()),
            CurrentSong::Unavailable => f.write_str(SONG_UNAVAILABLE),
            CurrentSong::Title(t) => f.write_str(t),
        }
    }
}

/// Shared now-playing slot.  Written by the metadata scanner, read by
/// anyone (e.g. "add current song").  Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct NowPlaying {
    song: Arc<RwLock<CurrentSong>>,
}

impl NowPlaying {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> CurrentSong {
        self.song.read().await.clone()
    }

    pub async fn set(&self, song: CurrentSong) {
        *self.song.write().await = song;
    }

    pub async fn reset(&self) {
        self.set(CurrentSong::Unknown).await;
    }
}
