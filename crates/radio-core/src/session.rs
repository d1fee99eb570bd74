//! Session controller: turns user commands into history moves, player
//! calls and collaborator requests.  Shared by both front-ends.

use std::sync::Arc;

use radio_proto::config::NavigationConfig;
use radio_proto::protocol::Station;
use tokio::sync::Mutex;
use tracing::info;

use crate::api::{matching, DetectedSong, PlaylistService, SongRecognizer, StationDirectory, Track};
use crate::history::{NavigationError, StationHistory};
use crate::now_playing::CurrentSong;
use crate::player::{PlaybackError, Player};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("error fetching station: {0:#}")]
    Directory(anyhow::Error),
    #[error("playlist error: {0:#}")]
    Playlist(anyhow::Error),
    #[error("song detection failed: {0:#}")]
    Recognition(anyhow::Error),
    #[error("song not currently available, wait for a track to play")]
    NoSong,
}

impl SessionError {
    /// Playback failures are already on the event stream as status events.
    pub fn already_published(&self) -> bool {
        matches!(
            self,
            SessionError::Playback(e)
                if !matches!(e, PlaybackError::ShutDown | PlaybackError::Cancelled)
        )
    }

    /// The user stopped playback while this command was still running.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Playback(PlaybackError::Cancelled))
    }
}

/// Result of "add current song".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added { track: Track, message: String },
    /// The search hit looks different from the now-playing text; call
    /// `confirm_add` if the user agrees.
    NeedsConfirmation(Track),
}

pub struct Session {
    player: Player,
    directory: Arc<dyn StationDirectory>,
    playlist: Arc<dyn PlaylistService>,
    recognizer: Arc<dyn SongRecognizer>,
    navigation: NavigationConfig,
    // Held for a whole navigation command so a background fetch and a
    // keypress can't interleave history updates.
    history: Mutex<StationHistory>,
}

impl Session {
    pub fn new(
        player: Player,
        directory: Arc<dyn StationDirectory>,
        playlist: Arc<dyn PlaylistService>,
        recognizer: Arc<dyn SongRecognizer>,
        navigation: NavigationConfig,
    ) -> Self {
        Self {
            player,
            directory,
            playlist,
            recognizer,
            navigation,
            history: Mutex::new(StationHistory::new()),
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    async fn fetch(&self) -> Result<Station, SessionError> {
        self.directory
            .fetch_station()
            .await
            .map_err(SessionError::Directory)
    }

    /// Plays unless `stop()` was called after `generation` was read.
    async fn play(&self, station: &Station, generation: u64) -> Result<(), SessionError> {
        self.player
            .play_if(generation, &station.url, station.label())
            .await?;
        Ok(())
    }

    /// Fetch and play a random station.
    pub async fn play_random(&self) -> Result<Station, SessionError> {
        let generation = self.player.stop_generation();
        let mut history = self.history.lock().await;
        let station = self.fetch().await?;
        self.play(&station, generation).await?;
        history.commit_random(station.clone(), self.navigation.random_remembers_current);
        info!("session: random -> {}", station.label());
        Ok(station)
    }

    /// Replays the station left by `previous`, otherwise fetches a new one.
    pub async fn play_next(&self) -> Result<Station, SessionError> {
        let generation = self.player.stop_generation();
        let mut history = self.history.lock().await;
        if let Some(station) = history.resume_target().cloned() {
            self.play(&station, generation).await?;
            history.commit_resume();
            info!("session: next (resume) -> {}", station.label());
            return Ok(station);
        }

        let station = self.fetch().await?;
        self.play(&station, generation).await?;
        history.commit_next(station.clone());
        info!("session: next -> {}", station.label());
        Ok(station)
    }

    /// One step back.  A second step without `next` in between is refused.
    pub async fn play_previous(&self) -> Result<Station, SessionError> {
        let generation = self.player.stop_generation();
        let mut history = self.history.lock().await;
        let station = history.rewind_target()?.clone();
        self.play(&station, generation).await?;
        history.commit_rewind();
        info!("session: previous -> {}", station.label());
        Ok(station)
    }

    pub async fn stop(&self) {
        self.player.stop().await;
    }

    /// Station currently on air (or last played).
    pub async fn current_station(&self) -> Option<Station> {
        self.history.lock().await.playing().cloned()
    }

    pub async fn current_song(&self) -> CurrentSong {
        self.player.now_playing().get().await
    }

    /// Search the now-playing text and add the hit, unless it needs the
    /// user's confirmation first.
    pub async fn add_current_song(&self) -> Result<AddOutcome, SessionError> {
        let song = self.current_song().await;
        let query = song.title().ok_or(SessionError::NoSong)?.to_string();

        let track = self
            .playlist
            .search_track(&query)
            .await
            .map_err(SessionError::Playlist)?;

        if self.navigation.confirm_fuzzy_matches && !matching::is_close_match(&query, &track) {
            info!(
                "session: search hit {:?} is far from {:?}, asking",
                track.to_string(),
                query
            );
            return Ok(AddOutcome::NeedsConfirmation(track));
        }

        let message = self.add_uri(&track.uri).await?;
        Ok(AddOutcome::Added { track, message })
    }

    pub async fn confirm_add(&self, track: &Track) -> Result<String, SessionError> {
        self.add_uri(&track.uri).await
    }

    pub async fn detect_song(&self) -> Result<DetectedSong, SessionError> {
        self.recognizer
            .detect_song()
            .await
            .map_err(SessionError::Recognition)
    }

    pub async fn add_detected(&self, song: &DetectedSong) -> Result<String, SessionError> {
        self.add_uri(&song.uri).await
    }

    async fn add_uri(&self, uri: &str) -> Result<String, SessionError> {
        self.playlist
            .add_to_playlist(uri)
            .await
            .map_err(SessionError::Playlist)
    }

    /// Guaranteed last call before exit: no player may outlive the session.
    pub async fn shutdown(&self) {
        info!("session: shutting down");
        self.player.shutdown().await;
    }
}
