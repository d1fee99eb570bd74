#![allow(dead_code)]

use std::collections::VecDeque;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use radio_core::api::{Artist, DetectedSong, PlaylistService, SongRecognizer, StationDirectory, Track};
use radio_core::{EventPublisher, NowPlaying, Player, PlayerEvent, PlayerSettings};
use radio_proto::protocol::Station;
use tokio::sync::broadcast;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Executable `/bin/sh` script standing in for mpv.  mpv's arguments are
/// passed through and ignored.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn settings(program: PathBuf) -> PlayerSettings {
    PlayerSettings {
        program,
        audio_filter: "lavfi=[loudnorm=I=-16:TP=-1.5:LRA=11]".to_string(),
        extra_args: Vec::new(),
        stop_grace: Duration::from_secs(2),
    }
}

pub fn player(program: PathBuf) -> Player {
    Player::new(settings(program), EventPublisher::new(256), NowPlaying::new())
}

/// A script that prints nothing and plays "forever".
pub fn idle_player(dir: &Path) -> Player {
    player(write_script(dir, "mpv", "exec sleep 30"))
}

/// Alive and not a zombie.
pub fn pid_alive(pid: u32) -> bool {
    if cfg!(target_os = "linux") {
        return match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => false,
        };
    }
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

pub async fn wait_until_dead(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !pid_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    !pid_alive(pid)
}

/// Wait for the first event matching `pred`, skipping others.
pub async fn recv_matching(
    rx: &mut broadcast::Receiver<PlayerEvent>,
    pred: impl Fn(&PlayerEvent) -> bool,
) -> Option<PlayerEvent> {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

pub fn is_failure(event: &PlayerEvent) -> bool {
    matches!(event, PlayerEvent::StatusChanged(s) if s.starts_with("Playback error"))
}

pub fn drain(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn station(name: &str) -> Station {
    Station::new(name, format!("http://{}.example/stream", name))
}

// ── fake collaborators ────────────────────────────────────────────────────────

/// Hands out the queued stations in order, then fails.
pub struct FakeDirectory {
    stations: Mutex<VecDeque<Station>>,
    fetches: AtomicUsize,
    delay: Duration,
}

impl FakeDirectory {
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            stations: Mutex::new(stations.into()),
            fetches: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Every lookup takes `delay`, like a slow mirror.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationDirectory for FakeDirectory {
    async fn fetch_station(&self) -> anyhow::Result<Station> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.stations
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no stations found"))
    }
}

pub struct FakePlaylist {
    pub hit: Track,
    pub searches: Mutex<Vec<String>>,
    pub added: Mutex<Vec<String>>,
}

impl FakePlaylist {
    pub fn returning(artist: &str, name: &str) -> Self {
        Self {
            hit: Track {
                uri: format!("spotify:track:{}", name.replace(' ', "")),
                name: name.to_string(),
                artists: vec![Artist {
                    name: artist.to_string(),
                }],
            },
            searches: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
        }
    }

    pub fn added(&self) -> Vec<String> {
        self.added.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaylistService for FakePlaylist {
    async fn search_track(&self, query: &str) -> anyhow::Result<Track> {
        self.searches.lock().unwrap().push(query.to_string());
        Ok(self.hit.clone())
    }

    async fn add_to_playlist(&self, uri: &str) -> anyhow::Result<String> {
        self.added.lock().unwrap().push(uri.to_string());
        Ok("Song Added".to_string())
    }
}

pub struct FakeRecognizer(pub DetectedSong);

#[async_trait]
impl SongRecognizer for FakeRecognizer {
    async fn detect_song(&self) -> anyhow::Result<DetectedSong> {
        Ok(self.0.clone())
    }
}
