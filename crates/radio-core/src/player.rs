//! mpv process manager.
//!
//! ```text
//!   Player::play(url, label)
//!         │  (manager lock held: stop old → spawn new)
//!         ├── scanner_task     ← reads mpv stdout line by line
//!         │                        └── TagScanner → NowPlaying + SongChanged
//!         └── supervisor_task  ← owns the Child, awaits exit or a kill request
//!                                  └── classify → StatusChanged (unless stopped)
//! ```
//!
//! At most one mpv process is alive.  `stop()` kills the whole process group
//! and waits for the supervisor to reap it before releasing the lock, so a
//! concurrent `play()` can never overlap with the old process.
//!
//! Every `stop()` bumps a generation counter.  A command that looked up a
//! station first passes the generation it started under to `play_if`, and
//! a stop issued meanwhile cancels the spawn.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use radio_proto::config::PlayerConfig;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{EventPublisher, NOW_PLAYING_PREFIX};
use crate::metadata::TagScanner;
use crate::now_playing::NowPlaying;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("failed to start player {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("player stdout pipe unavailable")]
    NoStdout,
    #[error("player is shut down")]
    ShutDown,
    #[error("playback cancelled by stop")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub program: PathBuf,
    pub audio_filter: String,
    pub extra_args: Vec<String>,
    /// Upper bound on waiting for a killed process to be reaped.
    pub stop_grace: Duration,
}

impl PlayerSettings {
    /// Resolve mpv from the config override, then beside the exe / PATH.
    /// Falls back to the bare name so a missing binary surfaces as a spawn
    /// error on `play` rather than at startup.
    pub fn from_config(config: &PlayerConfig) -> Self {
        let program = config
            .binary
            .clone()
            .or_else(radio_proto::platform::find_mpv_binary)
            .unwrap_or_else(|| PathBuf::from("mpv"));
        Self {
            program,
            audio_filter: config.audio_filter.clone(),
            extra_args: config.extra_args.clone(),
            stop_grace: Duration::from_millis(config.stop_grace_ms),
        }
    }

    fn args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["--no-video".to_string()];
        if !self.audio_filter.is_empty() {
            args.push(format!("--af={}", self.audio_filter));
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(url.to_string());
        args
    }
}

/// How a player process ended, from the manager's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Killed by our own `stop()`.  Never reported.
    Stopped,
    /// Clean exit: the stream ended.
    Finished,
    Failed(String),
}

struct Running {
    pid: u32,
    label: String,
    stop_requested: Arc<AtomicBool>,
    kill_tx: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<()>,
    scanner: JoinHandle<()>,
}

struct Inner {
    settings: PlayerSettings,
    events: EventPublisher,
    now_playing: NowPlaying,
    running: Mutex<Option<Running>>,
    // Set under the `running` lock; no spawn happens after it.
    closed: AtomicBool,
    // Bumped under the `running` lock by every `stop()`.
    stop_generation: AtomicU64,
}

/// Cheaply cloneable handle to the single playback slot.
#[derive(Clone)]
pub struct Player {
    inner: Arc<Inner>,
}

impl Player {
    pub fn new(settings: PlayerSettings, events: EventPublisher, now_playing: NowPlaying) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                events,
                now_playing,
                running: Mutex::new(None),
                closed: AtomicBool::new(false),
                stop_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn events(&self) -> &EventPublisher {
        &self.inner.events
    }

    pub fn now_playing(&self) -> &NowPlaying {
        &self.inner.now_playing
    }

    /// Number of `stop()` calls so far.
    pub fn stop_generation(&self) -> u64 {
        self.inner.stop_generation.load(Ordering::SeqCst)
    }

    /// Stop whatever is playing, then start mpv on `url`.  Returns once the
    /// process is spawned; song and exit updates arrive as events.
    pub async fn play(&self, url: &str, label: &str) -> Result<(), PlaybackError> {
        self.start(None, url, label).await
    }

    /// Like `play`, but fails with `Cancelled` (and spawns nothing) when
    /// `stop()` ran since `generation` was read.
    pub async fn play_if(
        &self,
        generation: u64,
        url: &str,
        label: &str,
    ) -> Result<(), PlaybackError> {
        self.start(Some(generation), url, label).await
    }

    async fn start(
        &self,
        generation: Option<u64>,
        url: &str,
        label: &str,
    ) -> Result<(), PlaybackError> {
        let mut slot = self.inner.running.lock().await;
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(PlaybackError::ShutDown);
        }
        if let Some(generation) = generation {
            if generation != self.stop_generation() {
                info!("player: {} cancelled by an intervening stop", label);
                return Err(PlaybackError::Cancelled);
            }
        }
        if let Some(old) = slot.take() {
            self.terminate(old).await;
        }
        self.inner.now_playing.reset().await;

        let settings = &self.inner.settings;
        info!("player: starting {} ({})", label, url);
        let mut cmd = Command::new(&settings.program);
        cmd.args(settings.args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        detach(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = PlaybackError::Spawn {
                    program: settings.program.display().to_string(),
                    source,
                };
                warn!("player: {}", err);
                self.inner.events.status(format!("Error: {}", err));
                return Err(err);
            }
        };

        let pid = child.id().unwrap_or_default();
        let Some(stdout) = child.stdout.take() else {
            warn!("player: no stdout pipe for pid {}, killing it", pid);
            kill_group(pid, &mut child).await;
            let _ = child.wait().await;
            self.inner.events.status("Error: player stdout pipe unavailable");
            return Err(PlaybackError::NoStdout);
        };

        // Before the scanner starts, so it always precedes the first song.
        self.inner.events.status(format!("{}{}", NOW_PLAYING_PREFIX, label));

        let stop_requested = Arc::new(AtomicBool::new(false));
        let (kill_tx, kill_rx) = oneshot::channel();

        let scanner = tokio::spawn(scanner_task(
            stdout,
            self.inner.now_playing.clone(),
            self.inner.events.clone(),
        ));
        let supervisor = tokio::spawn(supervisor_task(
            child,
            pid,
            label.to_string(),
            stop_requested.clone(),
            kill_rx,
            self.inner.events.clone(),
        ));

        debug!("player: pid {} started for {}", pid, label);
        *slot = Some(Running {
            pid,
            label: label.to_string(),
            stop_requested,
            kill_tx: Some(kill_tx),
            supervisor,
            scanner,
        });
        Ok(())
    }

    /// Kill the running player (and its children).  No-op when idle.
    pub async fn stop(&self) {
        let mut slot = self.inner.running.lock().await;
        self.inner.stop_generation.fetch_add(1, Ordering::SeqCst);
        if let Some(running) = slot.take() {
            self.terminate(running).await;
            self.inner.now_playing.reset().await;
        }
    }

    /// Stop for good: later `play` calls fail with `ShutDown`, so a
    /// command still in flight can't start a player after this returns.
    pub async fn shutdown(&self) {
        let mut slot = self.inner.running.lock().await;
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some(running) = slot.take() {
            self.terminate(running).await;
            self.inner.now_playing.reset().await;
        }
    }

    /// PID of the live player, `None` when idle or after it exited.
    pub async fn current_pid(&self) -> Option<u32> {
        let slot = self.inner.running.lock().await;
        slot.as_ref()
            .filter(|r| !r.supervisor.is_finished())
            .map(|r| r.pid)
    }

    pub async fn is_playing(&self) -> bool {
        self.current_pid().await.is_some()
    }

    async fn terminate(&self, mut running: Running) {
        let grace = self.inner.settings.stop_grace;
        debug!("player: stopping pid {} ({})", running.pid, running.label);

        // Marker first, then the signal: the supervisor must see it when
        // the exit status arrives.
        running.stop_requested.store(true, Ordering::SeqCst);
        if let Some(tx) = running.kill_tx.take() {
            // Err means the supervisor already reaped the process.
            let _ = tx.send(());
        }

        if tokio::time::timeout(grace, &mut running.supervisor).await.is_err() {
            warn!("player: pid {} not reaped after {:?}, aborting supervisor", running.pid, grace);
            running.supervisor.abort();
        }
        if tokio::time::timeout(grace, &mut running.scanner).await.is_err() {
            warn!("player: output reader for pid {} still open, aborting", running.pid);
            running.scanner.abort();
        }
    }
}

// ── background tasks ──────────────────────────────────────────────────────────

async fn scanner_task<R>(output: R, now_playing: NowPlaying, events: EventPublisher)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(output);
    let mut scanner = TagScanner::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']);
                debug!("mpv: {}", line);
                if let Some(song) = scanner.feed(line) {
                    let text = song.to_string();
                    now_playing.set(song).await;
                    info!("player: now playing {:?}", text);
                    events.song(text);
                }
            }
            Err(e) => {
                warn!("player: error reading mpv output: {}", e);
                events.status(format!("Error reading player output: {}", e));
                break;
            }
        }
    }
    debug!("player: output reader finished");
}

async fn supervisor_task(
    mut child: Child,
    pid: u32,
    label: String,
    stop_requested: Arc<AtomicBool>,
    kill_rx: oneshot::Receiver<()>,
    events: EventPublisher,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = kill_rx => {
            // Child is still unreaped here, so the pid cannot have been reused.
            kill_group(pid, &mut child).await;
            child.wait().await
        }
    };

    match classify_exit(&status, stop_requested.load(Ordering::SeqCst)) {
        ExitOutcome::Stopped => debug!("player: pid {} stopped", pid),
        ExitOutcome::Finished => {
            info!("player: {} finished", label);
            events.status("Playback finished.");
        }
        ExitOutcome::Failed(reason) => {
            warn!("player: {} exited abnormally: {}", label, reason);
            events.status(format!("Playback error: {}", reason));
        }
    }
}

/// Sort an exit into stopped / finished / failed.  Only a SIGKILL while a
/// stop was pending counts as stopped.
pub fn classify_exit(status: &std::io::Result<ExitStatus>, stop_requested: bool) -> ExitOutcome {
    let status = match status {
        Ok(status) => status,
        Err(e) => return ExitOutcome::Failed(format!("wait failed: {}", e)),
    };
    if stop_requested && killed_by_stop(status) {
        return ExitOutcome::Stopped;
    }
    if status.success() {
        ExitOutcome::Finished
    } else {
        ExitOutcome::Failed(status.to_string())
    }
}

#[cfg(unix)]
fn killed_by_stop(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(nix::sys::signal::Signal::SIGKILL as i32)
}

#[cfg(windows)]
fn killed_by_stop(status: &ExitStatus) -> bool {
    // taskkill /F leaves exit code 1.
    !status.success()
}

// ── platform process control ─────────────────────────────────────────────────

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    // Own process group: terminal Ctrl-C doesn't reach mpv, and killpg
    // takes out any decoder children with it.
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(unix)]
async fn kill_group(pid: u32, child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // pgid 0 would mean our own group.
    if pid == 0 {
        let _ = child.start_kill();
        return;
    }
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!("player: killpg({}) failed: {}, killing leader only", pid, e);
        let _ = child.start_kill();
    }
}

#[cfg(windows)]
async fn kill_group(pid: u32, child: &mut Child) {
    let result = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if !matches!(result, Ok(s) if s.success()) {
        debug!("player: taskkill {} failed, killing leader only", pid);
        let _ = child.start_kill();
    }
}
