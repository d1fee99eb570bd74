mod action;
mod app;
mod app_state;
mod component;
mod components;
mod theme;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use radio_core::api::Collaborators;
use radio_core::audio_switch::AudioSwitcher;
use radio_core::logging;
use radio_core::{EventPublisher, NowPlaying, Player, PlayerSettings, Session};
use radio_proto::config::{Config, Credentials};
use tracing::{debug, info, warn};

/// Random internet radio, terminal UI.
#[derive(Parser, Debug)]
#[command(name = "cli-radio-tui", version, about)]
struct Args {
    /// Only look for mpv, ffmpeg and SwitchAudioSource on PATH
    #[arg(long)]
    use_system_deps: bool,

    /// Leave the audio output device alone
    #[arg(long)]
    no_audio_switch: bool,

    /// Config file (default: ~/.config/cli-radio/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let dotenv = dotenvy::dotenv();
    radio_proto::platform::set_use_system_deps(args.use_system_deps);

    // ── Logging: file + broadcast layer (warnings show up in the log panel) ──
    let events = EventPublisher::new(1024);
    let log_path = logging::default_log_path("cli-radio-tui");
    logging::init_file_logging(&log_path, &events)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    eprintln!("cli-radio log: {}", log_path.display());
    info!("cli-radio-tui starting…");
    match dotenv {
        Ok(path) => info!("loaded {}", path.display()),
        Err(e) => debug!("no .env loaded: {}", e),
    }

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("config unreadable, using defaults: {:#}", e);
            Config::default()
        }),
    };

    // ── Startup: spotify login and audio routing, before the screen is taken ─
    let mut startup_status = "All set! Use the menu below.".to_string();

    let collaborators = Collaborators::from_config(&config, &Credentials::from_env());
    if let Some(spotify) = &collaborators.spotify {
        let result = spotify
            .authenticate(|url| {
                println!("Open this URL in your browser to log in to Spotify:\n{}", url)
            })
            .await;
        if let Err(e) = result {
            warn!("spotify authentication failed: {:#}", e);
            startup_status = format!("Auth failed: {:#}", e);
        }
    }

    let audio_guard = if config.audio.enabled && !args.no_audio_switch {
        match AudioSwitcher::from_config(config.audio.clone()).and_then(AudioSwitcher::setup) {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("audio setup failed: {:#}", e);
                startup_status = format!("Audio setup failed: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    // ── Session ──────────────────────────────────────────────────────────────
    let player = Player::new(
        PlayerSettings::from_config(&config.player),
        events.clone(),
        NowPlaying::new(),
    );
    let session = Arc::new(Session::new(
        player,
        collaborators.directory,
        collaborators.playlist,
        collaborators.recognizer,
        config.navigation.clone(),
    ));

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let result = app::App::new(startup_status)
        .run(session.clone(), events.subscribe())
        .await;

    session.shutdown().await;
    drop(audio_guard);
    info!("cli-radio-tui stopped");
    result
}
