mod repl;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use radio_core::api::Collaborators;
use radio_core::audio_switch::{AudioRouteGuard, AudioSwitcher};
use radio_core::{logging, signals};
use radio_core::{EventPublisher, NowPlaying, Player, PlayerEvent, PlayerSettings, Session};
use radio_proto::config::{AudioConfig, Config, Credentials};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Random internet radio in the terminal.
#[derive(Parser, Debug)]
#[command(name = "cli-radio", version, about)]
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

    let events = EventPublisher::new(1024);
    let log_path = logging::default_log_path("cli-radio");
    logging::init_file_logging(&log_path, &events)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    info!("cli-radio starting…");
    match dotenv {
        Ok(path) => info!("loaded {}", path.display()),
        Err(e) => debug!("no .env loaded: {}", e),
    }

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("config unreadable, using defaults: {:#}", e);
            Config::default()
        }),
    };

    println!("Welcome");

    let audio_guard = if config.audio.enabled && !args.no_audio_switch {
        Some(setup_audio(config.audio.clone())?)
    } else {
        None
    };

    let collaborators = Collaborators::from_config(&config, &Credentials::from_env());
    if let Some(spotify) = &collaborators.spotify {
        let result = spotify
            .authenticate(|url| {
                println!("Open this URL in your browser to log in to Spotify:\n{}", url)
            })
            .await;
        match result {
            Ok(message) => println!("{}", message),
            Err(e) => {
                warn!("spotify authentication failed: {:#}", e);
                println!("Spotify authentication failed: {:#}", e);
            }
        }
    }

    let player = Player::new(
        PlayerSettings::from_config(&config.player),
        events.clone(),
        NowPlaying::new(),
    );
    let session = Session::new(
        player,
        collaborators.directory,
        collaborators.playlist,
        collaborators.recognizer,
        config.navigation.clone(),
    );

    let printer = tokio::spawn(print_events(events.subscribe()));

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut repl = repl::Repl::new(&session, stdin, std::io::stdout());

    let (result, interrupted) = tokio::select! {
        result = repl.run() => (result, false),
        _ = signals::shutdown_signal() => {
            println!();
            (Ok(()), true)
        }
    };

    session.shutdown().await;
    printer.abort();
    drop(audio_guard);
    info!("cli-radio stopped");

    if interrupted {
        // the pending stdin read can't be cancelled and would hold up runtime shutdown
        std::process::exit(130);
    }
    result
}

fn setup_audio(config: AudioConfig) -> anyhow::Result<AudioRouteGuard> {
    AudioSwitcher::from_config(config)
        .and_then(AudioSwitcher::setup)
        .context("Error setting up audio device (use --no-audio-switch to skip)")
}

async fn print_events(mut rx: broadcast::Receiver<PlayerEvent>) {
    loop {
        match rx.recv().await {
            Ok(PlayerEvent::SongChanged(title)) => println!("Now playing song: {}", title),
            Ok(PlayerEvent::StatusChanged(status)) => println!("{}", status),
            // warnings are in the log file
            Ok(PlayerEvent::Log(_)) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!("event printer lagged by {} events", n)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
