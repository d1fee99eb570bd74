//! Line prompt: one command per line, y/n follow-up questions read from the
//! same input.

use std::io::Write;

use radio_core::api::Track;
use radio_core::history::NavigationError;
use radio_core::{AddOutcome, CurrentSong, Session, SessionError};
use radio_proto::protocol::Command;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Repl<'a, R, W> {
    session: &'a Session,
    lines: Lines<R>,
    out: W,
}

impl<'a, R, W> Repl<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(session: &'a Session, input: R, out: W) -> Self {
        Self {
            session,
            lines: input.lines(),
            out,
        }
    }

    /// Runs until `quit` or end of input.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;

            let Some(line) = self.lines.next_line().await? else {
                debug!("repl: end of input");
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(e) => {
                    debug!("repl: {}", e);
                    writeln!(self.out, "Invalid command. Type 'h' for help.")?;
                    continue;
                }
            };

            if self.handle(command).await? == Flow::Quit {
                writeln!(self.out, "Exiting...")?;
                return Ok(());
            }
        }
    }

    async fn handle(&mut self, command: Command) -> anyhow::Result<Flow> {
        match command {
            Command::Play => {
                if let Err(e) = self.session.play_random().await {
                    self.report(&e)?;
                }
            }
            Command::Next => {
                if let Err(e) = self.session.play_next().await {
                    self.report(&e)?;
                }
            }
            Command::Prev => match self.session.play_previous().await {
                Ok(_) => {}
                Err(SessionError::Navigation(NavigationError::AlreadyRewound)) => {
                    writeln!(self.out, "Can't go back any more")?;
                    if let Some(station) = self.session.current_station().await {
                        writeln!(self.out, "Still playing: {}", station.label())?;
                    }
                }
                Err(e) => self.report(&e)?,
            },
            Command::Add => self.add().await?,
            Command::Detect => self.detect().await?,
            Command::Stop => {
                self.session.stop().await;
                writeln!(self.out, "Playback stopped")?;
            }
            Command::Song => match self.session.current_song().await {
                CurrentSong::Unknown => writeln!(self.out, "No song information yet.")?,
                song => writeln!(self.out, "{}", song)?,
            },
            Command::Help => writeln!(self.out, "Commands:\n{}", Command::help_text())?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn add(&mut self) -> anyhow::Result<()> {
        let track = match self.session.add_current_song().await {
            Ok(AddOutcome::Added { message, .. }) => {
                writeln!(self.out, "{}", message)?;
                return Ok(());
            }
            Ok(AddOutcome::NeedsConfirmation(track)) => track,
            Err(e) => return self.report(&e),
        };

        if self.confirm_fuzzy(&track).await? {
            match self.session.confirm_add(&track).await {
                Ok(message) => writeln!(self.out, "{}", message)?,
                Err(e) => self.report(&e)?,
            }
            return Ok(());
        }

        if self
            .ask("Would you like to detect the song from audio instead?")
            .await?
        {
            self.detect().await?;
        }
        Ok(())
    }

    async fn confirm_fuzzy(&mut self, track: &Track) -> anyhow::Result<bool> {
        writeln!(
            self.out,
            "The song we found seems to be a bit different than expected."
        )?;
        match track.first_artist() {
            Some(artist) => writeln!(self.out, "Found: {} by {}", track.name, artist)?,
            None => writeln!(self.out, "Found: {}", track.name)?,
        }
        self.ask("Proceed?").await
    }

    async fn detect(&mut self) -> anyhow::Result<()> {
        writeln!(self.out, "Detecting song...")?;
        let song = match self.session.detect_song().await {
            Ok(song) => song,
            Err(e) => return self.report(&e),
        };

        writeln!(self.out, "Detected song: {}", song.title)?;
        if !self.ask("Would you like to add it to the playlist?").await? {
            writeln!(self.out, "Not adding...")?;
            return Ok(());
        }
        match self.session.add_detected(&song).await {
            Ok(message) => writeln!(self.out, "{}", message)?,
            Err(e) => self.report(&e)?,
        }
        Ok(())
    }

    /// y/n question.  End of input counts as "no".
    async fn ask(&mut self, question: &str) -> anyhow::Result<bool> {
        write!(self.out, "{} (y/n): ", question)?;
        self.out.flush()?;
        let answer = self.lines.next_line().await?.unwrap_or_default();
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn report(&mut self, err: &SessionError) -> anyhow::Result<()> {
        warn!("repl: {}", err);
        // playback failures were already printed from the event stream
        if !err.already_published() {
            writeln!(self.out, "{}", err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use radio_core::api::{Artist, DetectedSong, PlaylistService, SongRecognizer, Unavailable};
    use radio_core::{EventPublisher, NowPlaying, Player, PlayerSettings};
    use radio_proto::config::NavigationConfig;

    struct OneTrack;

    #[async_trait]
    impl PlaylistService for OneTrack {
        async fn search_track(&self, _query: &str) -> anyhow::Result<Track> {
            Ok(Track {
                uri: "spotify:track:other".into(),
                name: "Something Else Entirely".into(),
                artists: vec![Artist {
                    name: "Nobody".into(),
                }],
            })
        }

        async fn add_to_playlist(&self, uri: &str) -> anyhow::Result<String> {
            Ok(format!("Song Added ({})", uri))
        }
    }

    struct Knows;

    #[async_trait]
    impl SongRecognizer for Knows {
        async fn detect_song(&self) -> anyhow::Result<DetectedSong> {
            Ok(DetectedSong {
                uri: "spotify:track:heard".into(),
                title: "Heard - Live".into(),
            })
        }
    }

    fn session(playlist: Arc<dyn PlaylistService>, recognizer: Arc<dyn SongRecognizer>) -> Session {
        let settings = PlayerSettings {
            program: "/nonexistent/mpv".into(),
            audio_filter: String::new(),
            extra_args: Vec::new(),
            stop_grace: Duration::from_millis(200),
        };
        let player = Player::new(settings, EventPublisher::new(16), NowPlaying::new());
        Session::new(
            player,
            Arc::new(Unavailable::new("no stations found")),
            playlist,
            recognizer,
            NavigationConfig::default(),
        )
    }

    async fn run(session: &Session, input: &str) -> String {
        let mut out = Vec::new();
        Repl::new(session, input.as_bytes(), &mut out)
            .run()
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn unavailable() -> Session {
        session(
            Arc::new(Unavailable::new("Spotify is disabled")),
            Arc::new(Unavailable::new("song detection is disabled")),
        )
    }

    #[tokio::test]
    async fn test_help_invalid_and_quit() {
        let session = unavailable();
        let out = run(&session, "h\nbogus\n\nq\np\n").await;
        assert!(out.contains("Commands:"));
        assert!(out.contains("previous station"));
        assert!(out.contains("Invalid command"));
        assert!(out.ends_with("Exiting...\n"));
        // nothing after quit is executed
        assert!(!out.contains("error fetching station"));
    }

    #[tokio::test]
    async fn test_errors_are_printed_and_loop_continues() {
        let session = unavailable();
        let out = run(&session, "pr\np\na\ns\ne\n").await;
        assert!(out.contains("no previous station"), "{}", out);
        assert!(out.contains("error fetching station: no stations found"));
        assert!(out.contains("song not currently available"));
        assert!(out.contains("No song information yet."));
        assert!(out.contains("Playback stopped"));
    }

    #[tokio::test]
    async fn test_declined_fuzzy_match_offers_detection() {
        let session = session(Arc::new(OneTrack), Arc::new(Knows));
        session
            .player()
            .now_playing()
            .set(CurrentSong::Title("Artist - Song".into()))
            .await;

        let out = run(&session, "a\nn\ny\ny\n").await;
        assert!(out.contains("Found: Something Else Entirely by Nobody"));
        assert!(out.contains("Detected song: Heard - Live"));
        assert!(out.contains("Song Added (spotify:track:heard)"));
        assert!(!out.contains("spotify:track:other"));
    }

    #[tokio::test]
    async fn test_accepted_fuzzy_match_is_added() {
        let session = session(Arc::new(OneTrack), Arc::new(Knows));
        session
            .player()
            .now_playing()
            .set(CurrentSong::Title("Artist - Song".into()))
            .await;

        let out = run(&session, "a\nyes\n").await;
        assert!(out.contains("Song Added (spotify:track:other)"));
    }

    #[tokio::test]
    async fn test_detect_without_answer_does_not_add() {
        let session = session(Arc::new(OneTrack), Arc::new(Knows));
        let out = run(&session, "d\n").await;
        assert!(out.contains("Detected song: Heard - Live"));
        assert!(out.contains("Not adding..."));
        assert!(!out.contains("Song Added"));
    }
}
