//! App: event loop and dispatch.
//!
//! Architecture:
//! - Key presses (blocking reader thread), player events (broadcast
//!   forwarder) and finished jobs all arrive on one `mpsc` channel as
//!   `AppMessage`s.
//! - Components turn keys into `Action`s; `dispatch` turns actions into
//!   `Job`s.
//! - Jobs run on their own tasks against the shared `Session`, so a slow
//!   station fetch or song detection never freezes the UI.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use radio_core::{AddOutcome, PlayerEvent, Session};

use crate::{
    action::{Action, Followup, Job, JobOutcome, MenuItem, Question},
    app_state::{AppState, NO_SONG},
    component::Component,
    components::{confirm_overlay::ConfirmOverlay, header::Header, log_panel::LogPanel, menu::Menu},
    widgets::{status_bar, toast::ToastManager},
};

const INPUT_POLL: Duration = Duration::from_millis(200);
const TICK: Duration = Duration::from_millis(100);

enum AppMessage {
    Event(Event),
    Player(PlayerEvent),
    JobDone(JobOutcome),
}

pub struct App {
    state: AppState,
    header: Header,
    menu: Menu,
    log_panel: LogPanel,
    confirm: ConfirmOverlay,
    toast: ToastManager,
    jobs_running: usize,
    should_quit: bool,
}

impl App {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            state: AppState::new(status),
            header: Header,
            menu: Menu::new(),
            log_panel: LogPanel::new(),
            confirm: ConfirmOverlay::new(),
            toast: ToastManager::new(),
            jobs_running: 0,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(
        mut self,
        session: Arc<Session>,
        events: broadcast::Receiver<PlayerEvent>,
    ) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("run(): terminal ready, size={:?}", terminal.size());

        let result = self.event_loop(&mut terminal, session, events).await;

        // Restore the terminal even when the loop failed.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        session: Arc<Session>,
        mut events: broadcast::Receiver<PlayerEvent>,
    ) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard events ──────────────────────────────────
        // Polls so the thread notices when the loop is gone and exits.
        let key_tx = tx.clone();
        tokio::task::spawn_blocking(move || {
            while !key_tx.is_closed() {
                match event::poll(INPUT_POLL) {
                    Ok(true) => match event::read() {
                        Ok(ev) => {
                            if key_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("terminal input error: {}", e);
                            break;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        warn!("terminal poll error: {}", e);
                        break;
                    }
                }
            }
        });

        // ── Background task: player events → AppMessage ──────────────────────
        let player_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if player_tx.send(AppMessage::Player(event)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("player event receiver lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut tick = tokio::time::interval(TICK);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let shutdown = radio_core::signals::shutdown_signal();
        tokio::pin!(shutdown);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    if let Some(job) = self.handle_message(msg) {
                        spawn_job(job, &session, &tx);
                    }
                    needs_redraw = true;
                }
                _ = tick.tick() => {
                    self.toast.tick();
                    needs_redraw = self.jobs_running > 0 || self.toast.messages().next().is_some();
                }
                _ = &mut shutdown => {
                    info!("tui: shutdown signal");
                    self.should_quit = true;
                }
            }
        }
        Ok(())
    }

    fn handle_message(&mut self, msg: AppMessage) -> Option<Job> {
        match msg {
            AppMessage::Event(Event::Key(key)) => self.handle_key(key),
            AppMessage::Event(_) => None,
            AppMessage::Player(event) => {
                self.handle_player_event(event);
                None
            }
            AppMessage::JobDone(outcome) => {
                self.handle_outcome(outcome);
                None
            }
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Option<Job> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return self.dispatch(Action::Quit);
        }

        // the overlay swallows everything while open
        if self.confirm.is_open() {
            let action = self.confirm.handle_key(key, &self.state)?;
            return self.dispatch(action);
        }

        let action = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('c') => Some(Action::CopySong),
            KeyCode::Char('l') => Some(Action::ToggleLogs),
            KeyCode::PageUp | KeyCode::PageDown => self.log_panel.handle_key(key, &self.state),
            _ => self.menu.handle_key(key, &self.state),
        }?;
        self.dispatch(action)
    }

    fn dispatch(&mut self, action: Action) -> Option<Job> {
        match action {
            Action::Run(item) => {
                // stop is always allowed and cancels a play still in flight;
                // anything else waits for the running job
                if item != MenuItem::Stop && self.jobs_running > 0 {
                    self.toast.info(format!("busy: {}", self.state.busy.unwrap_or("working")));
                    return None;
                }
                Some(self.begin(Job::Menu(item)))
            }
            Action::Answer(yes) => {
                let question = self.confirm.take()?;
                match question.answer(yes) {
                    Some(Followup::Job(job)) => Some(self.begin(job)),
                    Some(Followup::Ask(next)) => {
                        self.confirm.ask(next);
                        None
                    }
                    None => {
                        self.state.status = "Not adding...".to_string();
                        None
                    }
                }
            }
            Action::CopySong => {
                self.copy_song();
                None
            }
            Action::ToggleLogs => {
                self.log_panel.toggle();
                None
            }
            Action::Quit => {
                self.should_quit = true;
                None
            }
        }
    }

    fn begin(&mut self, job: Job) -> Job {
        self.jobs_running += 1;
        self.state.busy = Some(job.progress());
        self.toast.start_spinner(job.progress());
        job
    }

    fn copy_song(&mut self) {
        let Some(song) = self.state.copyable_song().map(str::to_string) else {
            self.toast.info("no song to copy");
            return;
        };
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(song.clone())) {
            Ok(()) => {
                let display = if song.chars().count() > 40 {
                    format!("{}…", song.chars().take(40).collect::<String>())
                } else {
                    song
                };
                self.toast.success(format!("copied: {}", display));
            }
            Err(e) => {
                warn!("clipboard error: {}", e);
                self.toast.error(format!("clipboard error: {}", e));
            }
        }
    }

    // ── Background results ───────────────────────────────────────────────────

    fn handle_player_event(&mut self, event: PlayerEvent) {
        // Cleared here rather than on JobDone: this stream is ordered with
        // the songs, the job channel is not.
        if event.starts_playback() {
            self.state.song = NO_SONG.to_string();
        }
        match event {
            PlayerEvent::SongChanged(title) => self.state.song = title,
            PlayerEvent::StatusChanged(status) => self.state.status = status,
            PlayerEvent::Log(line) => self.state.push_log(line),
        }
    }

    fn handle_outcome(&mut self, outcome: JobOutcome) {
        self.jobs_running = self.jobs_running.saturating_sub(1);
        if self.jobs_running == 0 {
            self.state.busy = None;
            self.toast.stop_spinner();
        }

        match outcome {
            JobOutcome::Playing(station) => {
                self.state.station = Some(station.label().to_string());
            }
            JobOutcome::Stopped => {
                self.state.status = "Playback stopped".to_string();
                self.state.song = NO_SONG.to_string();
            }
            JobOutcome::Cancelled => debug!("tui: play cancelled by stop"),
            JobOutcome::Added(message) => {
                self.toast.success(message.clone());
                self.state.status = message;
            }
            JobOutcome::NeedsConfirmation(track) => self.confirm.ask(Question::AddFuzzyMatch(track)),
            JobOutcome::Detected(song) => self.confirm.ask(Question::AddDetected(song)),
            JobOutcome::Failed { message, published } => {
                if !published {
                    self.toast.error(message.clone());
                    self.state.status = message;
                }
            }
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let log_height = if self.log_panel.expanded {
            Constraint::Min(3)
        } else {
            Constraint::Length(1)
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(Header::height()),
                Constraint::Length(Menu::height()),
                log_height,
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        self.header.draw(frame, chunks[0], &self.state);
        self.menu.draw(frame, chunks[1], &self.state);
        self.log_panel.draw(frame, chunks[2], &self.state);
        status_bar::draw_key_bar(frame, chunks[4], self.confirm.is_open());

        self.confirm.draw(frame, area, &self.state);
        self.toast.draw(frame, area);
    }
}

fn spawn_job(job: Job, session: &Arc<Session>, tx: &mpsc::Sender<AppMessage>) {
    let session = session.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = run_job(&session, job).await;
        if tx.send(AppMessage::JobDone(outcome)).await.is_err() {
            debug!("job finished after the UI closed");
        }
    });
}

async fn run_job(session: &Session, job: Job) -> JobOutcome {
    let result = match job {
        Job::Menu(MenuItem::PlayStation) => session.play_random().await.map(JobOutcome::Playing),
        Job::Menu(MenuItem::NextStation) => session.play_next().await.map(JobOutcome::Playing),
        Job::Menu(MenuItem::PreviousStation) => {
            session.play_previous().await.map(JobOutcome::Playing)
        }
        Job::Menu(MenuItem::AddSong) => session.add_current_song().await.map(|o| match o {
            AddOutcome::Added { message, .. } => JobOutcome::Added(message),
            AddOutcome::NeedsConfirmation(track) => JobOutcome::NeedsConfirmation(track),
        }),
        Job::Menu(MenuItem::DetectSong) => session.detect_song().await.map(JobOutcome::Detected),
        Job::Menu(MenuItem::Stop) => {
            session.stop().await;
            Ok(JobOutcome::Stopped)
        }
        Job::ConfirmAdd(track) => session.confirm_add(&track).await.map(JobOutcome::Added),
        Job::AddDetected(song) => session.add_detected(&song).await.map(JobOutcome::Added),
    };
    result.unwrap_or_else(|e| {
        if e.is_cancelled() {
            return JobOutcome::Cancelled;
        }
        warn!("tui: {}", e);
        JobOutcome::Failed {
            message: e.to_string(),
            published: e.already_published(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use radio_core::api::{DetectedSong, Track, Unavailable};
    use radio_core::{CurrentSong, EventPublisher, NowPlaying, Player, PlayerSettings};
    use radio_proto::config::NavigationConfig;
    use radio_proto::protocol::Station;
    use ratatui::backend::TestBackend;

    fn press(app: &mut App, c: char) -> Option<Job> {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn track() -> Track {
        Track {
            uri: "spotify:track:x".into(),
            name: "Elsewhere".into(),
            artists: Vec::new(),
        }
    }

    fn session() -> Session {
        let settings = PlayerSettings {
            program: "/nonexistent/mpv".into(),
            audio_filter: String::new(),
            extra_args: Vec::new(),
            stop_grace: Duration::from_millis(200),
        };
        Session::new(
            Player::new(settings, EventPublisher::new(16), NowPlaying::new()),
            Arc::new(Unavailable::new("no stations found")),
            Arc::new(Unavailable::new("Spotify is disabled")),
            Arc::new(Unavailable::new("song detection is disabled")),
            NavigationConfig::default(),
        )
    }

    #[test]
    fn test_only_stop_runs_while_busy() {
        let mut app = App::new("ready");
        assert_eq!(press(&mut app, 'p'), Some(Job::Menu(MenuItem::PlayStation)));
        assert_eq!(app.state.busy, Some("fetching station"));

        assert_eq!(press(&mut app, 'n'), None);
        assert_eq!(press(&mut app, 'e'), Some(Job::Menu(MenuItem::Stop)));

        // the stop lands first, the play it cancelled reports afterwards
        app.handle_outcome(JobOutcome::Stopped);
        assert!(app.state.busy.is_some());
        app.handle_outcome(JobOutcome::Cancelled);
        assert!(app.state.busy.is_none());
        assert_eq!(app.state.station, None);
        assert_eq!(app.state.status, "Playback stopped");
    }

    #[test]
    fn test_song_reported_before_job_done_is_kept() {
        let mut app = App::new("ready");
        app.handle_player_event(PlayerEvent::SongChanged("Old - Tune".into()));
        press(&mut app, 'p');

        app.handle_player_event(PlayerEvent::StatusChanged("Now playing: Jazz FM".into()));
        assert_eq!(app.state.song, NO_SONG);
        app.handle_player_event(PlayerEvent::SongChanged("Artist - Song".into()));
        app.handle_outcome(JobOutcome::Playing(Station::new("Jazz FM", "http://j")));

        assert_eq!(app.state.song, "Artist - Song");
        assert_eq!(app.state.station.as_deref(), Some("Jazz FM"));
        assert_eq!(app.state.status, "Now playing: Jazz FM");

        // other statuses leave the song alone
        app.handle_player_event(PlayerEvent::StatusChanged("Playback finished.".into()));
        assert_eq!(app.state.song, "Artist - Song");
    }

    #[test]
    fn test_fuzzy_match_flow_through_overlay() {
        let mut app = App::new("ready");
        press(&mut app, 'a');
        app.handle_outcome(JobOutcome::NeedsConfirmation(track()));
        assert!(app.confirm.is_open());

        // menu hotkeys are swallowed by the overlay
        assert_eq!(press(&mut app, 'p'), None);
        assert_eq!(press(&mut app, 'n'), None);
        assert!(app.confirm.is_open());
        assert_eq!(press(&mut app, 'y'), Some(Job::Menu(MenuItem::DetectSong)));
        assert!(!app.confirm.is_open());

        app.handle_outcome(JobOutcome::Detected(DetectedSong {
            uri: "spotify:track:d".into(),
            title: "Heard - It".into(),
        }));
        assert_eq!(
            press(&mut app, 'y'),
            Some(Job::AddDetected(DetectedSong {
                uri: "spotify:track:d".into(),
                title: "Heard - It".into(),
            }))
        );
        app.handle_outcome(JobOutcome::Added("Song Added".into()));
        assert_eq!(app.state.status, "Song Added");
    }

    #[test]
    fn test_published_failures_are_not_repeated() {
        let mut app = App::new("ready");
        app.handle_player_event(PlayerEvent::StatusChanged("Error: failed to start player".into()));
        press(&mut app, 'p');
        app.handle_outcome(JobOutcome::Failed {
            message: "failed to start player".into(),
            published: true,
        });
        assert_eq!(app.state.status, "Error: failed to start player");

        press(&mut app, 'n');
        app.handle_outcome(JobOutcome::Failed {
            message: "error fetching station: no stations found".into(),
            published: false,
        });
        assert_eq!(app.state.status, "error fetching station: no stations found");
    }

    #[test]
    fn test_player_events_update_state() {
        let mut app = App::new("ready");
        app.handle_player_event(PlayerEvent::SongChanged("Artist - Song".into()));
        app.handle_player_event(PlayerEvent::Log("[WARN] stream hiccup".into()));
        assert_eq!(app.state.song, "Artist - Song");
        assert_eq!(app.state.logs.back().map(String::as_str), Some("[WARN] stream hiccup"));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = App::new("ready");
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);

        let mut app = App::new("ready");
        press(&mut app, 'q');
        assert!(app.should_quit);
    }

    #[test]
    fn test_draw_shows_menu_and_overlay() {
        let mut app = App::new("All set! Use the menu below.");
        app.state.station = Some("Jazz FM".into());
        app.confirm.ask(Question::AddFuzzyMatch(track()));

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();

        assert!(text.contains("Jazz FM"));
        assert!(text.contains("Add it anyway?"));
        assert!(text.contains("y / enter: yes"));
    }

    #[tokio::test]
    async fn test_jobs_report_session_errors() {
        let session = session();
        match run_job(&session, Job::Menu(MenuItem::AddSong)).await {
            JobOutcome::Failed { message, published } => {
                assert!(message.contains("song not currently available"));
                assert!(!published);
            }
            other => panic!("unexpected {:?}", other),
        }

        session
            .player()
            .now_playing()
            .set(CurrentSong::Title("Artist - Song".into()))
            .await;
        match run_job(&session, Job::Menu(MenuItem::AddSong)).await {
            JobOutcome::Failed { message, .. } => assert!(message.contains("Spotify is disabled")),
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(run_job(&session, Job::Menu(MenuItem::Stop)).await, JobOutcome::Stopped);
    }
}
