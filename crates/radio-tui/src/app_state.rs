//! AppState: read-only data shared with every component.

use std::collections::VecDeque;

/// Log lines kept for the log panel.
pub const MAX_LOG_LINES: usize = 200;

/// Song placeholder before a station reports a title.
pub const NO_SONG: &str = "None";

#[derive(Debug, Clone)]
pub struct AppState {
    pub station: Option<String>,
    pub song: String,
    pub status: String,
    pub logs: VecDeque<String>,
    /// Progress text of the running job, if any.
    pub busy: Option<&'static str>,
}

impl AppState {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            station: None,
            song: NO_SONG.to_string(),
            status: status.into(),
            logs: VecDeque::new(),
            busy: None,
        }
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push_back(line.into());
        while self.logs.len() > MAX_LOG_LINES {
            self.logs.pop_front();
        }
    }

    /// Song text worth copying: not the placeholder or the sentinel.
    pub fn copyable_song(&self) -> Option<&str> {
        let song = self.song.trim();
        if song.is_empty() || song == NO_SONG || song == radio_proto::protocol::SONG_UNAVAILABLE {
            None
        } else {
            Some(song)
        }
    }
}
