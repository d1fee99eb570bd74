use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text shown (and published) when a station reports an empty or `-` title.
pub const SONG_UNAVAILABLE: &str = "Song unavailable";

/// A radio station as returned by the station directory.  Never mutated once
/// fetched; history navigation only replaces whole values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Station {
    pub name: String,
    pub url: String,
    /// Comma-separated directory tags (genre, style, ...)
    #[serde(default)]
    pub tags: String,
}

impl Station {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            tags: String::new(),
        }
    }

    /// Name for display; some directory entries have a blank name.
    pub fn label(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            &self.url
        } else {
            name
        }
    }
}

/// User commands accepted by both front-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Fetch and play a random station.
    Play,
    Next,
    Prev,
    /// Add the now-playing song to the playlist.
    Add,
    /// Identify the song with audio recognition.
    Detect,
    /// Stop playback ("end").
    Stop,
    /// Show the now-playing song.
    Song,
    Help,
    Quit,
}

impl Command {
    pub const ALL: [Command; 9] = [
        Command::Play,
        Command::Next,
        Command::Prev,
        Command::Add,
        Command::Detect,
        Command::Stop,
        Command::Song,
        Command::Help,
        Command::Quit,
    ];

    /// (short alias, long alias)
    pub fn aliases(self) -> (&'static str, &'static str) {
        match self {
            Command::Play => ("p", "play"),
            Command::Next => ("n", "next"),
            Command::Prev => ("pr", "prev"),
            Command::Add => ("a", "add"),
            Command::Detect => ("d", "detect"),
            Command::Stop => ("e", "end"),
            Command::Song => ("s", "song"),
            Command::Help => ("h", "help"),
            Command::Quit => ("q", "quit"),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Play => "play a random station",
            Command::Next => "next station",
            Command::Prev => "previous station (one step back)",
            Command::Add => "add the current song to the playlist",
            Command::Detect => "identify the current song from audio",
            Command::Stop => "stop playback",
            Command::Song => "show the current song",
            Command::Help => "show this help",
            Command::Quit => "stop playback and exit",
        }
    }

    /// Multi-line help text listing every command.
    pub fn help_text() -> String {
        Self::ALL
            .iter()
            .map(|c| {
                let (short, long) = c.aliases();
                format!("  {:<3} {:<7} {}", short, long, c.description())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command {:?}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| {
                let (short, long) = c.aliases();
                input == short || input == long
            })
            .ok_or(UnknownCommand(input))
    }
}
