//! mpv terminal-output scanner.
//!
//! mpv prints a block like this on stdout whenever stream metadata changes:
//!
//! ```text
//! File tags:
//!  icy-title: Artist - Song
//!
//! ```
//!
//! Only the `title` / `icy-title` keys inside that block are of interest.
//! Everything else mpv prints (status lines, codec info) is ignored.

use crate::now_playing::CurrentSong;

/// Header line mpv prints before the tag block.
pub const TAG_SECTION_START: &str = "File tags:";

const TITLE_KEYS: [&str; 2] = ["icy-title", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Outside,
    InTagSection,
}

#[derive(Debug, Default)]
pub struct TagScanner {
    state: ScanState,
}

impl TagScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Feed one output line (without its newline).  Returns the normalised
    /// song when the line carried a title.
    pub fn feed(&mut self, line: &str) -> Option<CurrentSong> {
        let line = line.trim_end_matches(['\r', '\n']);
        match self.state {
            ScanState::Outside => {
                if line == TAG_SECTION_START {
                    self.state = ScanState::InTagSection;
                }
                None
            }
            ScanState::InTagSection => {
                if line.trim().is_empty() {
                    self.state = ScanState::Outside;
                    return None;
                }
                parse_title_line(line)
            }
        }
    }
}

fn parse_title_line(line: &str) -> Option<CurrentSong> {
    let (key, value) = line.split_once(": ")?;
    let key = key.trim();
    if !TITLE_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k)) {
        return None;
    }
    Some(normalize_title(value))
}

/// Empty or `-` titles mean the station has nothing to say about the song.
pub fn normalize_title(raw: &str) -> CurrentSong {
    let title = raw.trim();
    if title.is_empty() || title == "-" {
        CurrentSong::Unavailable
    } else {
        CurrentSong::Title(title.to_string())
    }
}
