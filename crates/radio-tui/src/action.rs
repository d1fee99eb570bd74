//! Menu entries, the actions components hand back to the App, and the
//! background jobs those actions start.

use radio_core::api::{DetectedSong, Track};
use radio_proto::protocol::Station;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    PlayStation,
    NextStation,
    PreviousStation,
    AddSong,
    DetectSong,
    Stop,
}

impl MenuItem {
    pub const ALL: [MenuItem; 6] = [
        MenuItem::PlayStation,
        MenuItem::NextStation,
        MenuItem::PreviousStation,
        MenuItem::AddSong,
        MenuItem::DetectSong,
        MenuItem::Stop,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::PlayStation => "Play a Station",
            MenuItem::NextStation => "Next Station",
            MenuItem::PreviousStation => "Previous Station",
            MenuItem::AddSong => "Add Song to Playlist",
            MenuItem::DetectSong => "Detect Song",
            MenuItem::Stop => "Stop",
        }
    }

    /// Direct key, same letters as the line prompt where they fit.
    pub fn hotkey(self) -> char {
        match self {
            MenuItem::PlayStation => 'p',
            MenuItem::NextStation => 'n',
            MenuItem::PreviousStation => 'b',
            MenuItem::AddSong => 'a',
            MenuItem::DetectSong => 'd',
            MenuItem::Stop => 'e',
        }
    }

    pub fn from_hotkey(c: char) -> Option<Self> {
        Self::ALL.iter().copied().find(|item| item.hotkey() == c)
    }

    /// Spinner text while the job runs.
    pub fn progress(self) -> &'static str {
        match self {
            MenuItem::PlayStation => "fetching station",
            MenuItem::NextStation => "fetching next station",
            MenuItem::PreviousStation => "going back",
            MenuItem::AddSong => "searching playlist service",
            MenuItem::DetectSong => "listening",
            MenuItem::Stop => "stopping",
        }
    }
}

/// Produced by components, dispatched by the App.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Run(MenuItem),
    /// y/n answer to the open question.
    Answer(bool),
    CopySong,
    ToggleLogs,
    Quit,
}

/// Work handed to a background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Menu(MenuItem),
    ConfirmAdd(Track),
    AddDetected(DetectedSong),
}

impl Job {
    pub fn progress(&self) -> &'static str {
        match self {
            Job::Menu(item) => item.progress(),
            Job::ConfirmAdd(_) | Job::AddDetected(_) => "adding to playlist",
        }
    }
}

/// What a finished job reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Playing(Station),
    Stopped,
    Added(String),
    NeedsConfirmation(Track),
    Detected(DetectedSong),
    /// A stop came in while the job was still looking up its station.
    Cancelled,
    /// `published`: the player already reported it on the event stream.
    Failed { message: String, published: bool },
}

/// Open y/n question shown in the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    AddFuzzyMatch(Track),
    DetectInstead,
    AddDetected(DetectedSong),
}

impl Question {
    pub fn prompt(&self) -> String {
        match self {
            Question::AddFuzzyMatch(track) => {
                format!("Found a different-looking match: {}\nAdd it anyway?", track)
            }
            Question::DetectInstead => "Detect the song from audio instead?".to_string(),
            Question::AddDetected(song) => {
                format!("Detected: {}\nAdd it to the playlist?", song.title)
            }
        }
    }

    /// Follow-up for an answer: another job, another question, or nothing.
    pub fn answer(self, yes: bool) -> Option<Followup> {
        match (self, yes) {
            (Question::AddFuzzyMatch(track), true) => Some(Followup::Job(Job::ConfirmAdd(track))),
            (Question::AddFuzzyMatch(_), false) => Some(Followup::Ask(Question::DetectInstead)),
            (Question::DetectInstead, true) => {
                Some(Followup::Job(Job::Menu(MenuItem::DetectSong)))
            }
            (Question::AddDetected(song), true) => Some(Followup::Job(Job::AddDetected(song))),
            (Question::DetectInstead, false) | (Question::AddDetected(_), false) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Followup {
    Job(Job),
    Ask(Question),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hotkeys_are_unique() {
        for item in MenuItem::ALL {
            assert_eq!(MenuItem::from_hotkey(item.hotkey()), Some(item));
        }
        assert_eq!(MenuItem::from_hotkey('z'), None);
    }

    #[test]
    fn test_declining_fuzzy_match_offers_detection() {
        let track = Track {
            uri: "spotify:track:1".into(),
            name: "Other".into(),
            artists: Vec::new(),
        };
        assert_eq!(
            Question::AddFuzzyMatch(track.clone()).answer(true),
            Some(Followup::Job(Job::ConfirmAdd(track.clone())))
        );
        assert_eq!(
            Question::AddFuzzyMatch(track).answer(false),
            Some(Followup::Ask(Question::DetectInstead))
        );
        assert_eq!(
            Question::DetectInstead.answer(true),
            Some(Followup::Job(Job::Menu(MenuItem::DetectSong)))
        );
        assert_eq!(Question::DetectInstead.answer(false), None);
    }
}
