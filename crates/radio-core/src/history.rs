use radio_proto::protocol::Station;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("no previous station")]
    NoPrevious,
    #[error("already at the oldest remembered station")]
    AlreadyRewound,
}

/// One level of station history.
///
/// `previous` then `next` returns to the station that was playing before
/// instead of fetching a new one.  The methods here only read or commit
/// state; the session decides when a play actually happened.
#[derive(Debug, Clone, Default)]
pub struct StationHistory {
    current: Option<Station>,
    previous: Option<Station>,
    rewound: bool,
}

impl StationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Station> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&Station> {
        self.previous.as_ref()
    }

    pub fn is_rewound(&self) -> bool {
        self.rewound
    }

    /// The station actually on air: `previous` while rewound.
    pub fn playing(&self) -> Option<&Station> {
        if self.rewound {
            self.previous.as_ref()
        } else {
            self.current.as_ref()
        }
    }

    /// Station to replay on `next` without fetching, if rewound.
    pub fn resume_target(&self) -> Option<&Station> {
        if self.rewound {
            self.current.as_ref()
        } else {
            None
        }
    }

    /// Station to replay on `previous`.
    pub fn rewind_target(&self) -> Result<&Station, NavigationError> {
        if self.rewound {
            return Err(NavigationError::AlreadyRewound);
        }
        self.previous.as_ref().ok_or(NavigationError::NoPrevious)
    }

    /// Commit a random pick.  `current` is replaced; the old one is kept as
    /// `previous` only when `remember_current` is set.
    pub fn commit_random(&mut self, station: Station, remember_current: bool) {
        let old = self.current.replace(station);
        if remember_current && old.is_some() {
            self.previous = old;
        }
        self.rewound = false;
    }

    /// Commit a freshly fetched `next`.
    pub fn commit_next(&mut self, station: Station) {
        self.previous = self.current.replace(station);
        self.rewound = false;
    }

    /// Commit a replay of `current` after a rewind.
    pub fn commit_resume(&mut self) {
        self.rewound = false;
    }

    pub fn commit_rewind(&mut self) {
        self.rewound = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str) -> Station {
        Station::new(name, format!("http://{}.example/stream", name))
    }

    #[test]
    fn test_empty_history_has_no_previous() {
        let history = StationHistory::new();
        assert_eq!(history.rewind_target(), Err(NavigationError::NoPrevious));
        assert!(history.resume_target().is_none());
        assert!(history.playing().is_none());
    }

    #[test]
    fn test_next_then_previous_then_next() {
        let mut history = StationHistory::new();
        history.commit_random(station("a"), false);
        history.commit_next(station("b"));
        assert_eq!(history.playing().unwrap().name, "b");

        let target = history.rewind_target().unwrap().clone();
        assert_eq!(target.name, "a");
        history.commit_rewind();
        assert_eq!(history.playing().unwrap().name, "a");
        // slots themselves are untouched
        assert_eq!(history.current().unwrap().name, "b");
        assert_eq!(history.previous().unwrap().name, "a");

        assert_eq!(history.resume_target().unwrap().name, "b");
        history.commit_resume();
        assert!(!history.is_rewound());
        assert_eq!(history.playing().unwrap().name, "b");
    }

    #[test]
    fn test_second_previous_is_rejected() {
        let mut history = StationHistory::new();
        history.commit_random(station("a"), false);
        history.commit_next(station("b"));
        history.commit_rewind();
        assert_eq!(history.rewind_target(), Err(NavigationError::AlreadyRewound));
        assert_eq!(history.current().unwrap().name, "b");
    }

    #[test]
    fn test_random_discards_current_by_default() {
        let mut history = StationHistory::new();
        history.commit_random(station("a"), false);
        history.commit_random(station("b"), false);
        assert_eq!(history.rewind_target(), Err(NavigationError::NoPrevious));
    }

    #[test]
    fn test_random_can_remember_current() {
        let mut history = StationHistory::new();
        history.commit_random(station("a"), true);
        assert!(history.previous().is_none());
        history.commit_random(station("b"), true);
        assert_eq!(history.previous().unwrap().name, "a");
    }

    #[test]
    fn test_random_clears_rewound() {
        let mut history = StationHistory::new();
        history.commit_random(station("a"), false);
        history.commit_next(station("b"));
        history.commit_rewind();
        history.commit_random(station("c"), false);
        assert!(!history.is_rewound());
        assert_eq!(history.playing().unwrap().name, "c");
        assert_eq!(history.previous().unwrap().name, "a");
    }
}
