//! Non-blocking fan-out of song / status changes to whoever is watching
//! (the CLI printer, the TUI, the log layer).
//!
//! Built on `tokio::sync::broadcast`: `send` never waits.  With no receiver
//! the event is discarded on the spot; a receiver that falls more than
//! `capacity` events behind loses the oldest ones and sees `Lagged`.  Memory
//! is bounded by the ring size either way.

use tokio::sync::broadcast;

/// Ring size used by the binaries.
pub const DEFAULT_CAPACITY: usize = 256;

/// Prefix of the status the player sends right after spawning, ahead of
/// any song from the new station.
pub const NOW_PLAYING_PREFIX: &str = "Now playing: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Now-playing text changed (already normalised, may be the
    /// "unavailable" sentinel).
    SongChanged(String),
    /// Playback status: started, finished, failed, read errors...
    StatusChanged(String),
    /// WARN/ERROR log record forwarded by the broadcast layer.
    Log(String),
}

impl PlayerEvent {
    /// A new station was spawned.  Songs seen before this belong to the
    /// old one.
    pub fn starts_playback(&self) -> bool {
        matches!(self, PlayerEvent::StatusChanged(s) if s.starts_with(NOW_PLAYING_PREFIX))
    }
}

#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Fire and forget.  No receivers is not an error.
    pub fn publish(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn song(&self, title: impl Into<String>) {
        self.publish(PlayerEvent::SongChanged(title.into()));
    }

    pub fn status(&self, message: impl Into<String>) {
        self.publish(PlayerEvent::StatusChanged(message.into()));
    }

    pub fn log(&self, message: impl Into<String>) {
        self.publish(PlayerEvent::Log(message.into()));
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let events = EventPublisher::new(8);
        for i in 0..1000 {
            events.song(format!("song {}", i));
            events.status("tick");
        }
        // Nothing was retained for a late subscriber.
        let mut rx = events.subscribe();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let events = EventPublisher::new(8);
        let mut rx = events.subscribe();
        events.song("Artist - Song");
        events.status("Playback finished.");
        assert_eq!(
            rx.recv().await.unwrap(),
            PlayerEvent::SongChanged("Artist - Song".into())
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            PlayerEvent::StatusChanged("Playback finished.".into())
        );
    }

    #[tokio::test]
    async fn test_slow_subscriber_never_blocks_publisher() {
        let events = EventPublisher::new(4);
        let mut rx = events.subscribe();
        for i in 0..100 {
            events.song(format!("{}", i));
        }
        match rx.recv().await {
            Err(RecvError::Lagged(n)) => assert_eq!(n, 96),
            other => panic!("expected lag, got {:?}", other),
        }
        // The newest events are still there.
        assert_eq!(rx.recv().await.unwrap(), PlayerEvent::SongChanged("96".into()));
    }

    #[test]
    fn test_starts_playback() {
        assert!(PlayerEvent::StatusChanged("Now playing: Jazz FM".into()).starts_playback());
        assert!(!PlayerEvent::StatusChanged("Playback finished.".into()).starts_playback());
        assert!(!PlayerEvent::SongChanged("Now playing: x".into()).starts_playback());
    }

    #[test]
    fn test_every_subscriber_gets_a_copy() {
        let events = EventPublisher::new(4);
        let mut a = events.subscribe();
        let mut b = events.subscribe();
        assert_eq!(events.subscriber_count(), 2);
        events.status("hello");
        assert_eq!(a.try_recv().unwrap(), PlayerEvent::StatusChanged("hello".into()));
        assert_eq!(b.try_recv().unwrap(), PlayerEvent::StatusChanged("hello".into()));
    }
}
