//! Session controller against in-memory collaborators and a sleeping
//! stand-in player.
#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use radio_core::api::DetectedSong;
use radio_core::history::NavigationError;
use radio_core::player::PlaybackError;
use radio_core::{AddOutcome, CurrentSong, Session, SessionError};
use radio_proto::config::NavigationConfig;

struct Harness {
    session: Session,
    directory: Arc<FakeDirectory>,
    playlist: Arc<FakePlaylist>,
    _dir: tempfile::TempDir,
}

fn harness(stations: &[&str], navigation: NavigationConfig) -> Harness {
    harness_with(
        FakeDirectory::new(stations.iter().map(|s| station(s)).collect()),
        navigation,
    )
}

fn harness_with(directory: FakeDirectory, navigation: NavigationConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let player = idle_player(dir.path());
    let directory = Arc::new(directory);
    let playlist = Arc::new(FakePlaylist::returning("Artist", "Song"));
    let recognizer = Arc::new(FakeRecognizer(DetectedSong {
        uri: "spotify:track:detected".into(),
        title: "Title - Subtitle".into(),
    }));
    let session = Session::new(
        player,
        directory.clone(),
        playlist.clone(),
        recognizer,
        navigation,
    );
    Harness {
        session,
        directory,
        playlist,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_random_next_previous_next_plays_a_b_a_b() {
    let h = harness(&["a", "b"], NavigationConfig::default());
    let s = &h.session;

    let mut played = Vec::new();
    let mut pids = Vec::new();
    for step in 0..4 {
        let station = match step {
            0 => s.play_random().await,
            1 => s.play_next().await,
            2 => s.play_previous().await,
            _ => s.play_next().await,
        }
        .unwrap();
        played.push(station.name);
        pids.push(s.player().current_pid().await.unwrap());
    }

    assert_eq!(played, ["a", "b", "a", "b"]);
    // no second fetch for the replayed "b"
    assert_eq!(h.directory.fetches(), 2);
    // every move restarted the player
    pids.dedup();
    assert_eq!(pids.len(), 4);
    assert_eq!(s.current_station().await.unwrap().name, "b");

    s.shutdown().await;
    assert!(!s.player().is_playing().await);
}

#[tokio::test]
async fn test_second_previous_is_rejected() {
    let h = harness(&["a", "b"], NavigationConfig::default());
    let s = &h.session;

    s.play_random().await.unwrap();
    s.play_next().await.unwrap();
    s.play_previous().await.unwrap();
    let pid = s.player().current_pid().await;

    let err = s.play_previous().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Navigation(NavigationError::AlreadyRewound)
    ));
    assert!(!err.already_published());
    // still on "a", same process
    assert_eq!(s.current_station().await.unwrap().name, "a");
    assert_eq!(s.player().current_pid().await, pid);

    s.shutdown().await;
}

#[tokio::test]
async fn test_previous_without_history() {
    let h = harness(&["a"], NavigationConfig::default());
    let err = h.session.play_previous().await.unwrap_err();
    assert!(matches!(err, SessionError::Navigation(NavigationError::NoPrevious)));

    h.session.play_random().await.unwrap();
    let err = h.session.play_previous().await.unwrap_err();
    assert!(matches!(err, SessionError::Navigation(NavigationError::NoPrevious)));
    h.session.shutdown().await;
}

#[tokio::test]
async fn test_directory_failure_leaves_state_alone() {
    let h = harness(&["a"], NavigationConfig::default());
    let s = &h.session;

    s.play_random().await.unwrap();
    let pid = s.player().current_pid().await;

    let err = s.play_next().await.unwrap_err();
    assert!(matches!(err, SessionError::Directory(_)));
    assert!(err.to_string().contains("no stations found"));
    assert_eq!(s.current_station().await.unwrap().name, "a");
    assert_eq!(s.player().current_pid().await, pid);
    assert!(matches!(
        s.play_previous().await,
        Err(SessionError::Navigation(NavigationError::NoPrevious))
    ));

    s.shutdown().await;
}

#[tokio::test]
async fn test_random_can_keep_current_as_previous() {
    let navigation = NavigationConfig {
        random_remembers_current: true,
        ..NavigationConfig::default()
    };
    let h = harness(&["a", "b"], navigation);
    let s = &h.session;

    s.play_random().await.unwrap();
    s.play_random().await.unwrap();
    assert_eq!(s.play_previous().await.unwrap().name, "a");
    s.shutdown().await;
}

#[tokio::test]
async fn test_add_without_song_is_refused() {
    let h = harness(&["a"], NavigationConfig::default());
    let s = &h.session;

    assert!(matches!(s.add_current_song().await, Err(SessionError::NoSong)));

    s.player().now_playing().set(CurrentSong::Unavailable).await;
    assert!(matches!(s.add_current_song().await, Err(SessionError::NoSong)));
    assert!(h.playlist.added().is_empty());
}

#[tokio::test]
async fn test_close_match_is_added_directly() {
    let h = harness(&["a"], NavigationConfig::default());
    let s = &h.session;
    s.player()
        .now_playing()
        .set(CurrentSong::Title("Artist - Song".into()))
        .await;

    match s.add_current_song().await.unwrap() {
        AddOutcome::Added { track, message } => {
            assert_eq!(track.uri, "spotify:track:Song");
            assert_eq!(message, "Song Added");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(h.playlist.added(), ["spotify:track:Song"]);
    assert_eq!(
        h.playlist.searches.lock().unwrap().as_slice(),
        ["Artist - Song"]
    );
}

#[tokio::test]
async fn test_distant_match_needs_confirmation() {
    let h = harness(&["a"], NavigationConfig::default());
    let s = &h.session;
    s.player()
        .now_playing()
        .set(CurrentSong::Title("Completely Different - Thing".into()))
        .await;

    let track = match s.add_current_song().await.unwrap() {
        AddOutcome::NeedsConfirmation(track) => track,
        other => panic!("unexpected {:?}", other),
    };
    assert!(h.playlist.added().is_empty());

    s.confirm_add(&track).await.unwrap();
    assert_eq!(h.playlist.added(), ["spotify:track:Song"]);
}

#[tokio::test]
async fn test_confirmation_can_be_disabled() {
    let navigation = NavigationConfig {
        confirm_fuzzy_matches: false,
        ..NavigationConfig::default()
    };
    let h = harness(&["a"], navigation);
    let s = &h.session;
    s.player()
        .now_playing()
        .set(CurrentSong::Title("Completely Different - Thing".into()))
        .await;

    assert!(matches!(
        s.add_current_song().await.unwrap(),
        AddOutcome::Added { .. }
    ));
}

#[tokio::test]
async fn test_detect_then_add() {
    let h = harness(&["a"], NavigationConfig::default());
    let s = &h.session;

    let song = s.detect_song().await.unwrap();
    assert_eq!(song.title, "Title - Subtitle");
    s.add_detected(&song).await.unwrap();
    assert_eq!(h.playlist.added(), ["spotify:track:detected"]);
}

#[tokio::test]
async fn test_stop_during_station_lookup_cancels_the_play() {
    let directory = FakeDirectory::new(vec![station("a"), station("b")])
        .delayed(Duration::from_millis(300));
    let h = harness_with(directory, NavigationConfig::default());
    let s = &h.session;

    let (result, ()) = tokio::join!(s.play_random(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        s.stop().await;
    });

    let err = result.unwrap_err();
    assert!(matches!(err, SessionError::Playback(PlaybackError::Cancelled)), "{:?}", err);
    assert!(err.is_cancelled());
    assert!(!err.already_published());
    assert!(!s.player().is_playing().await);
    assert_eq!(s.current_station().await, None);

    // The next command is unaffected by the earlier stop.
    assert_eq!(s.play_random().await.unwrap().name, "b");
    assert!(s.player().is_playing().await);
    s.stop().await;
}

#[tokio::test]
async fn test_stop_during_next_keeps_history() {
    let directory = FakeDirectory::new(vec![station("a"), station("b")])
        .delayed(Duration::from_millis(200));
    let h = harness_with(directory, NavigationConfig::default());
    let s = &h.session;
    s.play_random().await.unwrap();

    let (result, ()) = tokio::join!(s.play_next(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        s.stop().await;
    });

    assert!(result.unwrap_err().is_cancelled());
    assert!(!s.player().is_playing().await);
    assert_eq!(s.current_station().await.map(|st| st.name), Some("a".to_string()));
    assert!(matches!(
        s.play_previous().await,
        Err(SessionError::Navigation(NavigationError::NoPrevious))
    ));
}
