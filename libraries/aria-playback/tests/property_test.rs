//! Property-based tests for the transport controller
//!
//! Uses proptest to check transport invariants over random playlists and
//! operation sequences.

use aria_audio::testing::{RecordingEngine, RecordingFactory};
use aria_core::{PlaylistId, Song};
use aria_playback::testing::{FakeMediaElement, RecordingReleaser};
use aria_playback::{PlayerConfig, RepeatMode, TransportController};
use proptest::prelude::*;

// ===== Helpers =====

fn player_with(songs: usize) -> (TransportController, FakeMediaElement, PlaylistId) {
    let media = FakeMediaElement::new(1);
    let mut player = TransportController::new(
        PlayerConfig::default(),
        Box::new(media.clone()),
        Box::new(RecordingFactory::new(RecordingEngine::new())),
        Box::new(RecordingReleaser::new()),
    )
    .expect("default config is valid");
    let playlist = player.store().default_playlist().id.clone();
    for i in 0..songs {
        player
            .add_song(&playlist, Song::new(format!("Song {}", i), format!("blob:{}", i)))
            .unwrap();
    }
    (player, media, playlist)
}

#[derive(Debug, Clone)]
enum Op {
    Next,
    Previous,
    ToggleShuffle,
    Select(usize),
    Ended,
    Remove(usize),
    CycleRepeat,
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Next),
        Just(Op::Previous),
        Just(Op::ToggleShuffle),
        (0usize..12).prop_map(Op::Select),
        Just(Op::Ended),
        (0usize..12).prop_map(Op::Remove),
        Just(Op::CycleRepeat),
    ]
}

// ===== Property Tests =====

proptest! {
    /// Property: a valid selection is reflected exactly and clears the error
    #[test]
    fn valid_selection_is_reflected(len in 1usize..20, pick in 0usize..20) {
        let index = pick % len;
        let (mut player, _media, playlist) = player_with(len);
        let _ = player.select_song(&playlist, len + 5);

        player.select_song(&playlist, index).unwrap();

        prop_assert_eq!(&player.state().current_playlist_id, &playlist);
        prop_assert_eq!(player.state().current_song_index, Some(index));
        prop_assert!(player.state().audio_error.is_none());
    }

    /// Property: an out-of-range selection changes nothing but the error slot
    #[test]
    fn invalid_selection_keeps_index(len in 1usize..10, start in 0usize..10, past in 0usize..10) {
        let start = start % len;
        let (mut player, _media, playlist) = player_with(len);
        player.select_song(&playlist, start).unwrap();

        prop_assert!(player.select_song(&playlist, len + past).is_err());
        prop_assert_eq!(player.state().current_song_index, Some(start));
        prop_assert!(player.state().audio_error.is_some());
    }

    /// Property: enabling shuffle pins the current index first in a full permutation
    #[test]
    fn shuffle_order_is_permutation_with_current_first(len in 1usize..40, pick in 0usize..40) {
        let current = pick % len;
        let (mut player, _media, playlist) = player_with(len);
        player.select_song(&playlist, current).unwrap();

        player.toggle_shuffle();

        let order = player.state().shuffle_order.clone();
        prop_assert_eq!(order[0], current);
        let mut sorted = order;
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..len).collect::<Vec<_>>());
    }

    /// Property: n skips in either direction return to the start
    #[test]
    fn skipping_n_times_wraps_around(len in 1usize..25, pick in 0usize..25, forward in any::<bool>()) {
        let start = pick % len;
        let (mut player, _media, playlist) = player_with(len);
        player.select_song(&playlist, start).unwrap();

        for _ in 0..len {
            if forward {
                player.next().unwrap();
            } else {
                player.previous().unwrap();
            }
        }

        prop_assert_eq!(player.state().current_song_index, Some(start));
    }

    /// Property: muting and unmuting restores the exact level
    #[test]
    fn mute_round_trip_restores_volume(level in 0.01f32..=1.0) {
        let (mut player, media, _playlist) = player_with(0);
        player.set_volume(level);

        player.toggle_mute();
        player.toggle_mute();

        prop_assert_eq!(player.state().volume, level);
        prop_assert!(!player.state().is_muted);
        prop_assert_eq!(media.volume(), level);
    }

    /// Property: repeat-one never changes the index on end of track
    #[test]
    fn repeat_one_keeps_index(len in 1usize..10, pick in 0usize..10, ends in 1usize..5) {
        let index = pick % len;
        let (mut player, media, playlist) = player_with(len);
        player.play_song(&playlist, index).unwrap();
        player.on_can_play();
        player.set_repeat_mode(RepeatMode::One);

        for _ in 0..ends {
            media.clear_calls();
            player.on_ended();
            prop_assert_eq!(media.position(), 0.0);
            prop_assert!(media.last_play_request().is_some());
        }

        prop_assert_eq!(player.state().current_song_index, Some(index));
    }

    /// Property: the last track with repeat off ends in place
    #[test]
    fn last_track_stops_without_wrapping(len in 1usize..15) {
        let (mut player, _media, playlist) = player_with(len);
        player.play_song(&playlist, len - 1).unwrap();
        player.on_can_play();

        player.on_ended();

        prop_assert_eq!(player.state().current_song_index, Some(len - 1));
        prop_assert!(!player.state().is_playing);
        prop_assert!(!player.wants_play());
    }

    /// Property: whatever happens, the index stays valid and the shuffle order
    /// stays a permutation of the current playlist
    #[test]
    fn transport_stays_consistent(len in 0usize..10, ops in prop::collection::vec(arbitrary_op(), 1..40)) {
        let (mut player, _media, playlist) = player_with(len);

        for op in ops {
            match op {
                Op::Next => { let _ = player.next(); }
                Op::Previous => { let _ = player.previous(); }
                Op::ToggleShuffle => player.toggle_shuffle(),
                Op::Select(index) => { let _ = player.select_song(&playlist, index); }
                Op::Ended => player.on_ended(),
                Op::Remove(index) => {
                    let id = player.store().default_playlist().songs.get(index).map(|s| s.id.clone());
                    if let Some(id) = id {
                        player.remove_song(&playlist, &id).unwrap();
                    }
                }
                Op::CycleRepeat => { player.cycle_repeat_mode(); }
            }

            let songs = player.current_playlist().len();
            if let Some(index) = player.state().current_song_index {
                prop_assert!(index < songs);
            }
            if player.state().is_shuffle {
                let mut order = player.state().shuffle_order.clone();
                order.sort_unstable();
                prop_assert_eq!(order, (0..songs).collect::<Vec<_>>());
            } else {
                prop_assert!(player.state().shuffle_order.is_empty());
            }
        }
    }
}
