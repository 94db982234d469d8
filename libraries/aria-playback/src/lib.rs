//! Aria Player - Transport Control
//!
//! Platform-agnostic transport state machine for Aria Player.
//!
//! This crate provides:
//! - Song selection with validation and a single-slot error surface
//! - Play/pause with asynchronous play outcomes and one buffered retry
//! - Next/previous with wrap-around, shuffle (current song pinned first) and repeat
//! - Volume and mute (mute restores the exact previous level)
//! - Reconciliation of the transport after playlist mutations
//! - Bookmarks, smart playlists, sleep timer, upload intake
//! - Live equalizer/effect updates through the processing graph
//!
//! # Architecture
//!
//! The [`TransportController`] owns the media element (through the
//! [`MediaElement`] trait), the processing graph manager from `aria-audio` and
//! the playlist store from `aria-core`. Hosts call intents (`toggle_play_pause`,
//! `seek`, `next`, ...) and forward media events (`on_can_play`, `on_ended`,
//! `on_error`, ...). State changes are announced as [`PlayerEvent`]s.
//!
//! With the `wasm` feature the controller is exposed to JavaScript as
//! `WasmPlayer`, bound to an `<audio>` element and the Web Audio API.
//!
//! # Example
//!
//! ```rust,ignore
//! use aria_playback::{PlayerConfig, TransportController};
//!
//! let mut player = TransportController::new(
//!     PlayerConfig::default(),
//!     Box::new(my_media_element),
//!     Box::new(my_engine_factory),
//!     Box::new(my_releaser),
//! )?;
//!
//! let playlist = player.store().default_playlist().id.clone();
//! player.select_song(&playlist, 0)?;
//! player.on_can_play(); // from the element
//! player.toggle_play_pause();
//! ```

pub mod config;
pub mod controller;
mod error;
pub mod events;
pub mod media;
pub mod shuffle;
pub mod types;
mod volume;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

#[cfg(feature = "wasm")]
pub mod wasm;

// Public exports
pub use config::PlayerConfig;
pub use controller::TransportController;
pub use error::{PlaybackError, Result, SelectionError};
pub use events::{EventBus, PlayerEvent, SubscriptionId};
pub use media::{MediaElement, MediaErrorKind, PlayRejection, PlayRequestId, ReadyState};
pub use types::{RepeatMode, SleepTimer, TransportPhase, TransportState};
pub use volume::Volume;
