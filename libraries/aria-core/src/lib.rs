//! Aria Player Core
//!
//! Platform-agnostic domain types and the in-memory playlist store for Aria Player.
//!
//! This crate provides the building blocks shared by the processing graph
//! (`aria-audio`), the transport (`aria-playback`) and upload intake (`aria-importer`).
//!
//! # Architecture
//!
//! - **Domain Types**: `Song`, `Playlist`, `Bookmark`, `AudioSettings`, `SmartCriteria`
//! - **Playlist Store**: pure data + mutation operations, no I/O
//! - **Resource Ledger**: release-exactly-once bookkeeping for media locators
//! - **Error Handling**: unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use aria_core::{PlaylistStore, Song, DEFAULT_PLAYLIST_ID};
//!
//! let mut store = PlaylistStore::new("My Playlist");
//! let default_id = store.default_playlist().id.clone();
//! assert_eq!(default_id.as_str(), DEFAULT_PLAYLIST_ID);
//!
//! store.add_song(&default_id, Song::new("Intro", "blob:intro")).unwrap();
//!
//! let road_trip = store.create_playlist("Road Trip");
//! assert!(store.playlist(&road_trip).unwrap().songs.is_empty());
//!
//! // The default playlist can never be deleted
//! assert!(store.delete_playlist(&default_id).is_err());
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod resources;
pub mod store;
pub mod time;
pub mod types;

pub use error::{CoreError, Result};
pub use resources::{ReleaseOutcome, ResourceLedger, ResourceReleaser};
pub use store::PlaylistStore;
pub use time::format_time;
pub use types::{
    AudioEffects, AudioSettings, AudioSettingsUpdate, Bookmark, BookmarkId, EqualizerSettings,
    Playlist, PlaylistId, SettingsDelta, SmartCriteria, Song, SongId, CUSTOM_PRESET,
    DEFAULT_PLAYLIST_ID, EQ_BAND_COUNT, EQ_GAIN_RANGE_DB, PLAYBACK_SPEED_RANGE, UNKNOWN_ARTIST,
};
