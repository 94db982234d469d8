/// Playlist domain type
use crate::types::{PlaylistId, SmartCriteria, Song, SongId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved id of the always-present playlist
pub const DEFAULT_PLAYLIST_ID: &str = "default";

/// Ordered collection of songs
///
/// Order is meaningful: it defines "next" and "previous" when shuffle is off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// Unique playlist identifier
    pub id: PlaylistId,

    /// Playlist name
    pub name: String,

    /// Songs in play order
    pub songs: Vec<Song>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Criteria this playlist was materialized from, if it is a smart playlist
    #[serde(default)]
    pub smart_criteria: Option<SmartCriteria>,
}

impl Playlist {
    /// Create a new empty playlist
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(PlaylistId::generate(), name)
    }

    /// Create a playlist with a specific ID
    pub fn with_id(id: PlaylistId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            songs: Vec::new(),
            created_at: Utc::now(),
            smart_criteria: None,
        }
    }

    /// Whether this is the reserved default playlist
    pub fn is_default(&self) -> bool {
        self.id.as_str() == DEFAULT_PLAYLIST_ID
    }

    /// Whether this playlist was materialized from a filter
    pub fn is_smart_playlist(&self) -> bool {
        self.smart_criteria.is_some()
    }

    /// Number of songs
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// Whether the playlist has no songs
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Position of the first song with the given id
    pub fn position_of(&self, song_id: &SongId) -> Option<usize> {
        self.songs.iter().position(|s| &s.id == song_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_creation() {
        let playlist = Playlist::new("Road Trip");
        assert_eq!(playlist.name, "Road Trip");
        assert!(playlist.is_empty());
        assert!(!playlist.is_default());
        assert!(!playlist.is_smart_playlist());
        assert!(playlist.created_at <= Utc::now());
    }

    #[test]
    fn position_lookup() {
        let mut playlist = Playlist::with_id(PlaylistId::new(DEFAULT_PLAYLIST_ID), "Mine");
        let a = Song::new("A", "blob:a");
        let b = Song::new("B", "blob:b");
        let b_id = b.id.clone();
        playlist.songs.push(a);
        playlist.songs.push(b);

        assert!(playlist.is_default());
        assert_eq!(playlist.position_of(&b_id), Some(1));
        assert_eq!(playlist.position_of(&SongId::new("missing")), None);
    }
}
