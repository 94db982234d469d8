/// Bookmark domain type
use crate::types::{BookmarkId, SongId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named position inside a song
///
/// `song_id` is a weak reference: the song may be removed later, in which case
/// the bookmark simply resolves to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Unique bookmark identifier
    pub id: BookmarkId,

    /// Song this bookmark points into
    pub song_id: SongId,

    /// Position in seconds
    pub position: f64,

    /// Display name
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Create a new bookmark
    pub fn new(song_id: SongId, position: f64, name: impl Into<String>) -> Self {
        Self {
            id: BookmarkId::generate(),
            song_id,
            position,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}
