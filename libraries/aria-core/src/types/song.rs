/// Song domain type
use crate::types::SongId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Artist used when the upload carries no tag information
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// A playable song
///
/// `url` is an opaque locator for the backing media resource. The uploader owns
/// the bytes; the player only asks for the locator to be released once the song
/// is gone from every playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Unique song identifier
    pub id: SongId,

    /// Display name
    pub name: String,

    /// Artist name
    pub artist: String,

    /// Album name
    #[serde(default)]
    pub album: Option<String>,

    /// Genre
    #[serde(default)]
    pub genre: Option<String>,

    /// Mood tag
    #[serde(default)]
    pub mood: Option<String>,

    /// Tempo in beats per minute
    #[serde(default)]
    pub bpm: Option<u32>,

    /// Duration in seconds (0 until decoded metadata arrives)
    #[serde(default)]
    pub duration: f64,

    /// Locator of the backing media resource
    pub url: String,

    /// Marked as favorite
    #[serde(default)]
    pub is_favorite: bool,

    /// Number of times playback of this song started
    #[serde(default)]
    pub play_count: u32,

    /// When playback of this song last started
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,

    /// Free-form lyrics text
    #[serde(default)]
    pub lyrics: Option<String>,
}

impl Song {
    /// Create a new song with minimal metadata
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: SongId::generate(),
            name: name.into(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: None,
            genre: None,
            mood: None,
            bpm: None,
            duration: 0.0,
            url: url.into(),
            is_favorite: false,
            play_count: 0,
            last_played: None,
            lyrics: None,
        }
    }

    /// Set the artist
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    /// Set the genre
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Set the mood
    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    /// Whether the duration is known yet
    pub fn has_duration(&self) -> bool {
        self.duration > 0.0 && self.duration.is_finite()
    }
}
