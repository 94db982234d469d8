/// Core error types for Aria Player
use crate::types::{BookmarkId, PlaylistId, SongId};
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for Aria Player
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Playlist not found
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(PlaylistId),

    /// Song not found
    #[error("Song not found: {0}")]
    SongNotFound(SongId),

    /// Bookmark not found
    #[error("Bookmark not found: {0}")]
    BookmarkNotFound(BookmarkId),

    /// The default playlist is permanent
    #[error("The default playlist cannot be deleted")]
    DefaultPlaylistProtected,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
