//! Error types for transport control

use crate::media::{MediaErrorKind, PlayRejection};
use aria_core::{CoreError, PlaylistId, SongId};
use thiserror::Error;

/// The requested song cannot be selected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    /// No playlist with this id
    #[error("Playlist not found")]
    PlaylistNotFound(PlaylistId),

    /// Index past the end of the playlist
    #[error("Invalid song index: {index}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The song has no playable locator
    #[error("Song file not available")]
    SongUnavailable(SongId),
}

/// Playback errors
///
/// Errors that affect whether sound is produced end up, rendered with
/// `Display`, in the transport's single error slot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// Invalid playlist or index
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// The media element reported a load or decode failure
    #[error("{}", .0.message())]
    Media(MediaErrorKind),

    /// The platform declined a play request
    #[error("{0}")]
    PlaybackRejected(PlayRejection),

    /// Setting the media position failed
    #[error("Seek failed")]
    SeekFailed,

    /// Assigning a new source failed
    #[error("Failed to load audio file")]
    LoadFailed,

    /// A media element command failed
    #[error("Media element error: {0}")]
    Element(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Playlist store error
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PlaybackError {
    /// Create a media element command error
    pub fn element(msg: impl Into<String>) -> Self {
        Self::Element(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
