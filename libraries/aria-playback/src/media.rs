//! Media element abstraction
//!
//! The controller drives a single playable element through this trait. Play
//! requests are asynchronous on every platform that matters: the element only
//! starts the request, and the host reports the outcome back to the controller
//! with the request id it was given.

use crate::error::Result;
use aria_audio::ElementId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one play request so late outcomes can be told apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayRequestId(pub u64);

/// How much of the media is decoded (`HTMLMediaElement.readyState`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Map a platform ready-state code; unknown codes count as `HaveEnoughData`
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::HaveNothing,
            1 => Self::HaveMetadata,
            2 => Self::HaveCurrentData,
            3 => Self::HaveFutureData,
            _ => Self::HaveEnoughData,
        }
    }

    /// Whether enough is decoded for a play request to be expected to succeed
    pub fn is_buffered(self) -> bool {
        self >= Self::HaveCurrentData
    }
}

/// Class of a media load/decode failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaErrorKind {
    Aborted,
    Network,
    Decode,
    FormatUnsupported,
    Unknown(u16),
}

impl MediaErrorKind {
    /// Map a platform `MediaError.code`
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Aborted,
            2 => Self::Network,
            3 => Self::Decode,
            4 => Self::FormatUnsupported,
            other => Self::Unknown(other),
        }
    }

    /// Message shown to the user
    pub fn message(&self) -> String {
        match self {
            Self::Aborted => "Audio playback was aborted".to_string(),
            Self::Network => "Network error occurred while loading audio".to_string(),
            Self::Decode => "Audio file is corrupted or in an unsupported format".to_string(),
            Self::FormatUnsupported => "Audio format not supported by your browser".to_string(),
            Self::Unknown(code) => format!("Audio error (code: {})", code),
        }
    }
}

/// Why a play request was declined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayRejection {
    /// Autoplay policy: the page has not had a user gesture yet
    NeedsUserGesture,

    /// A newer load or pause interrupted the request
    Interrupted,

    /// No playable source
    NotSupported,

    /// Anything else, with the platform message
    Other(String),
}

impl PlayRejection {
    /// Classify a DOM exception by name and message
    pub fn from_dom(name: &str, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if name == "NotAllowedError"
            || lower.contains("user gesture")
            || lower.contains("user didn't interact")
        {
            return Self::NeedsUserGesture;
        }
        match name {
            "AbortError" => Self::Interrupted,
            "NotSupportedError" => Self::NotSupported,
            _ if message.is_empty() => Self::Other("Audio playback failed".to_string()),
            _ => Self::Other(message.to_string()),
        }
    }

    /// Benign rejections are logged, never shown
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NeedsUserGesture)
    }
}

impl fmt::Display for PlayRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedsUserGesture => write!(f, "Playback requires a user gesture"),
            Self::Interrupted => write!(f, "The play request was interrupted"),
            Self::NotSupported => write!(f, "No supported audio source"),
            Self::Other(message) => write!(f, "{}", message),
        }
    }
}

/// The playable element owned by the transport
///
/// Only the transport controller calls these; nothing else may drive the
/// element's transport directly.
pub trait MediaElement {
    /// Stable identity, used to bind the processing graph
    fn id(&self) -> ElementId;

    /// Assign a new source and start loading it
    fn set_source(&mut self, url: &str) -> Result<()>;

    /// Start a play request; the outcome is reported later under `request`
    fn play(&mut self, request: PlayRequestId);

    fn pause(&mut self);

    /// Set the playback position in seconds
    fn set_current_time(&mut self, seconds: f64) -> Result<()>;

    fn current_time(&self) -> f64;

    /// Duration in seconds; NaN while unknown
    fn duration(&self) -> f64;

    fn ready_state(&self) -> ReadyState;

    fn is_ended(&self) -> bool;

    /// Linear output volume, 0-1
    fn set_volume(&mut self, volume: f32);

    fn set_playback_rate(&mut self, rate: f32);
}
