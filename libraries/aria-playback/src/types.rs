//! Transport types

use aria_core::{PlaylistId, DEFAULT_PLAYLIST_ID};
use serde::{Deserialize, Serialize};

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop after the last track
    #[default]
    Off,

    /// Wrap to the first track after the last
    All,

    /// Replay the current track
    One,
}

impl RepeatMode {
    /// Next mode in the UI cycle: off → all → one → off
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "off" => Some(Self::Off),
            "all" => Some(Self::All),
            "one" => Some(Self::One),
            _ => None,
        }
    }
}

/// Where the transport is in a track's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPhase {
    /// Nothing selected
    #[default]
    Idle,

    /// Source assigned, waiting for decode readiness
    Loading,

    /// Decoded and paused
    Ready,

    Playing,

    /// Track finished; resolved into the next transition right away
    Ended,

    /// Load, decode or playback failed
    Error,
}

/// Observable transport state
///
/// `is_playing` is what the transport believes; the element itself is the
/// ground truth and the controller reconciles the two on every transition.
/// `current_time` and `duration` are advisory mirrors of the element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportState {
    pub current_playlist_id: PlaylistId,

    /// Selected position in the current playlist
    pub current_song_index: Option<usize>,

    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,

    /// Linear volume, 0-1 (kept while muted)
    pub volume: f32,
    pub is_muted: bool,

    pub repeat_mode: RepeatMode,
    pub is_shuffle: bool,

    /// Playlist indices in shuffled play order; empty when shuffle is off
    pub shuffle_order: Vec<usize>,

    /// Last error shown to the user
    pub audio_error: Option<String>,

    pub phase: TransportPhase,
}

impl TransportState {
    pub fn new(volume: f32) -> Self {
        Self {
            current_playlist_id: PlaylistId::new(DEFAULT_PLAYLIST_ID),
            current_song_index: None,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume,
            is_muted: false,
            repeat_mode: RepeatMode::Off,
            is_shuffle: false,
            shuffle_order: Vec::new(),
            audio_error: None,
            phase: TransportPhase::Idle,
        }
    }

    /// Selected index in the `-1 = none` form UIs expect
    pub fn current_song_index_or_none(&self) -> i64 {
        self.current_song_index.map_or(-1, |index| index as i64)
    }

    pub fn has_selection(&self) -> bool {
        self.current_song_index.is_some()
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self::new(0.7)
    }
}

/// Sleep timer state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepTimer {
    pub enabled: bool,

    /// Requested length in minutes
    pub duration_minutes: f64,

    /// Seconds left before playback pauses
    pub remaining_seconds: f64,

    /// Stored for the UI; no fade is applied
    pub fade_out: bool,
}

impl Default for SleepTimer {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_minutes: 30.0,
            remaining_seconds: 0.0,
            fade_out: true,
        }
    }
}

impl SleepTimer {
    /// Arm the timer
    pub fn start(&mut self, minutes: f64, fade_out: bool) {
        let minutes = if minutes.is_finite() { minutes.max(0.0) } else { 0.0 };
        self.enabled = true;
        self.duration_minutes = minutes;
        self.remaining_seconds = minutes * 60.0;
        self.fade_out = fade_out;
    }

    pub fn cancel(&mut self) {
        self.enabled = false;
        self.remaining_seconds = 0.0;
    }

    /// Count down; returns true exactly once, when the timer expires
    pub fn advance(&mut self, elapsed_seconds: f64) -> bool {
        if !self.enabled || !elapsed_seconds.is_finite() || elapsed_seconds <= 0.0 {
            return false;
        }
        self.remaining_seconds = (self.remaining_seconds - elapsed_seconds).max(0.0);
        if self.remaining_seconds > 0.0 {
            return false;
        }
        self.enabled = false;
        true
    }
}
