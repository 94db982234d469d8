mod bookmark;
mod ids;
mod playlist;
mod settings;
mod smart;
mod song;

pub use bookmark::Bookmark;
pub use ids::{BookmarkId, PlaylistId, SongId};
pub use playlist::{Playlist, DEFAULT_PLAYLIST_ID};
pub use settings::{
    AudioEffects, AudioSettings, AudioSettingsUpdate, EqualizerSettings, SettingsDelta,
    CUSTOM_PRESET, EQ_BAND_COUNT, EQ_GAIN_RANGE_DB, PLAYBACK_SPEED_RANGE,
};
pub use smart::SmartCriteria;
pub use song::{Song, UNKNOWN_ARTIST};
