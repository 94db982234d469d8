/// Player configuration
use crate::error::{PlaybackError, Result};
use aria_audio::GraphConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for overrides (`ARIA_INITIAL_VOLUME=0.5`)
pub const ENV_PREFIX: &str = "ARIA";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Volume at startup (0-1)
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Delay before retrying a play request that was rejected while buffering
    #[serde(default = "default_play_retry_delay_ms")]
    pub play_retry_delay_ms: u32,

    /// Analysis transform size (power of two)
    #[serde(default = "default_fft_size")]
    pub fft_size: u32,

    /// Name of the playlist that always exists
    #[serde(default = "default_playlist_name")]
    pub default_playlist_name: String,

    /// Synthetic reverb tail length (seconds)
    #[serde(default = "default_impulse_seconds")]
    pub impulse_seconds: f32,

    /// Echo delay time (seconds)
    #[serde(default = "default_echo_delay")]
    pub echo_delay: f32,

    /// Echo feedback gain
    #[serde(default = "default_echo_feedback")]
    pub echo_feedback: f32,

    /// Bass shelf corner frequency (Hz)
    #[serde(default = "default_bass_frequency")]
    pub bass_frequency: f32,

    /// Bass shelf dB per percent of bass boost
    #[serde(default = "default_bass_db_per_percent")]
    pub bass_db_per_percent: f32,

    /// Length of `recent`/`mostPlayed` smart playlists when the criteria give none
    #[serde(default = "default_smart_playlist_limit")]
    pub smart_playlist_limit: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            play_retry_delay_ms: default_play_retry_delay_ms(),
            fft_size: default_fft_size(),
            default_playlist_name: default_playlist_name(),
            impulse_seconds: default_impulse_seconds(),
            echo_delay: default_echo_delay(),
            echo_feedback: default_echo_feedback(),
            bass_frequency: default_bass_frequency(),
            bass_db_per_percent: default_bass_db_per_percent(),
            smart_playlist_limit: default_smart_playlist_limit(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from an optional JSON document and the environment
    ///
    /// Environment variables prefixed with `ARIA_` override the document.
    pub fn load(document: Option<&str>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(json) = document {
            settings = settings.add_source(config::File::from_str(json, config::FileFormat::Json));
        }

        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlaybackError::Config(format!(
                "initial_volume must be within 0-1, got {}",
                self.initial_volume
            )));
        }

        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(PlaybackError::Config(format!(
                "fft_size must be a power of two between 32 and 32768, got {}",
                self.fft_size
            )));
        }

        if self.default_playlist_name.trim().is_empty() {
            return Err(PlaybackError::Config(
                "default_playlist_name must not be empty".to_string(),
            ));
        }

        if !(self.impulse_seconds > 0.0 && self.impulse_seconds <= 10.0) {
            return Err(PlaybackError::Config(format!(
                "impulse_seconds must be within (0, 10], got {}",
                self.impulse_seconds
            )));
        }

        if !(0.0..1.0).contains(&self.echo_feedback) {
            return Err(PlaybackError::Config(format!(
                "echo_feedback must be below 1 to keep the delay loop stable, got {}",
                self.echo_feedback
            )));
        }

        if self.echo_delay <= 0.0 || self.bass_frequency <= 0.0 {
            return Err(PlaybackError::Config(
                "echo_delay and bass_frequency must be positive".to_string(),
            ));
        }

        if self.smart_playlist_limit == 0 {
            return Err(PlaybackError::Config(
                "smart_playlist_limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Fixed processing graph parameters
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            impulse_seconds: self.impulse_seconds,
            echo_delay: self.echo_delay,
            echo_feedback: self.echo_feedback,
            bass_frequency: self.bass_frequency,
            bass_db_per_percent: self.bass_db_per_percent,
            fft_size: self.fft_size,
        }
    }
}

// Default values
fn default_initial_volume() -> f32 {
    0.7
}

fn default_play_retry_delay_ms() -> u32 {
    500
}

fn default_fft_size() -> u32 {
    256
}

fn default_playlist_name() -> String {
    "My Playlist".to_string()
}

fn default_impulse_seconds() -> f32 {
    2.0
}

fn default_echo_delay() -> f32 {
    0.3
}

fn default_echo_feedback() -> f32 {
    0.3
}

fn default_bass_frequency() -> f32 {
    200.0
}

fn default_bass_db_per_percent() -> f32 {
    0.2
}

fn default_smart_playlist_limit() -> usize {
    25
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_match_graph_defaults() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.graph_config(), GraphConfig::default());
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = PlayerConfig::load(Some(r#"{ "initial_volume": 0.25, "fft_size": 512 }"#)).unwrap();
        assert_eq!(config.initial_volume, 0.25);
        assert_eq!(config.fft_size, 512);
        assert_eq!(config.play_retry_delay_ms, 500);
        assert_eq!(config.default_playlist_name, "My Playlist");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = PlayerConfig::default();
        config.fft_size = 300;
        assert!(matches!(config.validate(), Err(PlaybackError::Config(_))));

        let mut config = PlayerConfig::default();
        config.echo_feedback = 1.0;
        assert!(config.validate().is_err());

        assert!(PlayerConfig::load(Some(r#"{ "initial_volume": 3.0 }"#)).is_err());
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        assert!(matches!(
            PlayerConfig::load(Some("{ not json")),
            Err(PlaybackError::Config(_))
        ));
    }
}
