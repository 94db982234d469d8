//! Audio processing settings
//!
//! Plain data describing the desired state of the processing graph. The graph
//! manager in `aria-audio` turns these values into node parameters; nothing here
//! touches an audio engine.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Number of graphic equalizer bands
pub const EQ_BAND_COUNT: usize = 10;

/// Allowed equalizer gain per band (dB)
pub const EQ_GAIN_RANGE_DB: RangeInclusive<f32> = -12.0..=12.0;

/// Allowed playback rate
pub const PLAYBACK_SPEED_RANGE: RangeInclusive<f32> = 0.5..=2.0;

const EFFECT_AMOUNT_MAX: f32 = 100.0;

/// Preset name used once a band has been edited by hand
pub const CUSTOM_PRESET: &str = "custom";

/// Graphic equalizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerSettings {
    /// Whether band gains are applied
    pub enabled: bool,

    /// Name of the preset the bands came from ("custom" after manual edits)
    pub preset: String,

    /// Gain per band in dB
    pub bands: [f32; EQ_BAND_COUNT],
}

impl Default for EqualizerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: "flat".to_string(),
            bands: [0.0; EQ_BAND_COUNT],
        }
    }
}

impl EqualizerSettings {
    /// Set a single band, marking the preset as custom
    ///
    /// Returns false if `index` is not a valid band.
    pub fn set_band(&mut self, index: usize, gain_db: f32) -> bool {
        let Some(band) = self.bands.get_mut(index) else {
            return false;
        };
        *band = clamp_gain(gain_db);
        self.preset = CUSTOM_PRESET.to_string();
        true
    }

    /// Gain that should actually reach band `index` (0 dB while disabled)
    pub fn effective_gain(&self, index: usize) -> f32 {
        if self.enabled {
            self.bands.get(index).copied().unwrap_or(0.0)
        } else {
            0.0
        }
    }

    fn sanitize(&mut self) {
        for band in &mut self.bands {
            *band = clamp_gain(*band);
        }
    }
}

/// Effect amounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioEffects {
    /// Reverb send amount (0-100)
    pub reverb: f32,

    /// Echo send amount (0-100)
    pub echo: f32,

    /// Bass boost amount (0-100)
    pub bass_boost: f32,

    /// Route the mix through the spatial panner
    pub spatial_audio: bool,
}

impl Default for AudioEffects {
    fn default() -> Self {
        Self {
            reverb: 0.0,
            echo: 0.0,
            bass_boost: 0.0,
            spatial_audio: false,
        }
    }
}

impl AudioEffects {
    fn sanitize(&mut self) {
        self.reverb = clamp_amount(self.reverb);
        self.echo = clamp_amount(self.echo);
        self.bass_boost = clamp_amount(self.bass_boost);
    }
}

/// Complete audio settings
///
/// `crossfade`, `gapless` and `normalize` are carried for the UI but have no
/// effect on playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    /// Graphic equalizer
    pub equalizer: EqualizerSettings,

    /// Effect amounts
    pub effects: AudioEffects,

    /// Media playback rate (0.5-2.0)
    pub playback_speed: f32,

    /// Reserved
    pub crossfade: bool,

    /// Reserved
    pub gapless: bool,

    /// Reserved
    pub normalize: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            equalizer: EqualizerSettings::default(),
            effects: AudioEffects::default(),
            playback_speed: 1.0,
            crossfade: false,
            gapless: true,
            normalize: false,
        }
    }
}

/// Partial settings update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettingsUpdate {
    pub equalizer: Option<EqualizerSettings>,
    pub effects: Option<AudioEffects>,
    pub playback_speed: Option<f32>,
    pub crossfade: Option<bool>,
    pub gapless: Option<bool>,
    pub normalize: Option<bool>,
}

/// Which parts of the settings changed after an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsDelta {
    pub equalizer: bool,
    pub effects: bool,
    pub playback_speed: bool,
}

impl SettingsDelta {
    /// Whether anything the graph cares about changed
    pub fn any(&self) -> bool {
        self.equalizer || self.effects || self.playback_speed
    }
}

impl AudioSettings {
    /// Merge a partial update, clamping every value into its valid range
    pub fn apply(&mut self, update: AudioSettingsUpdate) -> SettingsDelta {
        let mut delta = SettingsDelta::default();

        if let Some(mut equalizer) = update.equalizer {
            equalizer.sanitize();
            delta.equalizer = equalizer != self.equalizer;
            self.equalizer = equalizer;
        }

        if let Some(mut effects) = update.effects {
            effects.sanitize();
            delta.effects = effects != self.effects;
            self.effects = effects;
        }

        if let Some(speed) = update.playback_speed {
            let speed = clamp_speed(speed);
            delta.playback_speed = speed != self.playback_speed;
            self.playback_speed = speed;
        }

        if let Some(crossfade) = update.crossfade {
            self.crossfade = crossfade;
        }
        if let Some(gapless) = update.gapless {
            self.gapless = gapless;
        }
        if let Some(normalize) = update.normalize {
            self.normalize = normalize;
        }

        delta
    }
}

fn clamp_gain(gain_db: f32) -> f32 {
    if gain_db.is_finite() {
        gain_db.clamp(*EQ_GAIN_RANGE_DB.start(), *EQ_GAIN_RANGE_DB.end())
    } else {
        0.0
    }
}

fn clamp_amount(amount: f32) -> f32 {
    if amount.is_finite() {
        amount.clamp(0.0, EFFECT_AMOUNT_MAX)
    } else {
        0.0
    }
}

fn clamp_speed(speed: f32) -> f32 {
    if speed.is_finite() {
        speed.clamp(*PLAYBACK_SPEED_RANGE.start(), *PLAYBACK_SPEED_RANGE.end())
    } else {
        1.0
    }
}
