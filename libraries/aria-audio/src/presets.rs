//! Graphic equalizer layout and presets
//!
//! 10 octave-spaced bands. The outermost bands are shelves so the extremes of
//! the spectrum are lifted or cut as a whole; everything in between is peaking.

use crate::engine::FilterKind;
use aria_core::{EqualizerSettings, EQ_BAND_COUNT};

/// Band centre frequencies (Hz)
pub const EQ_FREQUENCIES: [f32; EQ_BAND_COUNT] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Quality factor shared by every band
pub const EQ_Q: f32 = 1.0;

/// Filter response for a band
pub fn band_kind(index: usize) -> FilterKind {
    match index {
        0 => FilterKind::LowShelf,
        i if i == EQ_BAND_COUNT - 1 => FilterKind::HighShelf,
        _ => FilterKind::Peaking,
    }
}

/// Built-in equalizer preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqPreset {
    Flat,
    Rock,
    Pop,
    Jazz,
    Classical,
    Electronic,
    Bass,
    Vocal,
}

impl EqPreset {
    /// Every built-in preset, in menu order
    pub const ALL: [EqPreset; 8] = [
        Self::Flat,
        Self::Rock,
        Self::Pop,
        Self::Jazz,
        Self::Classical,
        Self::Electronic,
        Self::Bass,
        Self::Vocal,
    ];

    /// Look up a preset by its settings name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Name stored in `EqualizerSettings::preset`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Rock => "rock",
            Self::Pop => "pop",
            Self::Jazz => "jazz",
            Self::Classical => "classical",
            Self::Electronic => "electronic",
            Self::Bass => "bass",
            Self::Vocal => "vocal",
        }
    }

    /// Band gains in dB
    pub fn gains(&self) -> [f32; EQ_BAND_COUNT] {
        match self {
            Self::Flat => [0.0; EQ_BAND_COUNT],
            Self::Rock => [5.0, 3.0, -1.0, -2.0, 1.0, 2.0, 4.0, 5.0, 6.0, 6.0],
            Self::Pop => [2.0, 4.0, 3.0, 1.0, -1.0, -1.0, 1.0, 3.0, 4.0, 4.0],
            Self::Jazz => [4.0, 3.0, 1.0, 2.0, -1.0, -1.0, 0.0, 2.0, 3.0, 4.0],
            Self::Classical => [5.0, 4.0, 3.0, 2.0, -1.0, -1.0, 2.0, 3.0, 4.0, 5.0],
            Self::Electronic => [6.0, 5.0, 2.0, 0.0, -2.0, 2.0, 1.0, 2.0, 5.0, 6.0],
            Self::Bass => [8.0, 6.0, 4.0, 2.0, 1.0, -1.0, -2.0, -1.0, 2.0, 3.0],
            Self::Vocal => [-2.0, -1.0, 2.0, 4.0, 4.0, 3.0, 2.0, 1.0, 0.0, -1.0],
        }
    }

    /// Overwrite the bands of `settings` with this preset
    ///
    /// The enabled flag is left alone.
    pub fn apply_to(&self, settings: &mut EqualizerSettings) {
        settings.bands = self.gains();
        settings.preset = self.name().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aria_core::EQ_GAIN_RANGE_DB;

    #[test]
    fn shelves_at_the_edges() {
        assert_eq!(band_kind(0), FilterKind::LowShelf);
        assert_eq!(band_kind(EQ_BAND_COUNT - 1), FilterKind::HighShelf);
        for i in 1..EQ_BAND_COUNT - 1 {
            assert_eq!(band_kind(i), FilterKind::Peaking);
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(EqPreset::from_name("rock"), Some(EqPreset::Rock));
        assert_eq!(EqPreset::from_name("Vocal"), Some(EqPreset::Vocal));
        assert_eq!(EqPreset::from_name("custom"), None);

        for preset in EqPreset::ALL {
            assert_eq!(EqPreset::from_name(preset.name()), Some(preset));
        }
    }

    #[test]
    fn presets_stay_in_gain_range() {
        for preset in EqPreset::ALL {
            for gain in preset.gains() {
                assert!(EQ_GAIN_RANGE_DB.contains(&gain), "{:?} out of range", preset);
            }
        }
    }

    #[test]
    fn apply_keeps_enabled_flag() {
        let mut settings = EqualizerSettings::default();
        settings.enabled = true;
        EqPreset::Bass.apply_to(&mut settings);

        assert!(settings.enabled);
        assert_eq!(settings.preset, "bass");
        assert_eq!(settings.bands[0], 8.0);
    }
}
