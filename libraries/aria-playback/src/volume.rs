//! Volume and mute
//!
//! Linear 0-1 volume applied to the media element. Muting never touches the
//! level, so unmuting restores it exactly. Setting the level to zero also
//! mutes, remembering the last audible level for the next unmute.

#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    level: f32,
    muted: bool,

    /// Last non-zero level
    restore_level: f32,
}

impl Volume {
    pub fn new(level: f32) -> Self {
        let level = clamp_level(level);
        Self {
            level,
            muted: level == 0.0,
            restore_level: if level > 0.0 { level } else { 1.0 },
        }
    }

    /// Set the level (clamped to 0-1)
    ///
    /// Zero mutes; any audible level unmutes.
    pub fn set_level(&mut self, level: f32) {
        let level = clamp_level(level);
        if level == 0.0 {
            if self.level > 0.0 {
                self.restore_level = self.level;
            }
            self.level = 0.0;
            self.muted = true;
        } else {
            self.level = level;
            self.restore_level = level;
            self.muted = false;
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.muted = false;
            if self.level == 0.0 {
                self.level = self.restore_level;
            }
        } else {
            self.muted = true;
        }
    }

    /// Level the element should actually output
    pub fn effective(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(0.7)
    }
}

fn clamp_level(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mute_preserves_level() {
        let mut volume = Volume::new(0.42);
        volume.toggle_mute();
        assert!(volume.is_muted());
        assert_eq!(volume.effective(), 0.0);
        assert_eq!(volume.level(), 0.42);

        volume.toggle_mute();
        assert!(!volume.is_muted());
        assert_eq!(volume.effective(), 0.42);
    }

    #[test]
    fn zero_level_mutes_and_unmute_restores() {
        let mut volume = Volume::new(0.6);
        volume.set_level(0.0);
        assert!(volume.is_muted());

        volume.toggle_mute();
        assert_eq!(volume.level(), 0.6);
        assert_eq!(volume.effective(), 0.6);
    }

    #[test]
    fn audible_level_unmutes() {
        let mut volume = Volume::new(0.5);
        volume.toggle_mute();
        volume.set_level(0.3);
        assert!(!volume.is_muted());
        assert_eq!(volume.effective(), 0.3);
    }

    #[test]
    fn level_is_clamped() {
        let mut volume = Volume::new(2.0);
        assert_eq!(volume.level(), 1.0);
        volume.set_level(-1.0);
        assert_eq!(volume.level(), 0.0);
        volume.set_level(f32::NAN);
        assert_eq!(volume.level(), 0.0);
    }
}
