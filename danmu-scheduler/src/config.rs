//! Scheduler configuration

use crate::{Error, Result};
use std::time::Duration;

/// Settings a user may change during playback
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlaybackSettings {
    /// Flight durations are divided by this factor
    pub speed_multiplier: f64,
    /// Comment font sizes are multiplied by this factor
    pub font_size_multiplier: f64,
    /// Active comment count at which admission probability reaches 1.0
    pub max_active_count: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            font_size_multiplier: 1.0,
            max_active_count: 300,
        }
    }
}

impl PlaybackSettings {
    /// Checks that every field is usable
    pub fn validate(&self) -> Result<()> {
        ensure_positive("speed_multiplier", self.speed_multiplier)?;
        ensure_positive("font_size_multiplier", self.font_size_multiplier)?;
        if self.max_active_count == 0 {
            return Err(Error::InvalidConfig(
                "max_active_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Size of the display surface in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScreenGeometry {
    pub width: f64,
    pub height: f64,
}

impl ScreenGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

/// Row layout used by the lane allocator
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LaneLayout {
    /// Height of one lane in pixels
    pub row_height: f64,
    /// Space above the first top/scroll lane
    pub top_margin: f64,
    /// Space kept clear at the bottom of the screen
    pub bottom_margin: f64,
    /// Upper bound on lanes per group
    pub max_lanes_cap: usize,
    /// Fraction of the screen height lanes may cover, in (0, 1]
    pub display_area: f64,
    /// Fraction of a scrolling comment's flight after which its lane is
    /// offered again. 0.2 reuses the lane once a fifth of the transit is done.
    pub scroll_reuse_fraction: f64,
}

impl Default for LaneLayout {
    fn default() -> Self {
        Self {
            row_height: 25.0,
            top_margin: 25.0,
            bottom_margin: 50.0,
            max_lanes_cap: 50,
            display_area: 1.0,
            scroll_reuse_fraction: 0.2,
        }
    }
}

impl LaneLayout {
    /// Number of lanes per group that fit on the given screen
    pub fn lane_count(&self, screen: &ScreenGeometry) -> usize {
        let rows = (screen.height * self.display_area / self.row_height).floor() - 1.0;
        if rows < 1.0 {
            return 1;
        }
        (rows as usize).clamp(1, self.max_lanes_cap)
    }

    fn validate(&self) -> Result<()> {
        ensure_positive("row_height", self.row_height)?;
        ensure_non_negative("top_margin", self.top_margin)?;
        ensure_non_negative("bottom_margin", self.bottom_margin)?;
        ensure_unit_interval("display_area", self.display_area)?;
        ensure_unit_interval("scroll_reuse_fraction", self.scroll_reuse_fraction)?;
        if self.max_lanes_cap == 0 {
            return Err(Error::InvalidConfig(
                "max_lanes_cap must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete configuration of one playback session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    pub settings: PlaybackSettings,
    pub screen: ScreenGeometry,
    pub layout: LaneLayout,
    /// Idle animations kept back before pooled ones are reused
    pub animation_retention: usize,
    /// Maximum idle handles of each kind kept in the resource pool
    pub pool_capacity: usize,
    /// Interval of the admission tick in milliseconds
    pub tick_interval_ms: u64,
    /// Seed for admission randomness (None = seeded from the OS)
    pub rng_seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            settings: PlaybackSettings::default(),
            screen: ScreenGeometry::default(),
            layout: LaneLayout::default(),
            animation_retention: 3,
            pool_capacity: 512,
            tick_interval_ms: 26,
            rng_seed: None,
        }
    }
}

impl SchedulerConfig {
    /// Checks that the configuration can drive a session
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        ensure_positive("screen.width", self.screen.width)?;
        ensure_positive("screen.height", self.screen.height)?;
        self.layout.validate()?;
        if self.tick_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of lanes per group for this screen
    pub fn lane_count(&self) -> usize {
        self.layout.lane_count(&self.screen)
    }

    /// Interval of the admission tick
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{name} must be positive, got {value}")))
    }
}

fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{name} must not be negative, got {value}")))
    }
}

fn ensure_unit_interval(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{name} must be in (0, 1], got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SchedulerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(26));
    }

    #[test]
    fn test_lane_count() {
        let layout = LaneLayout::default();

        // 1080 / 25 = 43 rows, one kept free
        assert_eq!(layout.lane_count(&ScreenGeometry::new(1920.0, 1080.0)), 42);
        // capped
        assert_eq!(layout.lane_count(&ScreenGeometry::new(1920.0, 4000.0)), 50);
        // never zero
        assert_eq!(layout.lane_count(&ScreenGeometry::new(100.0, 10.0)), 1);

        let half = LaneLayout {
            display_area: 0.5,
            ..LaneLayout::default()
        };
        assert_eq!(half.lane_count(&ScreenGeometry::new(1920.0, 1000.0)), 19);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let zero_speed = PlaybackSettings {
            speed_multiplier: 0.0,
            ..PlaybackSettings::default()
        };
        assert!(matches!(zero_speed.validate(), Err(Error::InvalidConfig(_))));

        let no_capacity = PlaybackSettings {
            max_active_count: 0,
            ..PlaybackSettings::default()
        };
        assert!(no_capacity.validate().is_err());

        let nan_font = PlaybackSettings {
            font_size_multiplier: f64::NAN,
            ..PlaybackSettings::default()
        };
        assert!(nan_font.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_layout() {
        let mut config = SchedulerConfig::default();
        config.layout.scroll_reuse_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = SchedulerConfig::default();
        config.screen.height = 0.0;
        assert!(config.validate().is_err());
    }
}
