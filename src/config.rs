//! Carve engine parameters shared by the session and the Godot node.
//! The node copies its exported properties into this struct on `ready`.

use crate::error::{CarveError, CarveResult};

/// Inclusive `(min, max)` bounds for one brush axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisLimits {
    pub min: i32,
    pub max: i32,
}

impl AxisLimits {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

/// Width and height limits applied to resampled brushes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrushLimits {
    pub width: AxisLimits,
    pub height: AxisLimits,
}

impl BrushLimits {
    pub fn clamp(&self, width: i32, height: i32) -> (i32, i32) {
        (self.width.clamp(width), self.height.clamp(height))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModifierConfig {
    /// Terrain extents: x = width in samples, y = world height of a
    /// normalized 1.0, z = depth in samples.
    pub terrain_scale: (i32, i32, i32),
    /// Initial terrain height in world units.
    pub base_height: f32,
    pub min_region_scale: i32,
    pub default_region_scale: i32,
    pub brush_limits: BrushLimits,
    pub default_brush_width: i32,
    pub default_brush_height: i32,
    /// World height a full-alpha brush or a region carve raises to.
    pub height_scale: f32,
    pub brush_source_count: usize,
    /// Source brush stamped per tile when a region mixes in a brush.
    pub tile_brush_index: usize,
    pub tile_size: i32,
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            terrain_scale: (128, 32, 128),
            base_height: 0.0,
            min_region_scale: 2,
            default_region_scale: 10,
            brush_limits: BrushLimits {
                width: AxisLimits::new(2, 64),
                height: AxisLimits::new(2, 64),
            },
            default_brush_width: 10,
            default_brush_height: 10,
            height_scale: 2.0,
            brush_source_count: 2,
            tile_brush_index: 1,
            tile_size: 2,
        }
    }
}

impl ModifierConfig {
    pub fn width(&self) -> i32 {
        self.terrain_scale.0
    }

    pub fn depth(&self) -> i32 {
        self.terrain_scale.2
    }

    pub fn height_scale_y(&self) -> f32 {
        self.terrain_scale.1 as f32
    }

    /// Reject configurations no terrain can be built from. Out-of-range
    /// user values (defaults outside the limits) are left to the setters,
    /// which clamp them.
    pub fn validate(&self) -> CarveResult<()> {
        let (x, y, z) = self.terrain_scale;
        if x <= 0 || z <= 0 {
            return Err(CarveError::InvalidDimensions { width: x, depth: z });
        }
        if y <= 0 {
            return Err(CarveError::config(format!(
                "terrain height scale must be positive, got {y}"
            )));
        }
        if self.min_region_scale < 1 {
            return Err(CarveError::config("min region scale must be at least 1"));
        }
        for (name, limits) in [
            ("width", self.brush_limits.width),
            ("height", self.brush_limits.height),
        ] {
            if limits.min < 1 || limits.min > limits.max {
                return Err(CarveError::config(format!(
                    "brush {name} limits ({}, {}) are empty",
                    limits.min, limits.max
                )));
            }
        }
        if self.tile_size < 1 {
            return Err(CarveError::config("tile size must be positive"));
        }
        if self.brush_source_count == 0 {
            return Err(CarveError::config("at least one brush source is required"));
        }
        if !self.height_scale.is_finite() {
            return Err(CarveError::config("height scale must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ModifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.width(), 128);
        assert_eq!(config.depth(), 128);
        assert_eq!(config.height_scale_y(), 32.0);
    }

    #[test]
    fn test_brush_limits_clamp_independently() {
        let limits = BrushLimits {
            width: AxisLimits::new(4, 8),
            height: AxisLimits::new(2, 32),
        };
        assert_eq!(limits.clamp(1, 100), (4, 32));
        assert_eq!(limits.clamp(6, 6), (6, 6));
    }

    #[test]
    fn test_validate_rejects_bad_extents() {
        let config = ModifierConfig {
            terrain_scale: (0, 10, 10),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(CarveError::InvalidDimensions { width: 0, depth: 10 })
        );
    }

    #[test]
    fn test_validate_rejects_empty_limits() {
        let mut config = ModifierConfig::default();
        config.brush_limits.height = AxisLimits::new(10, 4);
        assert!(matches!(
            config.validate(),
            Err(CarveError::InvalidConfig(_))
        ));
    }
}
