//! Game configuration
//!
//! Tuning values for the vine simulation and level flow. Every field has a
//! default, so a config file only needs to name what it changes.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === Cutting ===
    /// Allow one swipe to cut more than one vine
    pub can_cut_multiple_vines_at_once: bool,

    // === World ===
    /// Gravity in meters/s²
    pub gravity: Vec2,
    /// Prize is lost once its center drops to or below this height
    pub water_line: f32,

    // === Timing (seconds) ===
    /// Delay between a level ending and the next level being built
    pub transition_delay: f64,
    /// Duration of the level transition effect itself
    pub transition_duration: f64,
    /// Fade-out of orphaned vine segments after a cut
    pub segment_fade_duration: f64,
    /// Shrink of the prize when eaten
    pub prize_shrink_duration: f64,
    /// Pause before the crocodile chews
    pub nom_nom_delay: f64,

    // === Geometry (points) ===
    pub prize_radius: f32,
    pub prize_density: f32,
    pub vine_segment_size: Vec2,
    pub vine_holder_radius: f32,
    pub crocodile_size: Vec2,

    /// Seed for the crocodile's idle animation timing
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            can_cut_multiple_vines_at_once: false,

            gravity: Vec2::new(0.0, -9.8),
            water_line: 0.0,

            transition_delay: 1.0,
            transition_duration: 1.0,
            segment_fade_duration: 0.25,
            prize_shrink_duration: 0.08,
            nom_nom_delay: 0.15,

            prize_radius: 30.0,
            prize_density: 0.5,
            vine_segment_size: Vec2::new(4.0, 12.0),
            vine_holder_radius: 8.0,
            crocodile_size: Vec2::new(120.0, 90.0),

            seed: 0x5eed,
        }
    }
}

impl GameConfig {
    /// Parse a JSON config; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it is missing or unreadable
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(err) => {
                    log::warn!("Ignoring config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                log::info!("Using default config ({}: {err})", path.display());
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("prize_radius", self.prize_radius),
            ("prize_density", self.prize_density),
            ("vine_segment_size.x", self.vine_segment_size.x),
            ("vine_segment_size.y", self.vine_segment_size.y),
            ("vine_holder_radius", self.vine_holder_radius),
            ("crocodile_size.x", self.crocodile_size.x),
            ("crocodile_size.y", self.crocodile_size.y),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(GameError::Configuration(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let durations = [
            ("transition_delay", self.transition_delay),
            ("transition_duration", self.transition_duration),
            ("segment_fade_duration", self.segment_fade_duration),
            ("prize_shrink_duration", self.prize_shrink_duration),
            ("nom_nom_delay", self.nom_nom_delay),
        ];
        for (name, value) in durations {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(GameError::Configuration(format!(
                    "{name} must be a non-negative duration, got {value}"
                )));
            }
        }
        Ok(())
    }
}
