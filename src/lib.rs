//! Vine Cut - rope physics and swipe cutting for a cut-the-vine puzzle
//!
//! Core modules:
//! - `physics`: World adapter trait plus a Rapier backend
//! - `sim`: Vine chains, cut detection and the per-level simulation
//! - `game`: Host-side driver (fixed timestep, input forwarding, level rebuilds)
//! - `audio`: Feedback sound service
//! - `settings`: Data-driven tuning

pub mod audio;
pub mod error;
pub mod game;
pub mod physics;
pub mod settings;
pub mod sim;

pub use error::GameError;
pub use game::Game;
pub use settings::GameConfig;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the driver will account for
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// World scale: gravity is configured in m/s², positions are in points
    pub const POINTS_PER_METER: f32 = 150.0;
    /// Rapier solver iterations per step
    pub const SOLVER_ITERATIONS: usize = 8;
    /// Longest vine a layout may ask for, in segments
    pub const MAX_VINE_LENGTH: u32 = 200;

    /// Prize spawn point as a fraction of the scene size
    pub const PRIZE_REL_POSITION: (f32, f32) = (0.5, 0.7);
    /// Crocodile position as a fraction of the scene size
    pub const CROCODILE_REL_POSITION: (f32, f32) = (0.75, 0.312);
    /// Vine end sits this fraction of the prize height above the prize center
    pub const ATTACH_HEIGHT_FRACTION: f32 = 0.1;

    /// Crocodile idle animation ranges (seconds)
    pub const MOUTH_OPEN_SECS: (f64, f64) = (2.0, 4.0);
    pub const MOUTH_CLOSED_SECS: (f64, f64) = (3.0, 5.0);
}

/// Convert a fractional scene position to points
#[inline]
pub fn scene_point(relative: Vec2, scene_size: Vec2) -> Vec2 {
    relative * scene_size
}
