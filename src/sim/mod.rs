//! Vine simulation module
//!
//! Everything that decides what happens in a level lives here:
//! - Vine chains built from pinned segments
//! - Swipe cut detection
//! - The per-level simulation (cuts, contacts, water line, transitions)
//!
//! Time only advances through the `now` values passed in; the crocodile's idle
//! animation uses a seeded RNG, so a level replays identically.

pub mod cut;
pub mod level;
pub mod simulation;
pub mod state;
pub mod vine;

pub use cut::{CutDetector, CutEvent};
pub use level::{LevelLayout, VineDescriptor};
pub use simulation::LevelSimulation;
pub use state::{
    CrocodileMouth, Fade, FeedbackCue, LevelOutcome, MouthState, Prize, TransitionStyle,
};
pub use vine::{JointLink, VineChain};
