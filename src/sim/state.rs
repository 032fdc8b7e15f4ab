//! Level state types
//!
//! Outcome, transition and feedback enums plus the small timed animations
//! (segment fades, prize shrink, crocodile mouth) a renderer reads each frame.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::{MOUTH_CLOSED_SECS, MOUTH_OPEN_SECS};
use crate::physics::{BodyHandle, ChainId};

/// How the current level ended (if it has)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelOutcome {
    #[default]
    Ongoing,
    /// Crocodile ate the prize
    PrizeCaught,
    /// Prize sank below the water line
    PrizeLost,
}

impl LevelOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LevelOutcome::Ongoing)
    }
}

/// Visual style of the switch to the next level
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionStyle {
    /// Used after the prize is lost
    Fade { duration: f64 },
    /// Used after the prize is caught
    Doorway { duration: f64 },
}

/// Feedback the host should play (sound, haptics)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackCue {
    Slice,
    Splash,
    NomNom,
}

/// The prize body and its removal animation
#[derive(Debug, Clone)]
pub struct Prize {
    pub body: BodyHandle,
    /// True while at least one intact vine holds it
    pub is_attached: bool,
    /// Start time of the eaten shrink
    shrink_start: Option<f64>,
    shrink_duration: f64,
    removed: bool,
}

impl Prize {
    pub fn new(body: BodyHandle, shrink_duration: f64) -> Self {
        Self {
            body,
            is_attached: false,
            shrink_start: None,
            shrink_duration,
            removed: false,
        }
    }

    pub fn start_shrink(&mut self, now: f64) {
        if self.shrink_start.is_none() {
            self.shrink_start = Some(now);
        }
    }

    /// Render scale: 1 until eaten, then down to 0
    pub fn scale(&self, now: f64) -> f32 {
        match self.shrink_start {
            Some(start) => (1.0 - progress(now, start, self.shrink_duration)) as f32,
            None if self.removed => 0.0,
            None => 1.0,
        }
    }

    pub fn shrink_finished(&self, now: f64) -> bool {
        self.shrink_start
            .is_some_and(|start| progress(now, start, self.shrink_duration) >= 1.0)
    }

    pub fn mark_removed(&mut self) {
        self.removed = true;
        self.is_attached = false;
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

/// An orphaned vine segment fading out before removal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub body: BodyHandle,
    pub chain: ChainId,
    pub start: f64,
    pub duration: f64,
}

impl Fade {
    pub fn alpha(&self, now: f64) -> f32 {
        (1.0 - progress(now, self.start, self.duration)) as f32
    }

    pub fn finished(&self, now: f64) -> bool {
        progress(now, self.start, self.duration) >= 1.0
    }
}

fn progress(now: f64, start: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 1.0;
    }
    ((now - start) / duration).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouthState {
    Open,
    Closed,
}

#[derive(Debug, Clone)]
enum MouthAnimation {
    /// Open/closed forever with durations drawn when the cycle starts
    Idle {
        open_for: f64,
        closed_for: f64,
        next_at: f64,
    },
    /// Fixed sequence of (time, state) keyframes, then still
    Script(VecDeque<(f64, MouthState)>),
}

/// The crocodile's mouth animation
#[derive(Debug, Clone)]
pub struct CrocodileMouth {
    state: MouthState,
    animation: MouthAnimation,
    rng: Pcg32,
}

impl CrocodileMouth {
    /// Mouth starts closed and begins its idle cycle
    pub fn new(seed: u64, now: f64) -> Self {
        let mut mouth = Self {
            state: MouthState::Closed,
            animation: MouthAnimation::Script(VecDeque::new()),
            rng: Pcg32::seed_from_u64(seed),
        };
        mouth.start_idle(now);
        mouth
    }

    pub fn state(&self) -> MouthState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.animation, MouthAnimation::Idle { .. })
    }

    fn start_idle(&mut self, now: f64) {
        let open_for = self.rng.random_range(MOUTH_OPEN_SECS.0..MOUTH_OPEN_SECS.1);
        let closed_for = self.rng.random_range(MOUTH_CLOSED_SECS.0..MOUTH_CLOSED_SECS.1);
        let wait = match self.state {
            MouthState::Open => open_for,
            MouthState::Closed => closed_for,
        };
        self.animation = MouthAnimation::Idle {
            open_for,
            closed_for,
            next_at: now + wait,
        };
    }

    /// A vine was cut: snap open and restart the idle cycle
    pub fn open_wide(&mut self, now: f64) {
        self.state = MouthState::Open;
        self.start_idle(now);
    }

    /// Close on the prize, chew once after `delay`, then stay shut
    pub fn nom_nom(&mut self, now: f64, delay: f64) {
        self.state = MouthState::Closed;
        self.animation = MouthAnimation::Script(VecDeque::from([
            (now + delay, MouthState::Open),
            (now + delay * 2.0, MouthState::Closed),
        ]));
    }

    pub fn update(&mut self, now: f64) {
        match &mut self.animation {
            MouthAnimation::Idle {
                open_for,
                closed_for,
                next_at,
            } => {
                while now >= *next_at {
                    let (state, wait) = match self.state {
                        MouthState::Closed => (MouthState::Open, *open_for),
                        MouthState::Open => (MouthState::Closed, *closed_for),
                    };
                    self.state = state;
                    *next_at += wait;
                }
            }
            MouthAnimation::Script(frames) => {
                while let Some(&(at, state)) = frames.front() {
                    if now < at {
                        break;
                    }
                    self.state = state;
                    frames.pop_front();
                }
            }
        }
    }
}
