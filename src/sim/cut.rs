//! Swipe cut detection
//!
//! Each movement frame of a touch gives a short line segment. The detector asks
//! the world which bodies that segment crosses and reports the first tagged vine
//! segment as a cut. Only one cut is reported per gesture unless multi-cut is
//! enabled; even then a chain is reported at most once per gesture.
//!
//! The detector never mutates the world.

use std::collections::HashSet;

use glam::Vec2;

use crate::physics::{BodyHandle, ChainId, PhysicsWorld};

/// A swipe crossed a vine segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutEvent {
    /// The segment body that was hit
    pub segment: BodyHandle,
    /// The chain it belongs to
    pub chain: ChainId,
    /// Simulation time of the movement frame
    pub time: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CutDetector {
    multi_cut: bool,
    /// Chains already cut during the current gesture
    cut_this_gesture: HashSet<ChainId>,
}

impl CutDetector {
    pub fn new(multi_cut: bool) -> Self {
        Self {
            multi_cut,
            cut_this_gesture: HashSet::new(),
        }
    }

    pub fn multi_cut(&self) -> bool {
        self.multi_cut
    }

    /// Has the current gesture produced a cut yet?
    pub fn has_cut(&self) -> bool {
        !self.cut_this_gesture.is_empty()
    }

    pub fn on_gesture_start(&mut self) {
        self.cut_this_gesture.clear();
    }

    pub fn on_gesture_end(&mut self) {
        self.cut_this_gesture.clear();
    }

    /// Check one movement segment of the current gesture
    pub fn on_segment_traversed<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &W,
        start: Vec2,
        end: Vec2,
        time: f64,
    ) -> Vec<CutEvent> {
        let mut events = Vec::new();
        for body in world.ray_query(start, end) {
            if self.has_cut() && !self.multi_cut {
                break;
            }
            let Some(chain) = world.body_tag(body) else {
                continue;
            };
            if !self.cut_this_gesture.insert(chain) {
                continue;
            }
            log::debug!("Swipe cut vine {chain} at segment {body:?}");
            events.push(CutEvent {
                segment: body,
                chain,
                time,
            });
        }
        events
    }
}
