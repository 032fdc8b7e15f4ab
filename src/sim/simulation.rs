//! Per-level simulation
//!
//! Owns one physics world together with the prize, the crocodile and every vine
//! of the level. Reacts to cuts, begun contacts and the prize position, and
//! schedules exactly one transition once the level is decided.

use glam::Vec2;

use super::cut::{CutDetector, CutEvent};
use super::level::LevelLayout;
use super::state::{CrocodileMouth, Fade, FeedbackCue, LevelOutcome, Prize, TransitionStyle};
use super::vine::VineChain;
use crate::consts::{CROCODILE_REL_POSITION, PRIZE_REL_POSITION};
use crate::error::Result;
use crate::physics::{BodyDesc, BodyHandle, Category, ChainId, PhysicsWorld, Shape};
use crate::scene_point;
use crate::settings::GameConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingTransition {
    due: f64,
    style: TransitionStyle,
}

pub struct LevelSimulation<W: PhysicsWorld> {
    world: W,
    config: GameConfig,
    scene_size: Vec2,
    vines: Vec<VineChain>,
    prize: Prize,
    crocodile: BodyHandle,
    mouth: CrocodileMouth,
    detector: CutDetector,
    fades: Vec<Fade>,
    outcome: LevelOutcome,
    /// Taken exactly once by `take_due_transition`
    transition: Option<PendingTransition>,
    feedback: Vec<FeedbackCue>,
    /// Latest simulation time seen
    now: f64,
}

impl<W: PhysicsWorld> LevelSimulation<W> {
    /// Build the level into `world`: crocodile, prize, then every vine pinned to the prize
    pub fn new(
        mut world: W,
        layout: &LevelLayout,
        scene_size: Vec2,
        config: &GameConfig,
        now: f64,
    ) -> Result<Self> {
        world.set_gravity(config.gravity);

        let crocodile = world.add_body(
            BodyDesc::fixed(Shape::rect(config.crocodile_size))
                .with_position(scene_point(CROCODILE_REL_POSITION.into(), scene_size))
                .with_category(Category::CROCODILE)
                .with_contact_test(Category::PRIZE),
        );

        let prize_body = world.add_body(
            BodyDesc::dynamic(Shape::Circle {
                radius: config.prize_radius,
            })
            .with_position(scene_point(PRIZE_REL_POSITION.into(), scene_size))
            .with_category(Category::PRIZE)
            .with_density(config.prize_density),
        );
        let mut prize = Prize::new(prize_body, config.prize_shrink_duration);

        let mut vines = Vec::with_capacity(layout.vines.len());
        for (i, desc) in layout.vines.iter().enumerate() {
            let mut vine = VineChain::new(
                desc.length as usize,
                desc.anchor_point(scene_size),
                ChainId(i as u32),
            )?
            .with_segment_size(config.vine_segment_size)
            .with_holder_radius(config.vine_holder_radius);
            vine.materialize(&mut world)?;
            vine.attach_end(&mut world, prize_body)?;
            vines.push(vine);
        }
        prize.is_attached = vines.iter().any(|v| v.supports(prize_body));

        log::info!(
            "Level built: {} vines, {} bodies, {} joints",
            vines.len(),
            world.body_count(),
            world.joint_count()
        );

        Ok(Self {
            world,
            config: config.clone(),
            scene_size,
            vines,
            prize,
            crocodile,
            mouth: CrocodileMouth::new(config.seed, now),
            detector: CutDetector::new(config.can_cut_multiple_vines_at_once),
            fades: Vec::new(),
            outcome: LevelOutcome::Ongoing,
            transition: None,
            feedback: Vec::new(),
            now,
        })
    }

    // === Touch input ===

    pub fn on_gesture_start(&mut self) {
        self.detector.on_gesture_start();
    }

    /// One movement frame of the current gesture
    pub fn on_touch_moved(&mut self, start: Vec2, end: Vec2) {
        let events = self
            .detector
            .on_segment_traversed(&self.world, start, end, self.now);
        for event in events {
            self.on_cut_event(event);
        }
    }

    pub fn on_gesture_end(&mut self) {
        self.detector.on_gesture_end();
    }

    /// Apply a cut: drop the hit segment and fade out the rest of its vine.
    /// Returns false if the segment was already gone.
    pub fn on_cut_event(&mut self, event: CutEvent) -> bool {
        if !self.world.remove_body(event.segment) {
            log::debug!("Ignoring cut of removed segment {:?}", event.segment);
            return false;
        }
        self.fades.retain(|f| f.body != event.segment);

        if let Some(vine) = self.vines.iter_mut().find(|v| v.id() == event.chain) {
            vine.remove_segment(event.segment);
        }

        let now = self.now.max(event.time);
        for body in self.world.bodies_tagged(event.chain) {
            if self.fades.iter().any(|f| f.body == body) {
                continue;
            }
            self.fades.push(Fade {
                body,
                chain: event.chain,
                start: now,
                duration: self.config.segment_fade_duration,
            });
        }

        self.prize.is_attached =
            !self.prize.is_removed() && self.vines.iter().any(|v| v.supports(self.prize.body));

        if !self.outcome.is_terminal() {
            self.mouth.open_wide(now);
        }
        self.feedback.push(FeedbackCue::Slice);
        log::debug!(
            "Vine {} cut, {} segments fading, prize attached: {}",
            event.chain,
            self.fades.iter().filter(|f| f.chain == event.chain).count(),
            self.prize.is_attached
        );
        true
    }

    // === Physics notifications ===

    /// A contact began between `a` and `b` (either order).
    /// Call [`update`](Self::update) for the step first so the catch is timed at it.
    pub fn on_contact(&mut self, a: BodyHandle, b: BodyHandle) {
        if self.outcome.is_terminal() {
            return;
        }
        let pair = (a, b);
        let croc_and_prize = pair == (self.crocodile, self.prize.body)
            || pair == (self.prize.body, self.crocodile);
        if !croc_and_prize {
            return;
        }

        self.outcome = LevelOutcome::PrizeCaught;
        self.prize.start_shrink(self.now);
        self.mouth.nom_nom(self.now, self.config.nom_nom_delay);
        self.feedback.push(FeedbackCue::NomNom);
        self.schedule_transition(TransitionStyle::Doorway {
            duration: self.config.transition_duration,
        });
        log::info!("Prize caught at t={:.2}", self.now);
    }

    /// Advance timers and check the prize against the water line
    pub fn update(&mut self, now: f64) {
        self.now = now;
        self.mouth.update(now);
        self.finish_fades(now);

        if self.prize.shrink_finished(now) && !self.prize.is_removed() {
            self.world.remove_body(self.prize.body);
            self.prize.mark_removed();
        }

        if self.outcome.is_terminal() {
            return;
        }
        let Some(position) = self.world.body_position(self.prize.body) else {
            return;
        };
        if position.y <= self.config.water_line {
            self.outcome = LevelOutcome::PrizeLost;
            self.feedback.push(FeedbackCue::Splash);
            self.world.remove_body(self.prize.body);
            self.prize.mark_removed();
            self.schedule_transition(TransitionStyle::Fade {
                duration: self.config.transition_duration,
            });
            log::info!("Prize lost at t={:.2} (y = {:.1})", now, position.y);
        }
    }

    fn finish_fades(&mut self, now: f64) {
        let (done, running): (Vec<_>, Vec<_>) =
            self.fades.drain(..).partition(|f| f.finished(now));
        self.fades = running;
        for fade in done {
            self.world.remove_body(fade.body);
            if let Some(vine) = self.vines.iter_mut().find(|v| v.id() == fade.chain) {
                vine.remove_segment(fade.body);
            }
        }
    }

    fn schedule_transition(&mut self, style: TransitionStyle) {
        if self.transition.is_some() {
            return;
        }
        self.transition = Some(PendingTransition {
            due: self.now + self.config.transition_delay,
            style,
        });
    }

    /// The scheduled transition, once, when its delay has passed
    pub fn take_due_transition(&mut self, now: f64) -> Option<TransitionStyle> {
        match self.transition {
            Some(pending) if now >= pending.due => {
                self.transition = None;
                log::info!("Level transition due: {:?}", pending.style);
                Some(pending.style)
            }
            _ => None,
        }
    }

    pub fn has_pending_transition(&self) -> bool {
        self.transition.is_some()
    }

    /// When the pending transition fires
    pub fn transition_due(&self) -> Option<f64> {
        self.transition.map(|pending| pending.due)
    }

    /// Feedback produced since the last call
    pub fn drain_feedback(&mut self) -> Vec<FeedbackCue> {
        std::mem::take(&mut self.feedback)
    }

    // === Read access ===

    pub fn outcome(&self) -> LevelOutcome {
        self.outcome
    }

    pub fn vines(&self) -> &[VineChain] {
        &self.vines
    }

    pub fn prize(&self) -> &Prize {
        &self.prize
    }

    pub fn crocodile(&self) -> BodyHandle {
        self.crocodile
    }

    pub fn crocodile_mouth(&self) -> &CrocodileMouth {
        &self.mouth
    }

    /// Render alpha of a body: fading segments go 1 → 0, removed bodies have none
    pub fn segment_alpha(&self, body: BodyHandle) -> Option<f32> {
        if !self.world.contains_body(body) {
            return None;
        }
        let alpha = self
            .fades
            .iter()
            .find(|f| f.body == body)
            .map_or(1.0, |f| f.alpha(self.now));
        Some(alpha)
    }

    pub fn prize_scale(&self) -> f32 {
        self.prize.scale(self.now)
    }

    pub fn scene_size(&self) -> Vec2 {
        self.scene_size
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn detector(&self) -> &CutDetector {
        &self.detector
    }
}
