//! Host-side game driver
//!
//! Owns the current level and the process-lifetime audio service. The host calls
//! [`Game::frame`] once per display frame and forwards touches; the driver steps
//! the world at a fixed rate, routes begun contacts into the level, plays the
//! level's feedback and swaps in a freshly built level when a transition is due.

use glam::Vec2;

use crate::audio::{AudioManager, SoundEffect};
use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::error::Result;
use crate::physics::PhysicsWorld;
use crate::settings::GameConfig;
use crate::sim::{FeedbackCue, LevelLayout, LevelSimulation, TransitionStyle};

/// Sound played for a level feedback cue
pub fn sound_for(cue: FeedbackCue) -> SoundEffect {
    match cue {
        FeedbackCue::Slice => SoundEffect::Slice,
        FeedbackCue::Splash => SoundEffect::Splash,
        FeedbackCue::NomNom => SoundEffect::NomNom,
    }
}

pub struct Game<W: PhysicsWorld, F: FnMut() -> W> {
    config: GameConfig,
    layout: LevelLayout,
    scene_size: Vec2,
    /// Builds an empty world for every new level
    world_factory: F,
    audio: AudioManager,
    level: LevelSimulation<W>,
    /// 1-based count of levels built so far
    level_number: u32,
    accumulator: f32,
    /// Simulation time in seconds
    time: f64,
    last_transition: Option<TransitionStyle>,
}

impl<W: PhysicsWorld, F: FnMut() -> W> Game<W, F> {
    pub fn new(
        config: GameConfig,
        layout: LevelLayout,
        scene_size: Vec2,
        mut world_factory: F,
        mut audio: AudioManager,
    ) -> Result<Self> {
        let level = LevelSimulation::new(world_factory(), &layout, scene_size, &config, 0.0)?;
        audio.ensure_music();
        log::info!("Game started: scene {scene_size:?}, {} vines", layout.vines.len());

        Ok(Self {
            config,
            layout,
            scene_size,
            world_factory,
            audio,
            level,
            level_number: 1,
            accumulator: 0.0,
            time: 0.0,
            last_transition: None,
        })
    }

    /// Run the fixed-rate simulation for one display frame
    pub fn frame(&mut self, dt: f32) -> Result<()> {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.step()?;
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        self.time += SIM_DT as f64;

        self.level.world_mut().step(SIM_DT);
        self.level.update(self.time);
        let contacts = self.level.world_mut().drain_contacts();
        for (a, b) in contacts {
            self.level.on_contact(a, b);
        }

        for cue in self.level.drain_feedback() {
            self.audio.play(sound_for(cue));
        }

        if let Some(style) = self.level.take_due_transition(self.time) {
            self.next_level(style)?;
        }
        Ok(())
    }

    /// Tear the finished level down and build the next one on a new world
    fn next_level(&mut self, style: TransitionStyle) -> Result<()> {
        let world = (self.world_factory)();
        self.level =
            LevelSimulation::new(world, &self.layout, self.scene_size, &self.config, self.time)?;
        self.level_number += 1;
        self.last_transition = Some(style);
        log::info!("Level {} ({style:?})", self.level_number);
        Ok(())
    }

    // === Touch input ===

    pub fn touch_began(&mut self) {
        self.level.on_gesture_start();
    }

    /// The finger moved from `previous` to `current` since the last call
    pub fn touch_moved(&mut self, current: Vec2, previous: Vec2) {
        self.level.on_touch_moved(current, previous);
    }

    pub fn touch_ended(&mut self) {
        self.level.on_gesture_end();
    }

    // === Accessors ===

    pub fn level(&self) -> &LevelSimulation<W> {
        &self.level
    }

    pub fn level_number(&self) -> u32 {
        self.level_number
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Style of the most recent level switch, for the host's transition effect
    pub fn last_transition(&self) -> Option<TransitionStyle> {
        self.last_transition
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn audio(&self) -> &AudioManager {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioManager {
        &mut self.audio
    }
}
