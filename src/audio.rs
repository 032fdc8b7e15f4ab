//! Feedback sound service
//!
//! One `AudioManager` lives for the whole process and is handed to the game
//! driver; levels come and go without touching it. Playback goes through an
//! [`AudioBackend`] supplied by the host. Any backend failure is logged and the
//! affected sound is disabled - audio never aborts the simulation.

use std::collections::HashSet;

use thiserror::Error;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// A vine was cut
    Slice,
    /// Prize fell into the water
    Splash,
    /// Crocodile ate the prize
    NomNom,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 3] = [
        SoundEffect::Slice,
        SoundEffect::Splash,
        SoundEffect::NomNom,
    ];

    /// Resource name the backend is asked to load
    pub fn resource(&self) -> &'static str {
        match self {
            SoundEffect::Slice => "slice.caf",
            SoundEffect::Splash => "splash.caf",
            SoundEffect::NomNom => "nom_nom.caf",
        }
    }
}

/// Looping background track
pub const BACKGROUND_MUSIC: &str = "background_music.aif";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("sound resource {0} not found")]
    Missing(String),
    #[error("sound resource {name} unreadable: {reason}")]
    Unreadable { name: String, reason: String },
    #[error("audio output unavailable")]
    Unavailable,
}

/// Platform audio, provided by the host
pub trait AudioBackend {
    /// Prepare a one-shot sound for playback
    fn load(&mut self, resource: &str) -> Result<(), AudioError>;

    fn play(&mut self, resource: &str, volume: f32) -> Result<(), AudioError>;

    /// Start a track looping forever
    fn play_music(&mut self, resource: &str, volume: f32) -> Result<(), AudioError>;
}

/// Backend that plays nothing
#[derive(Debug, Default)]
pub struct SilentBackend;

impl AudioBackend for SilentBackend {
    fn load(&mut self, _resource: &str) -> Result<(), AudioError> {
        Ok(())
    }

    fn play(&mut self, _resource: &str, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }

    fn play_music(&mut self, _resource: &str, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Audio manager for the game
pub struct AudioManager {
    backend: Option<Box<dyn AudioBackend>>,
    /// Effects that loaded successfully
    ready: HashSet<SoundEffect>,
    music_playing: bool,
    /// Music failed once; not retried for later levels
    music_disabled: bool,
    master_volume: f32,
    sfx_volume: f32,
    music_volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::silent()
    }
}

impl AudioManager {
    /// Wrap a backend and load every effect; failures only disable that effect
    pub fn new(mut backend: Box<dyn AudioBackend>) -> Self {
        let mut ready = HashSet::new();
        for effect in SoundEffect::ALL {
            match backend.load(effect.resource()) {
                Ok(()) => {
                    ready.insert(effect);
                }
                Err(err) => log::warn!("Sound {effect:?} disabled: {err}"),
            }
        }
        Self {
            backend: Some(backend),
            ready,
            music_playing: false,
            music_disabled: false,
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,
            muted: false,
        }
    }

    /// Manager with no output at all
    pub fn silent() -> Self {
        Self {
            backend: None,
            ready: HashSet::new(),
            music_playing: false,
            music_disabled: false,
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,
            muted: false,
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_enabled(&self, effect: SoundEffect) -> bool {
        self.backend.is_some() && self.ready.contains(&effect)
    }

    pub fn music_playing(&self) -> bool {
        self.music_playing
    }

    fn effective_volume(&self, channel: f32) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * channel
        }
    }

    /// Play a sound effect
    pub fn play(&mut self, effect: SoundEffect) {
        let vol = self.effective_volume(self.sfx_volume);
        if vol <= 0.0 || !self.ready.contains(&effect) {
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        if let Err(err) = backend.play(effect.resource(), vol) {
            log::warn!("Sound {effect:?} failed, disabling: {err}");
            self.ready.remove(&effect);
        }
    }

    /// Start the looping background music unless it is already running
    pub fn ensure_music(&mut self) {
        if self.music_playing || self.music_disabled {
            return;
        }
        let vol = self.effective_volume(self.music_volume);
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        match backend.play_music(BACKGROUND_MUSIC, vol) {
            Ok(()) => self.music_playing = true,
            Err(err) => {
                log::warn!("Background music disabled: {err}");
                self.music_disabled = true;
            }
        }
    }
}
