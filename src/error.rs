//! Error types for level setup and physics graph mutation

use thiserror::Error;

use crate::physics::BodyHandle;

/// Errors surfaced by the vine and level setup code
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    /// Invalid vine length, malformed layout or config data
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An operation was invoked out of its required sequence
    #[error("ordering error: {0}")]
    Ordering(&'static str),

    /// The referenced body is not (or no longer) part of the world
    #[error("unknown body {0:?}")]
    UnknownBody(BodyHandle),
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
