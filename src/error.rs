//! Error taxonomy
//!
//! Input errors never surface here: malformed events are dropped by the
//! normalizer. Everything below ends a run as `Crashed`, never the page.

use thiserror::Error;

/// Failure inside a physics step
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("{what} left the finite number range")]
    NonFinite { what: &'static str },
    #[error("snake has no body segments")]
    EmptyBody,
}

/// Failure reported by the hosting platform
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("canvas has no 2d drawing context")]
    MissingContext,
    #[error("element `{0}` not found")]
    MissingElement(String),
    #[error("render failed: {0}")]
    Render(String),
}

/// Anything that can crash a running game
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Host(#[from] HostError),
}
