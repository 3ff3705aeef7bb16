//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only (food, tiles, pipe gaps, obstacle kinds)
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies

pub mod breakout;
pub mod collision;
pub mod flappy;
pub mod merge;
pub mod ramp;
pub mod runner;
pub mod snake;
pub mod state;
pub mod tick;
pub mod tictactoe;

pub use collision::{Rect, circle_rect_overlap, paddle_deflection, rects_overlap, wrap_advance};
pub use ramp::{Ramp, SpawnTimer};
pub use state::{
    Entity, EntityIds, Extent, GameEvent, GameKind, GamePhase, GameState, LoopMode, StepContext,
    World,
};
pub use tick::{HeldDirections, InputCommand, TickInput, tick};
