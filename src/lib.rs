//! Party Arcade - loop, input and physics core for six small canvas games
//!
//! Core modules:
//! - `sim`: Deterministic per-game simulation (runner, flappy, breakout,
//!   snake, 2048, tic-tac-toe) and the shared collision helpers
//! - `input`: Keyboard/pointer/touch normalization and modal gating
//! - `session`: Loop driver, lifecycle and end-of-game flow
//! - `platform`: Browser/headless host abstraction
//! - `overlay`: End-of-game and crash overlays
//! - `highscores`: Best scores and the tic-tac-toe tally
//! - `settings`: Data-driven tuning

pub mod error;
pub mod highscores;
pub mod input;
pub mod overlay;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;

pub use error::{GameError, HostError, StepError};
pub use highscores::{BestScore, KeyValueStore, MemoryStore, TicTacToeTally};
pub use input::{ActiveModal, InputNormalizer, ModalGuard, RawEvent};
pub use overlay::{Overlay, OverlayKind};
pub use platform::{HeadlessHost, Host};
pub use session::Session;
pub use settings::{MotionStep, Settings};
pub use sim::{GameKind, GamePhase, GameState, LoopMode};
