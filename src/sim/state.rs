//! Game state and core simulation types
//!
//! One `GameState` exists per session. It is rebuilt from scratch on every
//! `init()`, so nothing here outlives a run.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::breakout::BreakoutState;
use super::collision::Rect;
use super::flappy::FlappyState;
use super::merge::MergeState;
use super::runner::RunnerState;
use super::snake::SnakeState;
use super::tictactoe::TicTacToeState;
use crate::error::StepError;
use crate::settings::Settings;

/// The games this crate can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameKind {
    Runner,
    Flappy,
    Breakout,
    Snake,
    Merge,
    TicTacToe,
}

impl GameKind {
    pub const ALL: [GameKind; 6] = [
        GameKind::Runner,
        GameKind::Flappy,
        GameKind::Breakout,
        GameKind::Snake,
        GameKind::Merge,
        GameKind::TicTacToe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Runner => "runner",
            GameKind::Flappy => "flappy",
            GameKind::Breakout => "breakout",
            GameKind::Snake => "snake",
            GameKind::Merge => "2048",
            GameKind::TicTacToe => "tictactoe",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "runner" | "endless-runner" => Some(GameKind::Runner),
            "flappy" => Some(GameKind::Flappy),
            "breakout" | "brick-breaker" => Some(GameKind::Breakout),
            "snake" => Some(GameKind::Snake),
            "2048" | "merge" => Some(GameKind::Merge),
            "tictactoe" | "tic-tac-toe" => Some(GameKind::TicTacToe),
            _ => None,
        }
    }

    /// Storage key for the persisted best score, if the game tracks one
    pub fn best_key(&self) -> Option<&'static str> {
        match self {
            GameKind::Runner => Some("runner-best"),
            GameKind::Flappy => Some("flappy-best"),
            GameKind::Breakout => Some("breakout-best"),
            GameKind::Snake => Some("snake-best"),
            GameKind::Merge => Some("2048-best"),
            GameKind::TicTacToe => None,
        }
    }

    /// How the session schedules ticks for this game
    pub fn loop_mode(&self, settings: &Settings) -> LoopMode {
        match self {
            GameKind::Runner | GameKind::Flappy | GameKind::Breakout => LoopMode::Frame,
            GameKind::Snake => LoopMode::Interval(settings.snake.step_ms),
            GameKind::Merge | GameKind::TicTacToe => LoopMode::OnInput,
        }
    }

    /// Whether Running <-> Paused is offered
    pub fn can_pause(&self) -> bool {
        matches!(self, GameKind::Snake | GameKind::Breakout)
    }
}

/// Tick scheduling discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Display-refresh callbacks; `dt` is the timestamp delta
    Frame,
    /// Fixed repeating timer in milliseconds; `dt` is ignored
    Interval(u32),
    /// One step per accepted input event
    OnInput,
}

/// Lifecycle phase
///
/// `Idle -> Running -> {Won | Lost | Drawn | Crashed} -> Idle` via restart,
/// with `Running <-> Paused` for pausable games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Idle,
    Running,
    Paused,
    Won,
    Lost,
    /// Tic-tac-toe only
    Drawn,
    Crashed,
}

impl GamePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GamePhase::Won | GamePhase::Lost | GamePhase::Drawn | GamePhase::Crashed
        )
    }

    /// Running or paused; the loop keeps being scheduled
    pub fn is_live(&self) -> bool {
        matches!(self, GamePhase::Running | GamePhase::Paused)
    }
}

/// Collision shape of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Extent {
    Rect { w: f32, h: f32 },
    Circle { r: f32 },
}

/// A moving or static thing in a continuous-space game
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u32,
    /// Top-left for rects, centre for circles
    pub pos: Vec2,
    pub vel: Vec2,
    pub extent: Extent,
    pub alive: bool,
}

impl Entity {
    pub fn rect(id: u32, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            id,
            pos: Vec2::new(x, y),
            vel: Vec2::ZERO,
            extent: Extent::Rect { w, h },
            alive: true,
        }
    }

    pub fn circle(id: u32, x: f32, y: f32, r: f32) -> Self {
        Self {
            id,
            pos: Vec2::new(x, y),
            vel: Vec2::ZERO,
            extent: Extent::Circle { r },
            alive: true,
        }
    }

    /// Bounding rectangle
    pub fn bounds(&self) -> Rect {
        match self.extent {
            Extent::Rect { w, h } => Rect::new(self.pos.x, self.pos.y, w, h),
            Extent::Circle { r } => Rect::new(self.pos.x - r, self.pos.y - r, 2.0 * r, 2.0 * r),
        }
    }

    pub fn width(&self) -> f32 {
        match self.extent {
            Extent::Rect { w, .. } => w,
            Extent::Circle { r } => 2.0 * r,
        }
    }

    pub fn height(&self) -> f32 {
        match self.extent {
            Extent::Rect { h, .. } => h,
            Extent::Circle { r } => 2.0 * r,
        }
    }

    pub fn radius(&self) -> f32 {
        match self.extent {
            Extent::Rect { w, h } => w.max(h) / 2.0,
            Extent::Circle { r } => r,
        }
    }

    /// Change the height of a rect entity (no-op for circles)
    pub fn set_height(&mut self, h: f32) {
        if let Extent::Rect { w, .. } = self.extent {
            self.extent = Extent::Rect { w, h };
        }
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite()
    }
}

/// Things that happened during the last tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Spawned { id: u32 },
    Scored { points: u64 },
    Jumped,
    SlideStarted,
    Flapped,
    PaddleHit,
    BrickBroken { id: u32 },
    LifeLost { remaining: u8 },
    FoodEaten,
    Merged { value: u32 },
    Placed { cell: usize },
    Collided,
}

/// Monotonic entity id source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityIds {
    next: u32,
}

impl Default for EntityIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EntityIds {
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Per-game world
#[derive(Debug, Clone, PartialEq)]
pub enum World {
    Runner(RunnerState),
    Flappy(FlappyState),
    Breakout(BreakoutState),
    Snake(SnakeState),
    Merge(MergeState),
    TicTacToe(TicTacToeState),
}

/// Complete state of one game run (deterministic for a given seed)
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub world: World,
    pub phase: GamePhase,
    /// Never decreases while running
    pub score: u64,
    /// `dt` handed to the most recent tick
    pub elapsed_since_last_tick_ms: f32,
    /// Total simulated play time
    pub play_time_ms: f64,
    pub time_ticks: u64,
    /// Events from the most recent tick
    pub events: Vec<GameEvent>,
    /// Only source of randomness (food, tiles, pipes, obstacles)
    pub rng: Pcg32,
    pub ids: EntityIds,
}

impl GameState {
    /// Build a fresh, idle state for `kind`
    pub fn new(kind: GameKind, settings: &Settings, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut ids = EntityIds::default();

        let world = match kind {
            GameKind::Runner => World::Runner(RunnerState::new(&settings.runner, &mut ids)),
            GameKind::Flappy => World::Flappy(FlappyState::new(&settings.flappy, &mut ids)),
            GameKind::Breakout => {
                World::Breakout(BreakoutState::new(&settings.breakout, &mut ids))
            }
            GameKind::Snake => World::Snake(SnakeState::new(&settings.snake, &mut rng)),
            GameKind::Merge => World::Merge(MergeState::new(&settings.merge, &mut rng)),
            GameKind::TicTacToe => World::TicTacToe(TicTacToeState::new()),
        };

        Self {
            world,
            phase: GamePhase::Idle,
            score: 0,
            elapsed_since_last_tick_ms: 0.0,
            play_time_ms: 0.0,
            time_ticks: 0,
            events: Vec::new(),
            rng,
            ids,
        }
    }

    pub fn kind(&self) -> GameKind {
        match self.world {
            World::Runner(_) => GameKind::Runner,
            World::Flappy(_) => GameKind::Flappy,
            World::Breakout(_) => GameKind::Breakout,
            World::Snake(_) => GameKind::Snake,
            World::Merge(_) => GameKind::Merge,
            World::TicTacToe(_) => GameKind::TicTacToe,
        }
    }

    /// Idle -> Running; ignored from any other phase
    pub fn start(&mut self) {
        if self.phase == GamePhase::Idle {
            self.phase = GamePhase::Running;
        }
    }

    /// Reject states whose continuous quantities went non-finite
    pub fn check_finite(&self) -> Result<(), StepError> {
        match &self.world {
            World::Runner(r) => {
                if !r.player.body.is_finite() {
                    return Err(StepError::NonFinite { what: "runner player" });
                }
                if r.obstacles.iter().any(|o| !o.body.is_finite()) {
                    return Err(StepError::NonFinite { what: "obstacle" });
                }
            }
            World::Flappy(f) => {
                if !f.bird.is_finite() {
                    return Err(StepError::NonFinite { what: "bird" });
                }
                if f.pipes.iter().any(|p| !p.x.is_finite()) {
                    return Err(StepError::NonFinite { what: "pipe" });
                }
            }
            World::Breakout(b) => {
                if !b.ball.is_finite() {
                    return Err(StepError::NonFinite { what: "ball" });
                }
                if !b.paddle_x.is_finite() {
                    return Err(StepError::NonFinite { what: "paddle" });
                }
            }
            World::Snake(s) => {
                if s.body.is_empty() {
                    return Err(StepError::EmptyBody);
                }
            }
            World::Merge(_) | World::TicTacToe(_) => {}
        }
        Ok(())
    }
}

/// Mutable view of the shared fields handed to a per-game step
pub struct StepContext<'a> {
    pub phase: &'a mut GamePhase,
    pub score: &'a mut u64,
    pub events: &'a mut Vec<GameEvent>,
    pub rng: &'a mut Pcg32,
    pub ids: &'a mut EntityIds,
}

impl StepContext<'_> {
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Add points; the only way score changes during a run
    pub fn add_score(&mut self, points: u64) {
        if points > 0 {
            *self.score += points;
            self.events.push(GameEvent::Scored { points });
        }
    }

    /// Move to a terminal phase (only from Running)
    pub fn finish(&mut self, phase: GamePhase) {
        debug_assert!(phase.is_terminal());
        if *self.phase == GamePhase::Running {
            *self.phase = phase;
        }
    }

    pub fn is_running(&self) -> bool {
        *self.phase == GamePhase::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_idle() {
        let settings = Settings::default();
        for kind in GameKind::ALL {
            let state = GameState::new(kind, &settings, 7);
            assert_eq!(state.phase, GamePhase::Idle);
            assert_eq!(state.kind(), kind);
            assert_eq!(state.score, 0);
        }
    }

    #[test]
    fn test_start_only_from_idle() {
        let mut state = GameState::new(GameKind::Flappy, &Settings::default(), 1);
        state.start();
        assert_eq!(state.phase, GamePhase::Running);

        state.phase = GamePhase::Lost;
        state.start();
        assert_eq!(state.phase, GamePhase::Lost);
    }

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in GameKind::ALL {
            assert_eq!(GameKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(GameKind::from_str("pong"), None);
    }

    #[test]
    fn test_entity_bounds() {
        let ball = Entity::circle(1, 50.0, 40.0, 10.0);
        let b = ball.bounds();
        assert_eq!(b.min, Vec2::new(40.0, 30.0));
        assert_eq!(b.size, Vec2::new(20.0, 20.0));

        let mut player = Entity::rect(2, 80.0, 280.0, 40.0, 60.0);
        player.set_height(38.0);
        assert_eq!(player.height(), 38.0);
    }

    #[test]
    fn test_check_finite_flags_nan() {
        let mut state = GameState::new(GameKind::Breakout, &Settings::default(), 3);
        if let World::Breakout(b) = &mut state.world {
            b.ball.vel.x = f32::NAN;
        }
        assert_eq!(
            state.check_finite(),
            Err(StepError::NonFinite { what: "ball" })
        );
    }
}
