//! Simulation tick
//!
//! One call advances one game by one step: pause handling, the per-game
//! physics, then a sanity check on the result.

use glam::Vec2;

use super::state::{GamePhase, GameState, StepContext, World};
use super::{breakout, flappy, merge, runner, snake, tictactoe};
use crate::error::StepError;
use crate::settings::Settings;

/// Discrete command produced by the input normalizer, consumed once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputCommand {
    Up,
    Down,
    Left,
    Right,
    Action,
    None,
}

impl InputCommand {
    pub fn is_directional(&self) -> bool {
        matches!(
            self,
            InputCommand::Up | InputCommand::Down | InputCommand::Left | InputCommand::Right
        )
    }
}

/// Directions currently held down (for per-tick incremental movement)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldDirections {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldDirections {
    pub fn set(&mut self, command: InputCommand, held: bool) {
        match command {
            InputCommand::Up => self.up = held,
            InputCommand::Down => self.down = held,
            InputCommand::Left => self.left = held,
            InputCommand::Right => self.right = held,
            InputCommand::Action | InputCommand::None => {}
        }
    }
}

/// Everything the physics step may read about input for one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// One-shot commands in arrival order
    pub commands: Vec<InputCommand>,
    pub held: HeldDirections,
    /// Latest tracked pointer x (paddle games)
    pub pointer_x: Option<f32>,
    /// Latest pointer/tap position (board games)
    pub pointer_down: Option<Vec2>,
    /// Toggle pause
    pub pause: bool,
}

impl TickInput {
    /// Convenience for tests and scripted play
    pub fn command(command: InputCommand) -> Self {
        Self {
            commands: vec![command],
            ..Default::default()
        }
    }
}

/// Advance `state` by one step of `dt_ms` milliseconds.
///
/// Only a `Running` game moves. A non-finite result is reported as an error
/// so the caller can crash the session instead of rendering garbage.
pub fn tick(
    state: &mut GameState,
    input: &TickInput,
    dt_ms: f32,
    settings: &Settings,
) -> Result<(), StepError> {
    state.events.clear();

    if input.pause && state.kind().can_pause() {
        match state.phase {
            GamePhase::Running => {
                state.phase = GamePhase::Paused;
                log::debug!("{} paused", state.kind().as_str());
                return Ok(());
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Running;
                log::debug!("{} resumed", state.kind().as_str());
            }
            _ => {}
        }
    }

    if state.phase != GamePhase::Running {
        return Ok(());
    }

    let dt_ms = dt_ms.max(0.0);
    state.time_ticks += 1;
    state.elapsed_since_last_tick_ms = dt_ms;
    state.play_time_ms += dt_ms as f64;

    let GameState {
        world,
        phase,
        score,
        events,
        rng,
        ids,
        ..
    } = state;
    let mut ctx = StepContext {
        phase,
        score,
        events,
        rng,
        ids,
    };

    match world {
        World::Runner(r) => runner::step(r, &mut ctx, input, dt_ms, &settings.runner),
        World::Flappy(f) => flappy::step(f, &mut ctx, input, dt_ms, &settings.flappy),
        World::Breakout(b) => breakout::step(b, &mut ctx, input, dt_ms, &settings.breakout),
        World::Snake(s) => snake::step(s, &mut ctx, input, &settings.snake),
        World::Merge(m) => merge::step(m, &mut ctx, input, &settings.merge),
        World::TicTacToe(t) => tictactoe::step(t, &mut ctx, input),
    }

    state.check_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{GameEvent, GameKind};
    use proptest::prelude::*;

    fn running(kind: GameKind, seed: u64) -> GameState {
        let mut state = GameState::new(kind, &Settings::default(), seed);
        state.start();
        state
    }

    #[test]
    fn test_idle_does_not_move() {
        let settings = Settings::default();
        let mut state = GameState::new(GameKind::Flappy, &settings, 1);
        let before = state.clone();
        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn test_tick_pause() {
        let settings = Settings::default();
        let mut state = running(GameKind::Breakout, 12345);

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, 16.0, &settings).unwrap();
        assert_eq!(state.phase, GamePhase::Paused);

        // Paused ticks do not advance time
        let ticks = state.time_ticks;
        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        assert_eq!(state.time_ticks, ticks);

        tick(&mut state, &pause, 16.0, &settings).unwrap();
        assert_eq!(state.phase, GamePhase::Running);
        assert_eq!(state.time_ticks, ticks + 1);
    }

    #[test]
    fn test_pause_ignored_for_flappy() {
        let settings = Settings::default();
        let mut state = running(GameKind::Flappy, 1);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, 16.0, &settings).unwrap();
        assert_eq!(state.phase, GamePhase::Running);
    }

    #[test]
    fn test_runner_single_spawn_for_two_half_intervals() {
        let settings = Settings::default();
        let mut state = running(GameKind::Runner, 5);

        let mut spawns = 0;
        for dt in [500.0, 500.0] {
            tick(&mut state, &TickInput::default(), dt, &settings).unwrap();
            spawns += state
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::Spawned { .. }))
                .count();
        }
        assert_eq!(spawns, 1);
    }

    #[test]
    fn test_non_finite_is_reported() {
        let settings = Settings::default();
        let mut state = running(GameKind::Flappy, 1);
        if let World::Flappy(f) = &mut state.world {
            f.bird.vel.y = f32::INFINITY;
        }
        let result = tick(&mut state, &TickInput::default(), 16.0, &settings);
        assert!(result.is_err());
    }

    fn command_strategy() -> impl Strategy<Value = InputCommand> {
        prop_oneof![
            Just(InputCommand::Up),
            Just(InputCommand::Down),
            Just(InputCommand::Left),
            Just(InputCommand::Right),
            Just(InputCommand::Action),
            Just(InputCommand::None),
        ]
    }

    fn kind_strategy() -> impl Strategy<Value = GameKind> {
        prop_oneof![
            Just(GameKind::Runner),
            Just(GameKind::Flappy),
            Just(GameKind::Breakout),
            Just(GameKind::Snake),
            Just(GameKind::Merge),
        ]
    }

    proptest! {
        #[test]
        fn score_never_decreases(
            kind in kind_strategy(),
            seed in any::<u64>(),
            steps in prop::collection::vec((command_strategy(), 0.0f32..40.0), 1..120),
        ) {
            let settings = Settings::default();
            let mut state = running(kind, seed);
            let mut last = state.score;
            for (command, dt) in steps {
                tick(&mut state, &TickInput::command(command), dt, &settings).unwrap();
                prop_assert!(state.score >= last);
                last = state.score;
            }
        }

        #[test]
        fn same_inputs_same_state(
            kind in kind_strategy(),
            seed in any::<u64>(),
            steps in prop::collection::vec((command_strategy(), 0.0f32..40.0), 1..80),
        ) {
            let settings = Settings::default();
            let mut a = running(kind, seed);
            let mut b = running(kind, seed);
            for (command, dt) in steps {
                let input = TickInput::command(command);
                tick(&mut a, &input, dt, &settings).unwrap();
                tick(&mut b, &input, dt, &settings).unwrap();
            }
            prop_assert_eq!(a, b);
        }
    }
}
