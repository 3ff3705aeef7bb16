//! Endless runner
//!
//! Player runs in place at a fixed x; obstacles scroll in from the right at
//! a speed that ramps up with every spawn.

use rand::Rng;

use super::collision::rects_overlap;
use super::ramp::{Ramp, SpawnTimer};
use super::state::{Entity, EntityIds, GameEvent, GamePhase, StepContext};
use super::tick::{InputCommand, TickInput};
use crate::settings::RunnerTuning;

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerPlayer {
    pub body: Entity,
    pub on_ground: bool,
    pub sliding: bool,
    pub slide_timer_ms: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub body: Entity,
    pub kind: ObstacleKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerState {
    pub width: f32,
    pub height: f32,
    /// y of the ground line
    pub ground_y: f32,
    pub player: RunnerPlayer,
    pub obstacles: Vec<Obstacle>,
    pub spawn: SpawnTimer,
    pub speed: Ramp,
    /// Background parallax scroll, in [0, width)
    pub bg_offset: f32,
    pub anim_time_ms: f32,
    pub anim_frame: u8,
}

impl RunnerState {
    pub fn new(t: &RunnerTuning, ids: &mut EntityIds) -> Self {
        let ground_y = (t.height * t.ground_ratio).round();
        let body = Entity::rect(ids.next_id(), t.player_x, ground_y - t.player_h, t.player_w, t.player_h);
        Self {
            width: t.width,
            height: t.height,
            ground_y,
            player: RunnerPlayer {
                body,
                on_ground: true,
                sliding: false,
                slide_timer_ms: 0.0,
            },
            obstacles: Vec::new(),
            spawn: SpawnTimer::new(Ramp::new(
                t.start_interval_ms,
                -t.interval_step_ms,
                t.min_interval_ms,
            )),
            speed: Ramp::new(t.start_speed, t.speed_step, t.max_speed),
            bg_offset: 0.0,
            anim_time_ms: 0.0,
            anim_frame: 0,
        }
    }

    /// Re-derive the logical layout from the container width.
    ///
    /// Keeps the base aspect ratio and re-seats everything on the new
    /// ground line.
    pub fn resize(&mut self, container_width: f32, t: &RunnerTuning) {
        let aspect = t.width / t.height;
        let width = container_width.min(t.max_width).max(t.min_width);
        let height = (width / aspect).round();
        self.width = width;
        self.height = height;
        self.ground_y = (height * t.ground_ratio).round();

        let player = &mut self.player.body;
        player.pos.y = self.ground_y - player.height();
        self.player.on_ground = true;
        self.player.body.vel.y = 0.0;

        for obstacle in &mut self.obstacles {
            obstacle.body.pos.y = self.ground_y - obstacle.body.height();
        }
        log::debug!("runner resized to {}x{}", width, height);
    }

    fn jump(&mut self, t: &RunnerTuning) -> bool {
        let p = &mut self.player;
        if p.on_ground && !p.sliding {
            p.body.vel.y = t.jump_strength;
            p.on_ground = false;
            return true;
        }
        false
    }

    fn slide(&mut self, t: &RunnerTuning) -> bool {
        let ground_y = self.ground_y;
        let p = &mut self.player;
        if p.on_ground && !p.sliding {
            p.sliding = true;
            p.slide_timer_ms = t.slide_ms;
            p.body.set_height(t.slide_h);
            p.body.pos.y = ground_y - t.slide_h;
            return true;
        }
        false
    }

    fn spawn_obstacle(&mut self, ctx: &mut StepContext, t: &RunnerTuning) -> u32 {
        let kind = if ctx.rng.random_bool(0.5) {
            ObstacleKind::Low
        } else {
            ObstacleKind::High
        };
        let h = match kind {
            ObstacleKind::Low => t.low_obstacle_h,
            ObstacleKind::High => t.high_obstacle_h,
        };
        let id = ctx.ids.next_id();
        let body = Entity::rect(id, self.width + t.spawn_offset, self.ground_y - h, t.obstacle_w, h);
        self.obstacles.push(Obstacle { body, kind });
        id
    }
}

/// Advance the runner by one tick
pub fn step(
    r: &mut RunnerState,
    ctx: &mut StepContext,
    input: &TickInput,
    dt_ms: f32,
    t: &RunnerTuning,
) {
    let units = t.motion.units(dt_ms);

    for command in &input.commands {
        match command {
            InputCommand::Up | InputCommand::Action => {
                if r.jump(t) {
                    ctx.emit(GameEvent::Jumped);
                }
            }
            InputCommand::Down => {
                if r.slide(t) {
                    ctx.emit(GameEvent::SlideStarted);
                }
            }
            _ => {}
        }
    }

    // Jump arc
    let ground_y = r.ground_y;
    let p = &mut r.player;
    p.body.vel.y += t.gravity * units;
    p.body.pos.y += p.body.vel.y * units;
    let rest_y = ground_y - p.body.height();
    if p.body.pos.y >= rest_y {
        p.body.pos.y = rest_y;
        p.body.vel.y = 0.0;
        p.on_ground = true;
    }

    if p.sliding {
        p.slide_timer_ms -= dt_ms;
        if p.slide_timer_ms <= 0.0 {
            p.sliding = false;
            p.slide_timer_ms = 0.0;
            p.body.set_height(t.player_h);
            p.body.pos.y = ground_y - t.player_h;
        }
    }

    // Spawning and difficulty ramp
    if r.spawn.advance(dt_ms) {
        let id = r.spawn_obstacle(ctx, t);
        r.speed.bump();
        r.spawn.interval.bump();
        ctx.emit(GameEvent::Spawned { id });
    }

    let speed = r.speed.value;
    for obstacle in &mut r.obstacles {
        obstacle.body.pos.x -= speed * units;
    }
    r.obstacles
        .retain(|o| o.body.pos.x + o.body.width() > -t.prune_margin);
    if r.obstacles.len() > t.max_obstacles {
        let excess = r.obstacles.len() - t.max_obstacles;
        r.obstacles.drain(..excess);
    }

    r.bg_offset = (r.bg_offset + speed * 0.6 * units) % r.width;

    let player = r.player.body.bounds();
    if r
        .obstacles
        .iter()
        .any(|o| rects_overlap(&player, &o.body.bounds()))
    {
        ctx.emit(GameEvent::Collided);
        ctx.finish(GamePhase::Lost);
        return;
    }

    ctx.add_score((speed * t.score_factor * units).floor() as u64);

    r.anim_time_ms += dt_ms;
    if r.anim_time_ms > t.anim_frame_ms {
        r.anim_time_ms = 0.0;
        r.anim_frame = (r.anim_frame + 1) % 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MotionStep;
    use crate::sim::state::{GameKind, GameState, World};
    use crate::sim::tick::tick;
    use crate::settings::Settings;

    fn running(settings: &Settings) -> GameState {
        let mut state = GameState::new(GameKind::Runner, settings, 42);
        state.start();
        state
    }

    fn runner(state: &GameState) -> &RunnerState {
        match &state.world {
            World::Runner(r) => r,
            _ => unreachable!(),
        }
    }

    fn runner_mut(state: &mut GameState) -> &mut RunnerState {
        match &mut state.world {
            World::Runner(r) => r,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_initial_layout() {
        let settings = Settings::default();
        let state = running(&settings);
        let r = runner(&state);
        assert_eq!(r.ground_y, 340.0);
        assert_eq!(r.player.body.pos.y, 280.0);
        assert!(r.player.on_ground);
    }

    #[test]
    fn test_jump_arc_lands() {
        let settings = Settings::default();
        let mut state = running(&settings);

        tick(&mut state, &TickInput::command(InputCommand::Up), 16.0, &settings).unwrap();
        let r = runner(&state);
        assert!(!r.player.on_ground);
        // -12 + 0.7 applied in the same tick
        assert!((r.player.body.vel.y + 11.3).abs() < 1e-4);
        assert!(r.player.body.pos.y < 280.0);

        // A second jump mid-air is ignored
        let vy = r.player.body.vel.y;
        tick(&mut state, &TickInput::command(InputCommand::Up), 16.0, &settings).unwrap();
        assert!((runner(&state).player.body.vel.y - (vy + 0.7)).abs() < 1e-4);

        for _ in 0..60 {
            tick(&mut state, &TickInput::default(), 0.0, &settings).unwrap();
        }
        let r = runner(&state);
        assert!(r.player.on_ground);
        assert_eq!(r.player.body.pos.y, 280.0);
    }

    #[test]
    fn test_slide_shrinks_then_restores() {
        let settings = Settings::default();
        let mut state = running(&settings);

        tick(&mut state, &TickInput::command(InputCommand::Down), 0.0, &settings).unwrap();
        let r = runner(&state);
        assert!(r.player.sliding);
        assert_eq!(r.player.body.height(), 38.0);
        assert_eq!(r.player.body.pos.y, 302.0);

        // Cannot jump while sliding
        tick(&mut state, &TickInput::command(InputCommand::Up), 100.0, &settings).unwrap();
        assert!(runner(&state).player.on_ground);

        tick(&mut state, &TickInput::default(), 130.0, &settings).unwrap();
        let r = runner(&state);
        assert!(!r.player.sliding);
        assert_eq!(r.player.body.height(), 60.0);
        assert_eq!(r.player.body.pos.y, 280.0);
    }

    #[test]
    fn test_spawn_ramps_difficulty() {
        let settings = Settings::default();
        let mut state = running(&settings);

        tick(&mut state, &TickInput::default(), 900.0, &settings).unwrap();
        let r = runner(&state);
        assert_eq!(r.obstacles.len(), 1);
        assert!((r.speed.value - 6.15).abs() < 1e-4);
        assert_eq!(r.spawn.interval.value, 888.0);
        // Spawned at the far edge, then moved by one tick
        assert!((r.obstacles[0].body.pos.x - (820.0 - 6.15)).abs() < 1e-3);
    }

    #[test]
    fn test_collision_loses() {
        let settings = Settings::default();
        let mut state = running(&settings);
        let mut ids = EntityIds::default();
        let r = runner_mut(&mut state);
        r.obstacles.push(Obstacle {
            body: Entity::rect(ids.next_id(), 100.0, 310.0, 30.0, 30.0),
            kind: ObstacleKind::Low,
        });

        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        assert_eq!(state.phase, GamePhase::Lost);
        assert!(state.events.contains(&GameEvent::Collided));
    }

    #[test]
    fn test_prune_and_cap() {
        let settings = Settings::default();
        let mut state = running(&settings);
        let r = runner_mut(&mut state);
        let mut ids = EntityIds::default();
        // One off-screen, many far ahead
        r.obstacles.push(Obstacle {
            body: Entity::rect(ids.next_id(), -45.0, 310.0, 30.0, 30.0),
            kind: ObstacleKind::Low,
        });
        for i in 0..250 {
            r.obstacles.push(Obstacle {
                body: Entity::rect(ids.next_id(), 2000.0 + i as f32, 310.0, 30.0, 30.0),
                kind: ObstacleKind::Low,
            });
        }

        tick(&mut state, &TickInput::default(), 0.0, &settings).unwrap();
        let r = runner(&state);
        assert_eq!(r.obstacles.len(), 200);
        assert!(r.obstacles.iter().all(|o| o.body.pos.x > 0.0));
    }

    #[test]
    fn test_score_per_tick() {
        let settings = Settings::default();
        let mut state = running(&settings);
        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        // floor(6 * 0.6)
        assert_eq!(state.score, 3);
    }

    #[test]
    fn test_delta_scaled_motion() {
        let mut settings = Settings::default();
        settings.runner.motion = MotionStep::DeltaScaled;
        let mut state = running(&settings);

        tick(&mut state, &TickInput::command(InputCommand::Up), MotionStep::FRAME_MS * 2.0, &settings)
            .unwrap();
        let r = runner(&state);
        // -12 + 0.7*2, then moved by two units
        assert!((r.player.body.vel.y + 10.6).abs() < 1e-3);
        assert!((r.player.body.pos.y - (280.0 - 21.2)).abs() < 1e-2);
    }

    #[test]
    fn test_resize_reseats_player() {
        let settings = Settings::default();
        let mut state = running(&settings);
        let r = runner_mut(&mut state);

        r.resize(400.0, &settings.runner);
        assert_eq!(r.width, 400.0);
        assert_eq!(r.height, 200.0);
        assert_eq!(r.ground_y, 170.0);
        assert_eq!(r.player.body.pos.y, 110.0);

        // Clamped to the supported range
        r.resize(100.0, &settings.runner);
        assert_eq!(r.width, 320.0);
        r.resize(2000.0, &settings.runner);
        assert_eq!(r.width, 820.0);
    }
}
