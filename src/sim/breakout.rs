//! Brick breaker
//!
//! The ball moves a constant distance per tick (frame time does not change
//! its speed unless the tuning asks for delta scaling).

use glam::Vec2;

use super::collision::{circle_rect_overlap, paddle_deflection, reflect_in_box, wall_contact};
use super::state::{Entity, EntityIds, GameEvent, GamePhase, StepContext};
use super::tick::TickInput;
use crate::settings::BreakoutTuning;

#[derive(Debug, Clone, PartialEq)]
pub struct Brick {
    pub body: Entity,
    /// Row index, used for colouring
    pub row: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakoutState {
    pub width: f32,
    pub height: f32,
    /// Left edge of the paddle
    pub paddle_x: f32,
    pub ball: Entity,
    pub bricks: Vec<Brick>,
    pub lives: u8,
}

impl BreakoutState {
    pub fn new(t: &BreakoutTuning, ids: &mut EntityIds) -> Self {
        let mut ball = Entity::circle(ids.next_id(), 0.0, 0.0, t.ball_r);
        serve(&mut ball, t);

        let mut bricks = Vec::with_capacity((t.rows * t.cols) as usize);
        for row in 0..t.rows {
            for col in 0..t.cols {
                let x = t.offset_left + col as f32 * (t.brick_w + t.brick_padding);
                let y = t.offset_top + row as f32 * (t.brick_h + t.brick_padding);
                bricks.push(Brick {
                    body: Entity::rect(ids.next_id(), x, y, t.brick_w, t.brick_h),
                    row,
                });
            }
        }

        Self {
            width: t.width,
            height: t.height,
            paddle_x: (t.width - t.paddle_w) / 2.0,
            ball,
            bricks,
            lives: t.lives,
        }
    }

    /// y of the paddle's top edge
    pub fn paddle_y(&self, t: &BreakoutTuning) -> f32 {
        self.height - t.paddle_offset
    }

    fn max_paddle_x(&self, t: &BreakoutTuning) -> f32 {
        self.width - t.paddle_w
    }
}

/// Put the ball back in the centre with the serve velocity
fn serve(ball: &mut Entity, t: &BreakoutTuning) {
    ball.pos = Vec2::new(t.width / 2.0, t.height / 2.0);
    ball.vel = Vec2::new(t.serve_vx, t.serve_vy);
}

/// Advance paddle, ball and bricks by one tick
pub fn step(
    b: &mut BreakoutState,
    ctx: &mut StepContext,
    input: &TickInput,
    dt_ms: f32,
    t: &BreakoutTuning,
) {
    let units = t.motion.units(dt_ms);
    let max_x = b.max_paddle_x(t);

    // Pointer places the paddle centre; held keys nudge it
    if let Some(px) = input.pointer_x {
        b.paddle_x = (px - t.paddle_w / 2.0).clamp(0.0, max_x);
    }
    if input.held.left {
        b.paddle_x = (b.paddle_x - t.paddle_speed * units).max(0.0);
    }
    if input.held.right {
        b.paddle_x = (b.paddle_x + t.paddle_speed * units).min(max_x);
    }

    let ball = &mut b.ball;
    let r = ball.radius();
    ball.pos += ball.vel * units;

    let contact = wall_contact(ball.pos, r, b.width, b.height);
    reflect_in_box(&mut ball.pos, &mut ball.vel, contact, r, b.width);

    let on_paddle_x = ball.pos.x >= b.paddle_x && ball.pos.x <= b.paddle_x + t.paddle_w;
    if ball.pos.y >= b.height - t.catch_offset && on_paddle_x && ball.vel.y > 0.0 {
        ball.vel.y = -ball.vel.y;
        ball.vel.x = paddle_deflection(ball.pos.x, b.paddle_x, t.paddle_w, t.angle_factor);
        ctx.emit(GameEvent::PaddleHit);
    }

    if ball.pos.y > b.height {
        b.lives = b.lives.saturating_sub(1);
        ctx.emit(GameEvent::LifeLost { remaining: b.lives });
        if b.lives == 0 {
            ctx.finish(GamePhase::Lost);
            return;
        }
        serve(ball, t);
    }

    let mut hit = false;
    for brick in b.bricks.iter_mut().filter(|br| br.body.alive) {
        if circle_rect_overlap(ball.pos, r, &brick.body.bounds()) {
            brick.body.alive = false;
            hit = true;
            ctx.emit(GameEvent::BrickBroken { id: brick.body.id });
            ctx.add_score(t.brick_points);
        }
    }
    if hit {
        ball.vel.y = -ball.vel.y;
        b.bricks.retain(|br| br.body.alive);
    }

    if b.bricks.is_empty() {
        ctx.finish(GamePhase::Won);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::state::{GameKind, GameState, World};
    use crate::sim::tick::{HeldDirections, tick};

    fn running(settings: &Settings) -> GameState {
        let mut state = GameState::new(GameKind::Breakout, settings, 1);
        state.start();
        state
    }

    fn breakout(state: &GameState) -> &BreakoutState {
        match &state.world {
            World::Breakout(b) => b,
            _ => unreachable!(),
        }
    }

    fn breakout_mut(state: &mut GameState) -> &mut BreakoutState {
        match &mut state.world {
            World::Breakout(b) => b,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_initial_layout() {
        let settings = Settings::default();
        let state = running(&settings);
        let b = breakout(&state);
        assert_eq!(b.bricks.len(), 50);
        assert_eq!(b.paddle_x, 340.0);
        assert_eq!(b.ball.pos, Vec2::new(400.0, 300.0));
        assert_eq!(b.ball.vel, Vec2::new(3.0, -3.0));
        // Last brick: col 9, row 4
        let last = &b.bricks[49].body;
        assert_eq!(last.pos, Vec2::new(50.0 + 9.0 * 75.0, 60.0 + 4.0 * 25.0));
    }

    #[test]
    fn test_constant_step_ignores_frame_time() {
        let settings = Settings::default();
        let mut state = running(&settings);
        tick(&mut state, &TickInput::default(), 250.0, &settings).unwrap();
        assert_eq!(breakout(&state).ball.pos, Vec2::new(403.0, 297.0));
    }

    fn paddle_hit_at(offset: f32) -> f32 {
        let settings = Settings::default();
        let mut state = running(&settings);
        let b = breakout_mut(&mut state);
        b.bricks.truncate(1);
        b.paddle_x = 340.0;
        b.ball.pos = Vec2::new(340.0 + offset, 557.0);
        b.ball.vel = Vec2::new(0.0, 3.0);

        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        let ball = &breakout(&state).ball;
        assert_eq!(ball.vel.y, -3.0);
        ball.vel.x
    }

    #[test]
    fn test_paddle_angle() {
        assert_eq!(paddle_hit_at(0.0), -3.0);
        assert_eq!(paddle_hit_at(60.0), 0.0);
        assert_eq!(paddle_hit_at(120.0), 3.0);
    }

    #[test]
    fn test_wall_reflection_keeps_ball_inside() {
        let settings = Settings::default();
        let mut state = running(&settings);
        let b = breakout_mut(&mut state);
        b.ball.pos = Vec2::new(788.0, 300.0);
        b.ball.vel = Vec2::new(3.0, 3.0);

        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        let ball = &breakout(&state).ball;
        assert_eq!(ball.vel.x, -3.0);
        assert_eq!(ball.pos.x, 790.0);
    }

    #[test]
    fn test_brick_hit_scores_and_reflects() {
        let settings = Settings::default();
        let mut state = running(&settings);
        let b = breakout_mut(&mut state);
        // Just under the bottom row (y 160..180), moving up
        b.ball.pos = Vec2::new(85.0, 192.0);
        b.ball.vel = Vec2::new(0.0, -3.0);

        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        let b = breakout(&state);
        assert_eq!(state.score, 10);
        assert_eq!(b.bricks.len(), 49);
        assert_eq!(b.ball.vel.y, 3.0);
    }

    #[test]
    fn test_two_bricks_flip_once() {
        let settings = Settings::default();
        let mut state = running(&settings);
        let b = breakout_mut(&mut state);
        // Straddles the padding between col 0 and col 1 of the bottom row
        b.ball.pos = Vec2::new(122.5, 192.0);
        b.ball.vel = Vec2::new(0.0, -3.0);

        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        assert_eq!(state.score, 20);
        assert_eq!(breakout(&state).ball.vel.y, 3.0);
    }

    #[test]
    fn test_losing_ball_costs_life_then_game() {
        let settings = Settings::default();
        let mut state = running(&settings);
        let b = breakout_mut(&mut state);
        b.ball.pos = Vec2::new(20.0, 599.0);
        b.ball.vel = Vec2::new(0.0, 3.0);
        b.paddle_x = 600.0;

        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        let b = breakout(&state);
        assert_eq!(b.lives, 2);
        assert_eq!(b.ball.pos, Vec2::new(400.0, 300.0));
        assert!(state.events.contains(&GameEvent::LifeLost { remaining: 2 }));

        breakout_mut(&mut state).lives = 1;
        let b = breakout_mut(&mut state);
        b.ball.pos = Vec2::new(20.0, 599.0);
        b.ball.vel = Vec2::new(0.0, 3.0);
        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        assert_eq!(state.phase, GamePhase::Lost);
    }

    #[test]
    fn test_clearing_bricks_wins() {
        let settings = Settings::default();
        let mut state = running(&settings);
        let b = breakout_mut(&mut state);
        b.bricks.truncate(1);
        b.ball.pos = Vec2::new(85.0, 92.0);
        b.ball.vel = Vec2::new(0.0, -3.0);

        tick(&mut state, &TickInput::default(), 16.0, &settings).unwrap();
        assert_eq!(state.phase, GamePhase::Won);
    }

    #[test]
    fn test_paddle_controls() {
        let settings = Settings::default();
        let mut state = running(&settings);

        let held = TickInput {
            held: HeldDirections {
                left: true,
                ..Default::default()
            },
            ..Default::default()
        };
        tick(&mut state, &held, 16.0, &settings).unwrap();
        assert_eq!(breakout(&state).paddle_x, 330.0);

        let pointer = TickInput {
            pointer_x: Some(790.0),
            ..Default::default()
        };
        tick(&mut state, &pointer, 16.0, &settings).unwrap();
        assert_eq!(breakout(&state).paddle_x, 680.0);

        let pointer = TickInput {
            pointer_x: Some(10.0),
            ..Default::default()
        };
        tick(&mut state, &pointer, 16.0, &settings).unwrap();
        assert_eq!(breakout(&state).paddle_x, 0.0);
    }
}
