//! Flappy
//!
//! A bird under gravity, pipes scrolling left. Every spawn speeds the pipes
//! up and narrows the gap, down to fixed limits.

use rand::Rng;

use super::ramp::{Ramp, SpawnTimer};
use super::state::{Entity, EntityIds, GameEvent, GamePhase, StepContext};
use super::tick::{InputCommand, TickInput};
use crate::settings::FlappyTuning;

/// A pipe pair with an opening centred on `gap_center`
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    pub id: u32,
    /// Left edge
    pub x: f32,
    pub gap_center: f32,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlappyState {
    pub width: f32,
    pub height: f32,
    pub bird: Entity,
    pub pipes: Vec<Pipe>,
    pub gap: Ramp,
    pub speed: Ramp,
    pub spawn: SpawnTimer,
}

impl FlappyState {
    pub fn new(t: &FlappyTuning, ids: &mut EntityIds) -> Self {
        Self {
            width: t.width,
            height: t.height,
            bird: Entity::circle(ids.next_id(), t.bird_x, t.height / 2.0, t.bird_r),
            pipes: Vec::new(),
            gap: Ramp::new(t.start_gap, -t.gap_step, t.min_gap),
            speed: Ramp::new(t.start_speed, t.speed_step, t.max_speed),
            spawn: SpawnTimer::new(Ramp::new(
                t.start_interval_ms,
                -t.interval_step_ms,
                t.min_interval_ms,
            )),
        }
    }

    /// Top of the ground band
    pub fn floor_y(&self, t: &FlappyTuning) -> f32 {
        self.height - t.ground_h
    }

    /// Vertical extent of the opening in `pipe`
    pub fn gap_span(&self, pipe: &Pipe) -> (f32, f32) {
        let half = self.gap.value / 2.0;
        (pipe.gap_center - half, pipe.gap_center + half)
    }

    fn spawn_pipe(&mut self, ctx: &mut StepContext, t: &FlappyTuning) -> u32 {
        // Keep the whole opening at least `spawn_margin` away from both edges
        let gap = self.gap.value;
        let free = (self.height - 2.0 * t.spawn_margin - gap).max(0.0);
        let top = t.spawn_margin + ctx.rng.random::<f32>() * free;
        let id = ctx.ids.next_id();
        self.pipes.push(Pipe {
            id,
            x: self.width + t.spawn_offset,
            gap_center: top + gap / 2.0,
            passed: false,
        });
        id
    }
}

/// Advance the bird and pipes by one tick
pub fn step(
    f: &mut FlappyState,
    ctx: &mut StepContext,
    input: &TickInput,
    dt_ms: f32,
    t: &FlappyTuning,
) {
    let units = t.motion.units(dt_ms);

    if input
        .commands
        .iter()
        .any(|c| matches!(c, InputCommand::Action | InputCommand::Up))
    {
        f.bird.vel.y = t.flap;
        ctx.emit(GameEvent::Flapped);
    }

    f.bird.vel.y += t.gravity * units;
    f.bird.pos.y += f.bird.vel.y * units;

    let r = f.bird.radius();
    if f.bird.pos.y - r < 0.0 {
        f.bird.pos.y = r;
        f.bird.vel.y = 0.0;
    }
    let floor = f.floor_y(t);
    if f.bird.pos.y + r > floor {
        f.bird.pos.y = floor - r;
        ctx.emit(GameEvent::Collided);
        ctx.finish(GamePhase::Lost);
        return;
    }

    if f.spawn.advance(dt_ms) {
        let id = f.spawn_pipe(ctx, t);
        f.speed.bump();
        f.gap.bump();
        f.spawn.interval.bump();
        ctx.emit(GameEvent::Spawned { id });
    }

    let speed = f.speed.value;
    let bird_left = f.bird.pos.x - r;
    let mut passed = 0;
    for pipe in &mut f.pipes {
        pipe.x -= speed * units;
        if !pipe.passed && pipe.x + t.pipe_w < bird_left {
            pipe.passed = true;
            passed += 1;
        }
    }
    ctx.add_score(passed);

    f.pipes.retain(|p| p.x + t.pipe_w > -t.prune_margin);
    if f.pipes.len() > t.max_pipes {
        let excess = f.pipes.len() - t.max_pipes;
        f.pipes.drain(..excess);
    }

    let bird = &f.bird;
    for pipe in &f.pipes {
        let in_pipe_x = bird.pos.x + r > pipe.x && bird.pos.x - r < pipe.x + t.pipe_w;
        if !in_pipe_x {
            continue;
        }
        let (gap_top, gap_bottom) = f.gap_span(pipe);
        if bird.pos.y - r < gap_top || bird.pos.y + r > gap_bottom {
            ctx.emit(GameEvent::Collided);
            ctx.finish(GamePhase::Lost);
            return;
        }
    }
}
