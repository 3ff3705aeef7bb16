//! Game tuning and preferences
//!
//! Every default is the value the games shipped with. Persisted as JSON in
//! the key-value store; partial documents fill in from defaults, and any
//! block with out-of-range values is replaced by its defaults on load.

use serde::{Deserialize, Serialize};

use crate::highscores::KeyValueStore;

/// How continuous motion is integrated each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MotionStep {
    /// One fixed motion unit per tick regardless of frame time
    #[default]
    PerTick,
    /// Motion scaled by elapsed time relative to a 60 Hz frame
    DeltaScaled,
}

impl MotionStep {
    /// Length of a nominal 60 Hz frame in milliseconds
    pub const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Largest scale applied after a stall (prevents tunnelling)
    pub const MAX_UNITS: f32 = 3.0;

    /// Motion units to apply for a tick that took `dt_ms`
    pub fn units(&self, dt_ms: f32) -> f32 {
        match self {
            MotionStep::PerTick => 1.0,
            MotionStep::DeltaScaled => (dt_ms / Self::FRAME_MS).clamp(0.0, Self::MAX_UNITS),
        }
    }
}


/// Every value finite and strictly positive
fn all_positive(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite() && *v > 0.0)
}

fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerTuning {
    pub width: f32,
    pub height: f32,
    /// Ground line as a fraction of height
    pub ground_ratio: f32,
    pub player_x: f32,
    pub player_w: f32,
    pub player_h: f32,
    pub slide_h: f32,
    pub slide_ms: f32,
    pub gravity: f32,
    pub jump_strength: f32,
    pub start_speed: f32,
    pub speed_step: f32,
    pub max_speed: f32,
    pub start_interval_ms: f32,
    pub interval_step_ms: f32,
    pub min_interval_ms: f32,
    pub obstacle_w: f32,
    pub low_obstacle_h: f32,
    pub high_obstacle_h: f32,
    pub spawn_offset: f32,
    pub prune_margin: f32,
    pub max_obstacles: usize,
    pub score_factor: f32,
    pub min_width: f32,
    pub max_width: f32,
    pub anim_frame_ms: f32,
    pub motion: MotionStep,
}

impl Default for RunnerTuning {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
            ground_ratio: 0.85,
            player_x: 80.0,
            player_w: 40.0,
            player_h: 60.0,
            slide_h: 38.0,
            slide_ms: 220.0,
            gravity: 0.7,
            jump_strength: -12.0,
            start_speed: 6.0,
            speed_step: 0.15,
            max_speed: 14.0,
            start_interval_ms: 900.0,
            interval_step_ms: 12.0,
            min_interval_ms: 520.0,
            obstacle_w: 30.0,
            low_obstacle_h: 30.0,
            high_obstacle_h: 60.0,
            spawn_offset: 20.0,
            prune_margin: 10.0,
            max_obstacles: 200,
            score_factor: 0.6,
            min_width: 320.0,
            max_width: 820.0,
            anim_frame_ms: 120.0,
            motion: MotionStep::PerTick,
        }
    }
}

impl RunnerTuning {
    /// First problem that would break the simulation, if any
    pub fn check(&self) -> Result<(), &'static str> {
        if !all_positive(&[
            self.width,
            self.height,
            self.player_w,
            self.player_h,
            self.slide_h,
            self.start_speed,
            self.max_speed,
            self.start_interval_ms,
            self.min_interval_ms,
            self.obstacle_w,
            self.low_obstacle_h,
            self.high_obstacle_h,
            self.min_width,
            self.max_width,
            self.anim_frame_ms,
        ]) {
            return Err("sizes, speeds and intervals must be positive");
        }
        if !all_finite(&[
            self.player_x,
            self.slide_ms,
            self.gravity,
            self.jump_strength,
            self.speed_step,
            self.interval_step_ms,
            self.spawn_offset,
            self.prune_margin,
            self.score_factor,
        ]) {
            return Err("non-finite value");
        }
        if !(self.ground_ratio > 0.0 && self.ground_ratio <= 1.0) {
            return Err("ground_ratio must be in (0, 1]");
        }
        if self.min_width > self.max_width {
            return Err("min_width above max_width");
        }
        if self.max_obstacles == 0 {
            return Err("max_obstacles must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlappyTuning {
    pub width: f32,
    pub height: f32,
    /// Height of the ground band at the bottom
    pub ground_h: f32,
    pub bird_x: f32,
    pub bird_r: f32,
    pub gravity: f32,
    pub flap: f32,
    pub pipe_w: f32,
    pub start_gap: f32,
    pub gap_step: f32,
    pub min_gap: f32,
    pub start_speed: f32,
    pub speed_step: f32,
    pub max_speed: f32,
    pub start_interval_ms: f32,
    pub interval_step_ms: f32,
    pub min_interval_ms: f32,
    pub spawn_margin: f32,
    pub spawn_offset: f32,
    pub prune_margin: f32,
    pub max_pipes: usize,
    pub motion: MotionStep,
}

impl Default for FlappyTuning {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 600.0,
            ground_h: 40.0,
            bird_x: 80.0,
            bird_r: 12.0,
            gravity: 0.42,
            flap: -8.5,
            pipe_w: 60.0,
            start_gap: 180.0,
            gap_step: 0.5,
            min_gap: 150.0,
            start_speed: 2.2,
            speed_step: 0.03,
            max_speed: 4.2,
            start_interval_ms: 1500.0,
            interval_step_ms: 6.0,
            min_interval_ms: 1100.0,
            spawn_margin: 50.0,
            spawn_offset: 20.0,
            prune_margin: 20.0,
            max_pipes: 200,
            motion: MotionStep::PerTick,
        }
    }
}

impl FlappyTuning {
    pub fn check(&self) -> Result<(), &'static str> {
        if !all_positive(&[
            self.width,
            self.height,
            self.bird_r,
            self.pipe_w,
            self.start_gap,
            self.min_gap,
            self.start_speed,
            self.max_speed,
            self.start_interval_ms,
            self.min_interval_ms,
        ]) {
            return Err("sizes, speeds and intervals must be positive");
        }
        if !all_finite(&[
            self.ground_h,
            self.bird_x,
            self.gravity,
            self.flap,
            self.gap_step,
            self.speed_step,
            self.interval_step_ms,
            self.spawn_margin,
            self.spawn_offset,
            self.prune_margin,
        ]) {
            return Err("non-finite value");
        }
        if self.ground_h < 0.0 || self.ground_h + 2.0 * self.bird_r >= self.height {
            return Err("ground band leaves no room for the bird");
        }
        if self.max_pipes == 0 {
            return Err("max_pipes must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutTuning {
    pub width: f32,
    pub height: f32,
    pub paddle_w: f32,
    pub paddle_h: f32,
    /// Paddle top edge distance from the bottom
    pub paddle_offset: f32,
    /// Ball is caught by the paddle once `y >= height - catch_offset`
    pub catch_offset: f32,
    pub paddle_speed: f32,
    pub ball_r: f32,
    pub serve_vx: f32,
    pub serve_vy: f32,
    pub angle_factor: f32,
    pub lives: u8,
    pub rows: u32,
    pub cols: u32,
    pub brick_w: f32,
    pub brick_h: f32,
    pub brick_padding: f32,
    pub offset_left: f32,
    pub offset_top: f32,
    pub brick_points: u64,
    pub motion: MotionStep,
}

impl Default for BreakoutTuning {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            paddle_w: 120.0,
            paddle_h: 20.0,
            paddle_offset: 30.0,
            catch_offset: 40.0,
            paddle_speed: 10.0,
            ball_r: 10.0,
            serve_vx: 3.0,
            serve_vy: -3.0,
            angle_factor: 6.0,
            lives: 3,
            rows: 5,
            cols: 10,
            brick_w: 70.0,
            brick_h: 20.0,
            brick_padding: 5.0,
            offset_left: 50.0,
            offset_top: 60.0,
            brick_points: 10,
            motion: MotionStep::PerTick,
        }
    }
}

impl BreakoutTuning {
    pub fn check(&self) -> Result<(), &'static str> {
        if !all_positive(&[
            self.width,
            self.height,
            self.paddle_w,
            self.paddle_h,
            self.ball_r,
            self.brick_w,
            self.brick_h,
        ]) {
            return Err("sizes must be positive");
        }
        if !all_finite(&[
            self.paddle_offset,
            self.catch_offset,
            self.paddle_speed,
            self.serve_vx,
            self.serve_vy,
            self.angle_factor,
            self.brick_padding,
            self.offset_left,
            self.offset_top,
        ]) {
            return Err("non-finite value");
        }
        // Paddle and ball clamps need a non-empty range
        if self.paddle_w > self.width || 2.0 * self.ball_r > self.width {
            return Err("paddle or ball wider than the board");
        }
        if self.lives == 0 || self.rows == 0 || self.cols == 0 {
            return Err("lives, rows and cols must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnakeTuning {
    /// Board edge in pixels (square)
    pub board: i32,
    pub cell: i32,
    pub step_ms: u32,
    pub food_points: u64,
    /// Random placements tried before scanning for a free cell
    pub food_attempts: u32,
}

impl Default for SnakeTuning {
    fn default() -> Self {
        Self {
            board: 400,
            cell: 20,
            step_ms: 150,
            food_points: 10,
            food_attempts: 64,
        }
    }
}

impl SnakeTuning {
    pub fn check(&self) -> Result<(), &'static str> {
        if self.cell <= 0 || self.board < self.cell || self.board % self.cell != 0 {
            return Err("board must be a positive multiple of cell");
        }
        if self.step_ms == 0 {
            return Err("step_ms must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeTuning {
    pub size: usize,
    /// Probability that a new tile is a 2 (otherwise 4)
    pub two_chance: f64,
}

impl Default for MergeTuning {
    fn default() -> Self {
        Self {
            size: 4,
            two_chance: 0.9,
        }
    }
}

impl MergeTuning {
    /// Largest board accepted from storage
    pub const MAX_SIZE: usize = 8;

    pub fn check(&self) -> Result<(), &'static str> {
        if !(2..=Self::MAX_SIZE).contains(&self.size) {
            return Err("size must be between 2 and 8");
        }
        if !(0.0..=1.0).contains(&self.two_chance) {
            return Err("two_chance must be a probability");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputTuning {
    /// Minimum displacement for a touch to count as a swipe
    pub swipe_threshold: f32,
    /// One-shot commands buffered between ticks
    pub max_queued: usize,
}

impl Default for InputTuning {
    fn default() -> Self {
        Self {
            swipe_threshold: 24.0,
            max_queued: 16,
        }
    }
}

impl InputTuning {
    pub fn check(&self) -> Result<(), &'static str> {
        if !(self.swipe_threshold.is_finite() && self.swipe_threshold >= 0.0) {
            return Err("swipe_threshold must be non-negative");
        }
        if self.max_queued == 0 {
            return Err("max_queued must be at least 1");
        }
        Ok(())
    }
}

/// All tunables, one block per game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub runner: RunnerTuning,
    pub flappy: FlappyTuning,
    pub breakout: BreakoutTuning,
    pub snake: SnakeTuning,
    pub merge: MergeTuning,
    pub input: InputTuning,
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "arcade-settings";

    /// Parse a (possibly partial) JSON document. Out-of-range blocks are
    /// reset to their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Replace every block that fails its check with the default block.
    /// Returns the number of blocks reset.
    pub fn sanitize(&mut self) -> usize {
        fn reset<T: Default>(block: &mut T, name: &str, result: Result<(), &'static str>) -> usize {
            match result {
                Ok(()) => 0,
                Err(reason) => {
                    log::warn!("Resetting {} settings: {}", name, reason);
                    *block = T::default();
                    1
                }
            }
        }

        let runner = self.runner.check();
        let flappy = self.flappy.check();
        let breakout = self.breakout.check();
        let snake = self.snake.check();
        let merge = self.merge.check();
        let input = self.input.check();
        reset(&mut self.runner, "runner", runner)
            + reset(&mut self.flappy, "flappy", flappy)
            + reset(&mut self.breakout, "breakout", breakout)
            + reset(&mut self.snake, "snake", snake)
            + reset(&mut self.merge, "merge", merge)
            + reset(&mut self.input, "input", input)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Load settings, falling back to defaults when absent or corrupt
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Some(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from storage");
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring corrupt settings: {}", e);
                    Self::default()
                }
            },
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        match self.to_json() {
            Ok(json) => {
                store.set(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
            Err(e) => log::warn!("Could not encode settings: {}", e),
        }
    }
}
