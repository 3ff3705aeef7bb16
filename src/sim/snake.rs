//! Snake on a wrapping grid
//!
//! Positions are pixel coordinates snapped to the cell size; the board is a
//! torus so leaving one edge re-enters on the opposite one.

use std::collections::VecDeque;

use glam::IVec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::collision::wrap_advance;
use super::state::{GameEvent, GamePhase, StepContext};
use super::tick::{InputCommand, TickInput};
use crate::settings::SnakeTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn from_command(command: InputCommand) -> Option<Self> {
        match command {
            InputCommand::Up => Some(Direction::Up),
            InputCommand::Down => Some(Direction::Down),
            InputCommand::Left => Some(Direction::Left),
            InputCommand::Right => Some(Direction::Right),
            InputCommand::Action | InputCommand::None => None,
        }
    }

    /// Unit step in cells
    pub fn delta(&self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnakeState {
    pub board: i32,
    pub cell: i32,
    /// Head at the front
    pub body: VecDeque<IVec2>,
    /// Direction of the last step taken; `None` until the first move
    pub heading: Option<Direction>,
    /// Direction to take on the next step
    pub next: Option<Direction>,
    pub food: IVec2,
}

impl SnakeState {
    pub fn new(t: &SnakeTuning, rng: &mut Pcg32) -> Self {
        let center = (t.board / t.cell / 2) * t.cell;
        let mut snake = Self {
            board: t.board,
            cell: t.cell,
            body: VecDeque::from([IVec2::new(center, center)]),
            heading: None,
            next: None,
            food: IVec2::ZERO,
        };
        // A single segment never fills the board
        if let Some(food) = snake.place_food(rng, t.food_attempts) {
            snake.food = food;
        }
        snake
    }

    pub fn head(&self) -> IVec2 {
        self.body[0]
    }

    fn cells_per_side(&self) -> i32 {
        self.board / self.cell
    }

    /// Queue a turn unless it reverses the current heading
    pub fn steer(&mut self, direction: Direction) -> bool {
        if self.heading.is_some_and(|h| h == direction.opposite()) {
            return false;
        }
        self.next = Some(direction);
        true
    }

    /// Pick a free cell: random tries first, then the first free cell in
    /// row-major order. `None` when the body covers the whole board.
    pub fn place_food(&self, rng: &mut Pcg32, attempts: u32) -> Option<IVec2> {
        let n = self.cells_per_side();
        for _ in 0..attempts {
            let candidate = IVec2::new(rng.random_range(0..n), rng.random_range(0..n)) * self.cell;
            if !self.body.contains(&candidate) {
                return Some(candidate);
            }
        }
        (0..n)
            .flat_map(|y| (0..n).map(move |x| IVec2::new(x, y)))
            .map(|c| c * self.cell)
            .find(|c| !self.body.contains(c))
    }
}

/// Move one cell in the current heading
pub fn step(s: &mut SnakeState, ctx: &mut StepContext, input: &TickInput, t: &SnakeTuning) {
    for direction in input.commands.iter().copied().filter_map(Direction::from_command) {
        s.steer(direction);
    }

    let Some(direction) = s.next else {
        return;
    };
    s.heading = Some(direction);

    let delta = direction.delta() * s.cell;
    let head = s.head();
    let new_head = IVec2::new(
        wrap_advance(head.x, delta.x, s.board),
        wrap_advance(head.y, delta.y, s.board),
    );

    let eating = new_head == s.food;
    // The tail leaves before the head arrives
    let tail = if eating { None } else { s.body.pop_back() };
    if s.body.contains(&new_head) {
        // Keep the body intact for the final frame
        if let Some(tail) = tail {
            s.body.push_back(tail);
        }
        ctx.emit(GameEvent::Collided);
        ctx.finish(GamePhase::Lost);
        return;
    }
    s.body.push_front(new_head);

    if eating {
        ctx.emit(GameEvent::FoodEaten);
        ctx.add_score(t.food_points);
        match s.place_food(ctx.rng, t.food_attempts) {
            Some(food) => s.food = food,
            None => ctx.finish(GamePhase::Won),
        }
    }
}
