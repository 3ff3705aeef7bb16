//! 2048
//!
//! Tiles slide as far as they can; equal neighbours merge once per move.
//! The board is row-major, `size * size` cells, 0 meaning empty.

use rand::Rng;
use rand_pcg::Pcg32;

use super::state::{GameEvent, GamePhase, StepContext};
use super::tick::{InputCommand, TickInput};
use crate::settings::MergeTuning;

/// Compact `line` toward index 0 and merge equal pairs.
///
/// Returns the new line (same length) and the value of every merged tile.
/// A tile produced by a merge does not merge again in the same call.
pub fn slide_line(line: &[u32]) -> (Vec<u32>, Vec<u32>) {
    let tiles: Vec<u32> = line.iter().copied().filter(|&v| v != 0).collect();
    let mut out = Vec::with_capacity(line.len());
    let mut merged = Vec::new();

    let mut i = 0;
    while i < tiles.len() {
        if i + 1 < tiles.len() && tiles[i] == tiles[i + 1] {
            let value = tiles[i] * 2;
            out.push(value);
            merged.push(value);
            i += 2;
        } else {
            out.push(tiles[i]);
            i += 1;
        }
    }
    out.resize(line.len(), 0);
    (out, merged)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDir {
    Up,
    Down,
    Left,
    Right,
}

impl MoveDir {
    pub fn from_command(command: InputCommand) -> Option<Self> {
        match command {
            InputCommand::Up => Some(MoveDir::Up),
            InputCommand::Down => Some(MoveDir::Down),
            InputCommand::Left => Some(MoveDir::Left),
            InputCommand::Right => Some(MoveDir::Right),
            InputCommand::Action | InputCommand::None => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved: bool,
    pub merged: Vec<u32>,
}

impl MoveOutcome {
    pub fn points(&self) -> u64 {
        self.merged.iter().map(|&v| v as u64).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeState {
    pub size: usize,
    pub cells: Vec<u32>,
}

impl MergeState {
    /// Empty board plus two random tiles
    pub fn new(t: &MergeTuning, rng: &mut Pcg32) -> Self {
        let mut state = Self::empty(t.size);
        state.add_random_tile(rng, t.two_chance);
        state.add_random_tile(rng, t.two_chance);
        state
    }

    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![0; size * size],
        }
    }

    pub fn from_rows(rows: &[&[u32]]) -> Self {
        let size = rows.len();
        Self {
            size,
            cells: rows.iter().flat_map(|r| r.iter().copied()).collect(),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row * self.size + col]
    }

    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Cell indices of one line, ordered in the direction tiles travel to
    fn line_indices(&self, dir: MoveDir, line: usize) -> Vec<usize> {
        let n = self.size;
        match dir {
            MoveDir::Left => (0..n).map(|c| line * n + c).collect(),
            MoveDir::Right => (0..n).rev().map(|c| line * n + c).collect(),
            MoveDir::Up => (0..n).map(|r| r * n + line).collect(),
            MoveDir::Down => (0..n).rev().map(|r| r * n + line).collect(),
        }
    }

    /// Slide every row or column toward `dir`
    pub fn apply_move(&mut self, dir: MoveDir) -> MoveOutcome {
        let mut outcome = MoveOutcome::default();
        for line in 0..self.size {
            let indices = self.line_indices(dir, line);
            let values: Vec<u32> = indices.iter().map(|&i| self.cells[i]).collect();
            let (slid, merged) = slide_line(&values);
            if slid != values {
                outcome.moved = true;
            }
            for (&i, v) in indices.iter().zip(slid) {
                self.cells[i] = v;
            }
            outcome.merged.extend(merged);
        }
        outcome
    }

    /// Put a 2 (or sometimes a 4) in a random empty cell
    pub fn add_random_tile(&mut self, rng: &mut Pcg32, two_chance: f64) -> bool {
        let empty: Vec<usize> = (0..self.cells.len()).filter(|&i| self.cells[i] == 0).collect();
        if empty.is_empty() {
            return false;
        }
        let cell = empty[rng.random_range(0..empty.len())];
        self.cells[cell] = if rng.random_bool(two_chance) { 2 } else { 4 };
        true
    }

    /// Any empty cell or any equal orthogonal neighbours
    pub fn has_moves(&self) -> bool {
        let n = self.size;
        if self.cells.contains(&0) {
            return true;
        }
        (0..n).any(|r| {
            (0..n).any(|c| {
                let v = self.get(r, c);
                (c + 1 < n && self.get(r, c + 1) == v) || (r + 1 < n && self.get(r + 1, c) == v)
            })
        })
    }
}

/// Apply queued moves; a move that changes nothing adds no tile
pub fn step(m: &mut MergeState, ctx: &mut StepContext, input: &TickInput, t: &MergeTuning) {
    for dir in input.commands.iter().copied().filter_map(MoveDir::from_command) {
        if !ctx.is_running() {
            break;
        }
        let outcome = m.apply_move(dir);
        if !outcome.moved {
            continue;
        }
        for &value in &outcome.merged {
            ctx.emit(GameEvent::Merged { value });
        }
        ctx.add_score(outcome.points());
        m.add_random_tile(ctx.rng, t.two_chance);

        if !m.has_moves() {
            ctx.finish(GamePhase::Lost);
        }
    }
}
