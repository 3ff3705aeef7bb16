//! Tic-tac-toe against a rule-based opponent
//!
//! The player is X and always moves first; O answers within the same step.

use glam::Vec2;

use super::state::{GameEvent, GamePhase, StepContext};
use super::tick::TickInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mark {
    #[default]
    Empty,
    X,
    O,
}

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

const CENTER: usize = 4;
const CORNERS: [usize; 4] = [0, 2, 6, 8];

#[derive(Debug, Clone, PartialEq)]
pub struct TicTacToeState {
    pub board: [Mark; 9],
    /// Edge of the square play area in logical pixels
    pub size: f32,
}

impl Default for TicTacToeState {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToeState {
    pub fn new() -> Self {
        Self {
            board: [Mark::Empty; 9],
            size: 300.0,
        }
    }

    /// Board cell under a point, if any
    pub fn cell_at(&self, point: Vec2) -> Option<usize> {
        if point.x < 0.0 || point.y < 0.0 || point.x >= self.size || point.y >= self.size {
            return None;
        }
        let cell = self.size / 3.0;
        let col = (point.x / cell) as usize;
        let row = (point.y / cell) as usize;
        Some(row * 3 + col)
    }

    pub fn is_full(&self) -> bool {
        !self.board.contains(&Mark::Empty)
    }

    pub fn has_line(&self, mark: Mark) -> bool {
        LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.board[i] == mark))
    }

    fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        (0..9).filter(|&i| self.board[i] == Mark::Empty)
    }

    /// Empty cell that would complete a line for `mark`
    fn completing_cell(&self, mark: Mark) -> Option<usize> {
        self.empty_cells().find(|&i| {
            let mut trial = self.board;
            trial[i] = mark;
            LINES
                .iter()
                .any(|line| line.iter().all(|&j| trial[j] == mark))
        })
    }

    /// O's reply: win, block, centre, first free corner, first free cell
    pub fn ai_choice(&self) -> Option<usize> {
        self.completing_cell(Mark::O)
            .or_else(|| self.completing_cell(Mark::X))
            .or_else(|| (self.board[CENTER] == Mark::Empty).then_some(CENTER))
            .or_else(|| CORNERS.into_iter().find(|&i| self.board[i] == Mark::Empty))
            .or_else(|| self.empty_cells().next())
    }
}

/// Place X at the tapped cell, then let O reply
pub fn step(t: &mut TicTacToeState, ctx: &mut StepContext, input: &TickInput) {
    let Some(cell) = input.pointer_down.and_then(|p| t.cell_at(p)) else {
        return;
    };
    if t.board[cell] != Mark::Empty {
        return;
    }

    t.board[cell] = Mark::X;
    ctx.emit(GameEvent::Placed { cell });
    if t.has_line(Mark::X) {
        ctx.finish(GamePhase::Won);
        return;
    }
    if t.is_full() {
        ctx.finish(GamePhase::Drawn);
        return;
    }

    if let Some(reply) = t.ai_choice() {
        t.board[reply] = Mark::O;
        ctx.emit(GameEvent::Placed { cell: reply });
    }
    if t.has_line(Mark::O) {
        ctx.finish(GamePhase::Lost);
    } else if t.is_full() {
        ctx.finish(GamePhase::Drawn);
    }
}
