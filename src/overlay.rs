//! End-of-game overlay
//!
//! One overlay per terminal state, with exactly one action that fully
//! reinitializes the game. Presenting a new overlay replaces the old one.

use crate::error::GameError;
use crate::platform::Host;
use crate::sim::state::{GameKind, GamePhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Won,
    Lost,
    Drawn,
    Crashed,
}

impl OverlayKind {
    pub fn from_phase(phase: GamePhase) -> Option<Self> {
        match phase {
            GamePhase::Won => Some(OverlayKind::Won),
            GamePhase::Lost => Some(OverlayKind::Lost),
            GamePhase::Drawn => Some(OverlayKind::Drawn),
            GamePhase::Crashed => Some(OverlayKind::Crashed),
            GamePhase::Idle | GamePhase::Running | GamePhase::Paused => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub game: GameKind,
    pub kind: OverlayKind,
    pub title: String,
    /// Extra line: error message on crash, tallies for tic-tac-toe
    pub detail: Option<String>,
    pub score: u64,
    pub best: Option<u64>,
    pub new_best: bool,
    /// Label of the single recovery button
    pub action: &'static str,
}

impl Overlay {
    /// Overlay for a normal terminal phase; `None` for non-terminal phases
    pub fn finished(game: GameKind, phase: GamePhase, score: u64, best: Option<u64>) -> Option<Self> {
        let kind = OverlayKind::from_phase(phase)?;
        let title = match (kind, game) {
            (OverlayKind::Won, _) => "You Win!",
            (OverlayKind::Lost, GameKind::TicTacToe) => "AI Wins!",
            (OverlayKind::Lost, _) => "Game Over!",
            (OverlayKind::Drawn, _) => "It's a Tie!",
            (OverlayKind::Crashed, _) => "Oops! Crash",
        };
        Some(Self {
            game,
            kind,
            title: title.to_string(),
            detail: None,
            score,
            best,
            new_best: false,
            action: if kind == OverlayKind::Crashed { "Restart" } else { "Play Again" },
        })
    }

    pub fn crashed(game: GameKind, error: &GameError, score: u64) -> Self {
        Self {
            game,
            kind: OverlayKind::Crashed,
            title: "Oops! Crash".to_string(),
            detail: Some(error.to_string()),
            score,
            best: None,
            new_best: false,
            action: "Restart",
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_new_best(mut self, new_best: bool) -> Self {
        self.new_best = new_best;
        self
    }

    /// "Score: 12 | Best: 40"
    pub fn summary(&self) -> String {
        match self.best {
            Some(best) => format!("Score: {} | Best: {}", self.score, best),
            None => format!("Score: {}", self.score),
        }
    }
}

/// Shows at most one overlay at a time
#[derive(Debug, Default)]
pub struct OverlayPresenter {
    current: Option<Overlay>,
    presented: usize,
}

impl OverlayPresenter {
    pub fn present(&mut self, host: &mut dyn Host, overlay: Overlay) {
        if let Some(old) = self.current.take() {
            host.clear_overlay(old.game);
        }
        log::info!("{}: {}", overlay.game.as_str(), overlay.title);
        host.show_overlay(&overlay);
        self.current = Some(overlay);
        self.presented += 1;
    }

    pub fn dismiss(&mut self, host: &mut dyn Host) {
        if let Some(old) = self.current.take() {
            host.clear_overlay(old.game);
        }
    }

    pub fn current(&self) -> Option<&Overlay> {
        self.current.as_ref()
    }

    /// Overlays presented over the presenter's lifetime
    pub fn presented(&self) -> usize {
        self.presented
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::platform::headless::HeadlessHost;

    #[test]
    fn test_titles() {
        let lost = Overlay::finished(GameKind::Flappy, GamePhase::Lost, 3, Some(9)).unwrap();
        assert_eq!(lost.title, "Game Over!");
        assert_eq!(lost.action, "Play Again");
        assert_eq!(lost.summary(), "Score: 3 | Best: 9");

        let ai = Overlay::finished(GameKind::TicTacToe, GamePhase::Lost, 0, None).unwrap();
        assert_eq!(ai.title, "AI Wins!");
        assert_eq!(ai.summary(), "Score: 0");

        let tie = Overlay::finished(GameKind::TicTacToe, GamePhase::Drawn, 0, None).unwrap();
        assert_eq!(tie.title, "It's a Tie!");

        assert!(Overlay::finished(GameKind::Snake, GamePhase::Running, 0, None).is_none());
    }

    #[test]
    fn test_crash_overlay() {
        let err = GameError::from(HostError::MissingContext);
        let overlay = Overlay::crashed(GameKind::Runner, &err, 42);
        assert_eq!(overlay.title, "Oops! Crash");
        assert_eq!(overlay.action, "Restart");
        assert_eq!(overlay.detail.as_deref(), Some(err.to_string().as_str()));
    }

    #[test]
    fn test_present_replaces_previous() {
        let mut host = HeadlessHost::default();
        let mut presenter = OverlayPresenter::default();

        let first = Overlay::finished(GameKind::Snake, GamePhase::Lost, 1, None).unwrap();
        presenter.present(&mut host, first);
        let second = Overlay::finished(GameKind::Snake, GamePhase::Won, 2, None).unwrap();
        presenter.present(&mut host, second);

        assert_eq!(host.visible_overlays(), 1);
        assert_eq!(host.overlay().map(|o| o.kind), Some(OverlayKind::Won));

        presenter.dismiss(&mut host);
        assert_eq!(host.visible_overlays(), 0);
        // Dismissing twice is harmless
        presenter.dismiss(&mut host);
        assert_eq!(presenter.presented(), 2);
    }
}
