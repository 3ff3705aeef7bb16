//! Game session and loop driver
//!
//! A session owns one game's state, input, listeners and loop. The host
//! calls back into it for frames, timer ticks and events; the session never
//! blocks and never re-enters the host from inside a callback.

use crate::error::GameError;
use crate::highscores::{BestScore, TicTacToeTally};
use crate::input::{InputNormalizer, ModalGuard, RawEvent};
use crate::overlay::{Overlay, OverlayPresenter};
use crate::platform::{FrameHandle, Host, ListenerSet, TimerHandle};
use crate::settings::Settings;
use crate::sim::state::{GameKind, GamePhase, GameState, LoopMode, World};
use crate::sim::tick::tick;

/// Schedules ticks according to a game's `LoopMode`
#[derive(Debug)]
pub struct LoopDriver {
    mode: LoopMode,
    frame: Option<FrameHandle>,
    timer: Option<TimerHandle>,
    last_time_ms: Option<f64>,
}

impl LoopDriver {
    /// Idle driver; nothing is scheduled until `start`
    pub fn new(mode: LoopMode) -> Self {
        Self {
            mode,
            frame: None,
            timer: None,
            last_time_ms: None,
        }
    }

    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    /// Schedule the first frame or start the interval timer. Anything
    /// already scheduled is cancelled first.
    pub fn start(&mut self, host: &mut dyn Host) {
        self.stop(host);
        match self.mode {
            LoopMode::Frame => self.frame = Some(host.request_frame()),
            LoopMode::Interval(ms) => self.timer = Some(host.start_interval(ms)),
            LoopMode::OnInput => {}
        }
        log::debug!("loop started ({:?})", self.mode);
    }

    /// Cancel whatever is scheduled; safe to call when already stopped
    pub fn stop(&mut self, host: &mut dyn Host) {
        if let Some(handle) = self.frame.take() {
            host.cancel_frame(handle);
        }
        if let Some(handle) = self.timer.take() {
            host.cancel_interval(handle);
        }
        self.last_time_ms = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.frame.is_some() || self.timer.is_some()
    }

    /// Consume a fired frame; stale or cancelled handles are rejected
    fn accept_frame(&mut self, handle: FrameHandle) -> bool {
        if self.frame == Some(handle) {
            self.frame = None;
            true
        } else {
            false
        }
    }

    fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.timer == Some(handle)
    }

    /// Time since the previous frame; the first frame gets 0
    pub fn frame_delta(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_time_ms {
            Some(last) => (now_ms - last).max(0.0) as f32,
            None => 0.0,
        };
        self.last_time_ms = Some(now_ms);
        dt
    }
}

/// One game's run: state, input, listeners, loop and overlay.
///
/// Phases follow `Idle -> Running -> {Won | Lost | Drawn | Crashed}`, and
/// `init` returns to `Running`. `Crashed` is only entered once `init` has
/// started the run, including when attaching listeners fails.
pub struct Session {
    kind: GameKind,
    settings: Settings,
    seed: u64,
    runs: u64,
    state: GameState,
    input: InputNormalizer,
    listeners: ListenerSet,
    driver: LoopDriver,
    overlay: OverlayPresenter,
    best: Option<BestScore>,
    tally: TicTacToeTally,
}

impl Session {
    pub fn new(kind: GameKind, settings: Settings, guard: Box<dyn ModalGuard>, seed: u64) -> Self {
        let state = GameState::new(kind, &settings, seed);
        let input = InputNormalizer::new(kind, guard, &settings.input);
        let driver = LoopDriver::new(kind.loop_mode(&settings));
        Self {
            kind,
            settings,
            seed,
            runs: 0,
            state,
            input,
            listeners: ListenerSet::default(),
            driver,
            overlay: OverlayPresenter::default(),
            best: None,
            tally: TicTacToeTally::default(),
        }
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access for scripted setups (tests, demos)
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn best(&self) -> Option<u64> {
        self.best.map(|b| b.value)
    }

    pub fn tally(&self) -> TicTacToeTally {
        self.tally
    }

    pub fn overlay(&self) -> &OverlayPresenter {
        &self.overlay
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn loop_scheduled(&self) -> bool {
        self.driver.is_scheduled()
    }

    /// Start a fresh run: tear down anything left from the previous one,
    /// rebuild state, attach listeners and start the loop.
    pub fn init(&mut self, host: &mut dyn Host) -> Result<(), GameError> {
        self.driver.stop(host);
        self.listeners.release_all(host);
        self.overlay.dismiss(host);

        let seed = self.seed.wrapping_add(self.runs);
        self.runs += 1;
        self.state = GameState::new(self.kind, &self.settings, seed);
        self.input.reset();

        self.best = self.kind.best_key().map(|key| BestScore::load(key, host.store()));
        if self.kind == GameKind::TicTacToe {
            self.tally = TicTacToeTally::load(host.store());
        }

        // Running from here on, so a failed attach crashes a running game
        self.state.start();
        if let Err(e) = self.listeners.acquire(host, self.input.profile().listeners) {
            let err = GameError::from(e);
            self.crash(host, err.clone());
            return Err(err);
        }

        self.driver.start(host);
        log::info!("{} started (seed {})", self.kind.as_str(), seed);

        if let Err(e) = host.render(&self.state) {
            let err = GameError::from(e);
            self.crash(host, err.clone());
            return Err(err);
        }
        Ok(())
    }

    /// The overlay's single action
    pub fn restart(&mut self, host: &mut dyn Host) -> Result<(), GameError> {
        self.init(host)
    }

    /// Detach input only; the loop keeps running
    pub fn cleanup_controls(&mut self, host: &mut dyn Host) {
        self.listeners.release_all(host);
        self.input.reset();
    }

    /// Stop everything; no tick fires after this returns. Idempotent.
    pub fn cleanup(&mut self, host: &mut dyn Host) {
        self.driver.stop(host);
        self.cleanup_controls(host);
        if self.state.phase.is_live() {
            self.state.phase = GamePhase::Idle;
        }
        log::info!("{} cleaned up", self.kind.as_str());
    }

    /// Feed one host event. Returns whether it was accepted.
    pub fn handle_event(&mut self, host: &mut dyn Host, event: &RawEvent) -> bool {
        if self.listeners.is_empty() {
            return false;
        }

        if let RawEvent::Resize { container_width } = event {
            return match &mut self.state.world {
                World::Runner(r) => {
                    r.resize(*container_width, &self.settings.runner);
                    if let Err(e) = host.render(&self.state) {
                        self.crash(host, e.into());
                    }
                    true
                }
                _ => false,
            };
        }

        let accepted = self.input.handle(event);
        if accepted && self.driver.mode() == LoopMode::OnInput && self.state.phase.is_live() {
            self.advance(host, 0.0);
        }
        accepted
    }

    /// Display-refresh callback
    pub fn on_frame(&mut self, host: &mut dyn Host, handle: FrameHandle, now_ms: f64) {
        if !self.driver.accept_frame(handle) {
            return;
        }
        let dt = self.driver.frame_delta(now_ms);
        self.advance(host, dt);

        if self.state.phase.is_live() {
            self.driver.frame = Some(host.request_frame());
        }
    }

    /// Repeating-timer callback; the step is always the fixed interval
    pub fn on_interval(&mut self, host: &mut dyn Host, handle: TimerHandle) {
        if !self.driver.owns_timer(handle) {
            return;
        }
        let dt = match self.driver.mode() {
            LoopMode::Interval(ms) => ms as f32,
            _ => 0.0,
        };
        self.advance(host, dt);
    }

    /// One physics step plus one render pass
    fn advance(&mut self, host: &mut dyn Host, dt_ms: f32) {
        let input = self.input.take_tick_input();
        let result = tick(&mut self.state, &input, dt_ms, &self.settings)
            .map_err(GameError::from)
            .and_then(|()| host.render(&self.state).map_err(GameError::from));

        if let Err(e) = result {
            self.crash(host, e);
            return;
        }
        if self.state.phase.is_terminal() && self.overlay.current().is_none() {
            self.finish(host);
        }
    }

    fn finish(&mut self, host: &mut dyn Host) {
        self.driver.stop(host);
        let phase = self.state.phase;
        let score = self.state.score;

        let new_best = match &mut self.best {
            Some(best) => best.submit(score, host.store()),
            None => false,
        };

        let Some(mut overlay) = Overlay::finished(self.kind, phase, score, self.best()) else {
            return;
        };
        if self.kind == GameKind::TicTacToe {
            match phase {
                GamePhase::Won => self.tally.player += 1,
                GamePhase::Lost => self.tally.ai += 1,
                GamePhase::Drawn => self.tally.ties += 1,
                _ => {}
            }
            self.tally.save(host.store());
            overlay = overlay.with_detail(format!(
                "You: {} | AI: {} | Ties: {}",
                self.tally.player, self.tally.ai, self.tally.ties
            ));
        }
        if let World::Merge(m) = &self.state.world {
            overlay = overlay.with_detail(format!("Best tile: {}", m.max_tile()));
        }
        self.overlay.present(host, overlay.with_new_best(new_best));
    }

    fn crash(&mut self, host: &mut dyn Host, error: GameError) {
        log::error!("{} crashed: {}", self.kind.as_str(), error);
        self.state.phase = GamePhase::Crashed;
        self.driver.stop(host);
        self.listeners.release_all(host);
        self.input.reset();
        let overlay = Overlay::crashed(self.kind, &error, self.state.score);
        self.overlay.present(host, overlay);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("phase", &self.state.phase)
            .field("score", &self.state.score)
            .field("runs", &self.runs)
            .finish_non_exhaustive()
    }
}
