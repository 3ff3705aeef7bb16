//! Input normalization
//!
//! Turns raw keyboard, mouse and touch events into the small command set the
//! simulation understands. Every handler except key release and resize is
//! gated on the game's modal being the visible one.

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec2;

use crate::settings::InputTuning;
use crate::sim::state::GameKind;
use crate::sim::tick::{HeldDirections, InputCommand, TickInput};

/// Keyboard key, reduced to what the games care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Space,
    Enter,
    Escape,
    Char(char),
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_dom(key: &str) -> Self {
        match key {
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            " " | "Spacebar" => Key::Space,
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                    _ => Key::Other,
                }
            }
        }
    }

    /// Command for this key (arrows, WASD, Space/Enter)
    pub fn command(&self) -> Option<InputCommand> {
        match self {
            Key::ArrowUp | Key::Char('w') => Some(InputCommand::Up),
            Key::ArrowDown | Key::Char('s') => Some(InputCommand::Down),
            Key::ArrowLeft | Key::Char('a') => Some(InputCommand::Left),
            Key::ArrowRight | Key::Char('d') => Some(InputCommand::Right),
            Key::Space | Key::Enter => Some(InputCommand::Action),
            _ => None,
        }
    }

    pub fn is_pause(&self) -> bool {
        matches!(self, Key::Escape | Key::Char('p'))
    }
}

/// Host event, already converted to canvas-local logical coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    KeyDown(Key),
    KeyUp(Key),
    PointerDown(Vec2),
    PointerMove(Vec2),
    /// Active touch points
    TouchStart(Vec<Vec2>),
    TouchMove(Vec<Vec2>),
    /// Touch points that just lifted
    TouchEnd(Vec<Vec2>),
    Resize { container_width: f32 },
}

impl RawEvent {
    /// Listener kind that delivers this event
    pub fn kind(&self) -> EventKind {
        match self {
            RawEvent::KeyDown(_) => EventKind::KeyDown,
            RawEvent::KeyUp(_) => EventKind::KeyUp,
            RawEvent::PointerDown(_) => EventKind::PointerDown,
            RawEvent::PointerMove(_) => EventKind::PointerMove,
            RawEvent::TouchStart(_) => EventKind::TouchStart,
            RawEvent::TouchMove(_) => EventKind::TouchMove,
            RawEvent::TouchEnd(_) => EventKind::TouchEnd,
            RawEvent::Resize { .. } => EventKind::Resize,
        }
    }
}

/// "Is this game's modal the visible one?"
pub trait ModalGuard {
    fn is_active(&self, game: GameKind) -> bool;
}

impl<F: Fn(GameKind) -> bool> ModalGuard for F {
    fn is_active(&self, game: GameKind) -> bool {
        self(game)
    }
}

/// Shared "which modal is open" flag, written by the navigation shell
#[derive(Debug, Clone, Default)]
pub struct ActiveModal(Rc<Cell<Option<GameKind>>>);

impl ActiveModal {
    pub fn open(&self, game: GameKind) {
        self.0.set(Some(game));
    }

    pub fn close(&self) {
        self.0.set(None);
    }

    pub fn current(&self) -> Option<GameKind> {
        self.0.get()
    }
}

impl ModalGuard for ActiveModal {
    fn is_active(&self, game: GameKind) -> bool {
        self.current() == Some(game)
    }
}

/// Where a listener is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenTarget {
    Window,
    Document,
    Canvas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyDown,
    KeyUp,
    PointerDown,
    PointerMove,
    TouchStart,
    TouchMove,
    TouchEnd,
    Resize,
}

impl EventKind {
    pub fn dom_name(&self) -> &'static str {
        match self {
            EventKind::KeyDown => "keydown",
            EventKind::KeyUp => "keyup",
            EventKind::PointerDown => "mousedown",
            EventKind::PointerMove => "mousemove",
            EventKind::TouchStart => "touchstart",
            EventKind::TouchMove => "touchmove",
            EventKind::TouchEnd => "touchend",
            EventKind::Resize => "resize",
        }
    }
}

/// How directional keys are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Queue one command per press
    OneShot,
    /// Directions are held between keydown and keyup; Action is still queued
    Held,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchMode {
    /// Classify start -> end displacement
    Swipe,
    /// Any touch start is Action
    Tap,
    /// First touch point drives `pointer_x`
    Track,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMode {
    Ignore,
    /// Any press is Action
    Action,
    /// Press position is reported as `pointer_down`
    Select,
}

/// Per-game input wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputProfile {
    pub keys: KeyMode,
    pub touch: TouchMode,
    pub pointer_down: PointerMode,
    /// Mouse movement drives `pointer_x`
    pub track_pointer: bool,
    pub allow_pause: bool,
    /// Every listener the game needs; all of them are released on cleanup
    pub listeners: &'static [(ListenTarget, EventKind)],
}

impl InputProfile {
    pub fn for_game(game: GameKind) -> Self {
        use self::EventKind::*;
        use self::ListenTarget::*;

        match game {
            GameKind::Runner => Self {
                keys: KeyMode::OneShot,
                touch: TouchMode::Swipe,
                pointer_down: PointerMode::Ignore,
                track_pointer: false,
                allow_pause: false,
                listeners: &[
                    (Document, KeyDown),
                    (Canvas, TouchStart),
                    (Canvas, TouchEnd),
                    (Window, Resize),
                ],
            },
            GameKind::Flappy => Self {
                keys: KeyMode::OneShot,
                touch: TouchMode::Tap,
                pointer_down: PointerMode::Action,
                track_pointer: false,
                allow_pause: false,
                listeners: &[
                    (Document, KeyDown),
                    (Canvas, TouchStart),
                    (Canvas, PointerDown),
                ],
            },
            GameKind::Breakout => Self {
                keys: KeyMode::Held,
                touch: TouchMode::Track,
                pointer_down: PointerMode::Ignore,
                track_pointer: true,
                allow_pause: true,
                listeners: &[
                    (Document, KeyDown),
                    (Document, KeyUp),
                    (Canvas, PointerMove),
                    (Canvas, TouchStart),
                    (Canvas, TouchMove),
                ],
            },
            GameKind::Snake => Self {
                keys: KeyMode::OneShot,
                touch: TouchMode::Swipe,
                pointer_down: PointerMode::Ignore,
                track_pointer: false,
                allow_pause: true,
                listeners: &[(Document, KeyDown), (Canvas, TouchStart), (Canvas, TouchEnd)],
            },
            GameKind::Merge => Self {
                keys: KeyMode::OneShot,
                touch: TouchMode::Swipe,
                pointer_down: PointerMode::Ignore,
                track_pointer: false,
                allow_pause: false,
                listeners: &[(Document, KeyDown), (Canvas, TouchStart), (Canvas, TouchEnd)],
            },
            GameKind::TicTacToe => Self {
                keys: KeyMode::Ignore,
                touch: TouchMode::Ignore,
                pointer_down: PointerMode::Select,
                track_pointer: false,
                allow_pause: false,
                listeners: &[(Canvas, PointerDown)],
            },
        }
    }
}

/// Classify a touch from `start` to `end`.
///
/// The dominant axis wins if it moved further than `threshold`; anything
/// shorter is a tap (Action).
pub fn classify_swipe(start: Vec2, end: Vec2, threshold: f32) -> InputCommand {
    let d = end - start;
    let (ax, ay) = (d.x.abs(), d.y.abs());
    if ax.max(ay) <= threshold {
        return InputCommand::Action;
    }
    if ay > ax {
        if d.y < 0.0 { InputCommand::Up } else { InputCommand::Down }
    } else if d.x < 0.0 {
        InputCommand::Left
    } else {
        InputCommand::Right
    }
}

/// Accumulates input between ticks for one game
pub struct InputNormalizer {
    game: GameKind,
    profile: InputProfile,
    guard: Box<dyn ModalGuard>,
    swipe_threshold: f32,
    max_queued: usize,

    commands: Vec<InputCommand>,
    held: HeldDirections,
    pointer_x: Option<f32>,
    pointer_down: Option<Vec2>,
    pause: bool,
    touch_start: Option<Vec2>,
}

impl InputNormalizer {
    pub fn new(game: GameKind, guard: Box<dyn ModalGuard>, tuning: &InputTuning) -> Self {
        Self {
            game,
            profile: InputProfile::for_game(game),
            guard,
            swipe_threshold: tuning.swipe_threshold,
            max_queued: tuning.max_queued,
            commands: Vec::new(),
            held: HeldDirections::default(),
            pointer_x: None,
            pointer_down: None,
            pause: false,
            touch_start: None,
        }
    }

    pub fn profile(&self) -> &InputProfile {
        &self.profile
    }

    pub fn modal_active(&self) -> bool {
        self.guard.is_active(self.game)
    }

    fn push(&mut self, command: InputCommand) -> bool {
        if command == InputCommand::None {
            return false;
        }
        if self.commands.len() >= self.max_queued {
            log::debug!("{}: input queue full, dropping {:?}", self.game.as_str(), command);
            return false;
        }
        self.commands.push(command);
        true
    }

    /// Feed one host event. Returns whether it produced any input.
    pub fn handle(&mut self, event: &RawEvent) -> bool {
        match event {
            // Releases only clear state, so they are never gated
            RawEvent::KeyUp(key) => self.key_up(*key),
            RawEvent::Resize { .. } => false,
            _ if !self.modal_active() => false,
            RawEvent::KeyDown(key) => self.key_down(*key),
            RawEvent::PointerDown(pos) => match self.profile.pointer_down {
                PointerMode::Ignore => false,
                PointerMode::Action => self.push(InputCommand::Action),
                PointerMode::Select => {
                    self.pointer_down = Some(*pos);
                    true
                }
            },
            RawEvent::PointerMove(pos) => {
                if self.profile.track_pointer {
                    self.pointer_x = Some(pos.x);
                    true
                } else {
                    false
                }
            }
            RawEvent::TouchStart(points) => {
                let Some(&first) = points.first() else {
                    return false;
                };
                match self.profile.touch {
                    TouchMode::Swipe => {
                        self.touch_start = Some(first);
                        false
                    }
                    TouchMode::Tap => self.push(InputCommand::Action),
                    TouchMode::Track => {
                        self.pointer_x = Some(first.x);
                        true
                    }
                    TouchMode::Ignore => false,
                }
            }
            RawEvent::TouchMove(points) => match (self.profile.touch, points.first()) {
                (TouchMode::Track, Some(first)) => {
                    self.pointer_x = Some(first.x);
                    true
                }
                _ => false,
            },
            RawEvent::TouchEnd(points) => {
                if self.profile.touch != TouchMode::Swipe {
                    return false;
                }
                let Some(&end) = points.first() else {
                    return false;
                };
                let Some(start) = self.touch_start.take() else {
                    return false;
                };
                self.push(classify_swipe(start, end, self.swipe_threshold))
            }
        }
    }

    fn key_down(&mut self, key: Key) -> bool {
        if key.is_pause() {
            if !self.profile.allow_pause {
                return false;
            }
            self.pause = !self.pause;
            return true;
        }
        let Some(command) = key.command() else {
            return false;
        };
        match self.profile.keys {
            KeyMode::Ignore => false,
            KeyMode::OneShot => self.push(command),
            KeyMode::Held if command.is_directional() => {
                self.held.set(command, true);
                true
            }
            KeyMode::Held => self.push(command),
        }
    }

    fn key_up(&mut self, key: Key) -> bool {
        if self.profile.keys != KeyMode::Held {
            return false;
        }
        match key.command() {
            Some(command) if command.is_directional() => {
                self.held.set(command, false);
                true
            }
            _ => false,
        }
    }

    /// Everything gathered since the last call. Held directions carry over.
    pub fn take_tick_input(&mut self) -> TickInput {
        TickInput {
            commands: std::mem::take(&mut self.commands),
            held: self.held,
            pointer_x: self.pointer_x.take(),
            pointer_down: self.pointer_down.take(),
            pause: std::mem::take(&mut self.pause),
        }
    }

    /// Drop all pending and held input (restart, cleanup)
    pub fn reset(&mut self) {
        self.commands.clear();
        self.held = HeldDirections::default();
        self.pointer_x = None;
        self.pointer_down = None;
        self.pause = false;
        self.touch_start = None;
    }
}

impl std::fmt::Debug for InputNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputNormalizer")
            .field("game", &self.game)
            .field("commands", &self.commands)
            .field("held", &self.held)
            .field("pause", &self.pause)
            .finish_non_exhaustive()
    }
}
