//! Headless host
//!
//! Records what a session asked for instead of doing it, and lets callers
//! fire frames, timers and events by hand. Used by tests and the native demo.

use crate::error::HostError;
use crate::highscores::{KeyValueStore, MemoryStore};
use crate::input::{EventKind, ListenTarget, RawEvent};
use crate::overlay::Overlay;
use crate::session::Session;
use crate::sim::state::{GameKind, GameState};

use super::{FrameHandle, Host, ListenerHandle, TimerHandle};

#[derive(Debug, Default)]
pub struct HeadlessHost {
    next_id: u32,
    frame: Option<FrameHandle>,
    interval: Option<(TimerHandle, u32)>,
    listeners: Vec<(ListenerHandle, ListenTarget, EventKind)>,
    overlays: Vec<Overlay>,
    overlays_shown: usize,
    renders: usize,
    render_failure: Option<String>,
    listen_failure: Option<EventKind>,
    store: MemoryStore,
}

impl HeadlessHost {
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store,
            ..Default::default()
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.frame
    }

    /// Active repeating timer and its period
    pub fn interval(&self) -> Option<(TimerHandle, u32)> {
        self.interval
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_listening(&self, target: ListenTarget, kind: EventKind) -> bool {
        self.listeners.iter().any(|&(_, t, k)| t == target && k == kind)
    }

    /// Top-most visible overlay
    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlays.last()
    }

    pub fn visible_overlays(&self) -> usize {
        self.overlays.len()
    }

    /// Overlays shown since creation
    pub fn overlays_shown(&self) -> usize {
        self.overlays_shown
    }

    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Make every following `render` fail (or succeed again with `None`)
    pub fn fail_render(&mut self, message: Option<&str>) {
        self.render_failure = message.map(str::to_string);
    }

    /// Make attaching a listener of `kind` fail
    pub fn fail_listen_on(&mut self, kind: EventKind) {
        self.listen_failure = Some(kind);
    }

    pub fn memory_store(&self) -> &MemoryStore {
        &self.store
    }

    /// Fire the pending frame callback, if any
    pub fn pump_frame(&mut self, session: &mut Session, now_ms: f64) -> bool {
        match self.frame.take() {
            Some(handle) => {
                session.on_frame(self, handle, now_ms);
                true
            }
            None => false,
        }
    }

    /// Fire the repeating timer once, if one is running
    pub fn pump_interval(&mut self, session: &mut Session) -> bool {
        match self.interval {
            Some((handle, _)) => {
                session.on_interval(self, handle);
                true
            }
            None => false,
        }
    }

    /// Deliver an event the way a browser would: only to attached listeners
    pub fn dispatch(&mut self, session: &mut Session, event: &RawEvent) -> bool {
        let kind = event.kind();
        if !self.listeners.iter().any(|&(_, _, k)| k == kind) {
            return false;
        }
        session.handle_event(self, event)
    }
}

impl Host for HeadlessHost {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id());
        self.frame = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.frame == Some(handle) {
            self.frame = None;
        }
    }

    fn start_interval(&mut self, ms: u32) -> TimerHandle {
        let handle = TimerHandle(self.next_id());
        self.interval = Some((handle, ms));
        handle
    }

    fn cancel_interval(&mut self, handle: TimerHandle) {
        if self.interval.is_some_and(|(h, _)| h == handle) {
            self.interval = None;
        }
    }

    fn listen(&mut self, target: ListenTarget, kind: EventKind) -> Result<ListenerHandle, HostError> {
        if self.listen_failure == Some(kind) {
            return Err(HostError::MissingElement(format!("{target:?} for {}", kind.dom_name())));
        }
        let handle = ListenerHandle(self.next_id());
        self.listeners.push((handle, target, kind));
        Ok(handle)
    }

    fn unlisten(&mut self, handle: ListenerHandle) {
        self.listeners.retain(|&(h, _, _)| h != handle);
    }

    fn render(&mut self, _state: &GameState) -> Result<(), HostError> {
        if let Some(message) = &self.render_failure {
            return Err(HostError::Render(message.clone()));
        }
        self.renders += 1;
        Ok(())
    }

    fn show_overlay(&mut self, overlay: &Overlay) {
        self.overlays.push(overlay.clone());
        self.overlays_shown += 1;
    }

    fn clear_overlay(&mut self, game: GameKind) {
        self.overlays.retain(|o| o.game != game);
    }

    fn store(&mut self) -> &mut dyn KeyValueStore {
        &mut self.store
    }
}
