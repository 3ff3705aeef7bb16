//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Frame callbacks and interval timers
//! - Input listener registration
//! - Drawing and the end-of-game overlay
//! - Storage (LocalStorage on web)

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod web;

use crate::error::HostError;
use crate::highscores::KeyValueStore;
use crate::input::{EventKind, ListenTarget};
use crate::overlay::Overlay;
use crate::sim::state::{GameKind, GameState};

pub use headless::HeadlessHost;

/// Pending frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u32);

/// Repeating timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u32);

/// Attached event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub u32);

/// Everything a session needs from its environment.
///
/// Calls happen on one thread, between host callbacks; nothing here may
/// re-enter the session.
pub trait Host {
    /// Schedule one display-refresh callback
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);

    fn start_interval(&mut self, ms: u32) -> TimerHandle;
    fn cancel_interval(&mut self, handle: TimerHandle);

    fn listen(&mut self, target: ListenTarget, kind: EventKind) -> Result<ListenerHandle, HostError>;
    fn unlisten(&mut self, handle: ListenerHandle);

    fn render(&mut self, state: &GameState) -> Result<(), HostError>;

    fn show_overlay(&mut self, overlay: &Overlay);
    fn clear_overlay(&mut self, game: GameKind);

    fn store(&mut self) -> &mut dyn KeyValueStore;
}

/// Listeners owned by one session; released together
#[derive(Debug, Default)]
pub struct ListenerSet {
    handles: Vec<ListenerHandle>,
}

impl ListenerSet {
    /// Attach every listener in `wanted`. On failure, the ones already
    /// attached are released again.
    pub fn acquire(
        &mut self,
        host: &mut dyn Host,
        wanted: &[(ListenTarget, EventKind)],
    ) -> Result<(), HostError> {
        for &(target, kind) in wanted {
            match host.listen(target, kind) {
                Ok(handle) => self.handles.push(handle),
                Err(e) => {
                    self.release_all(host);
                    return Err(e);
                }
            }
        }
        log::debug!("attached {} listeners", self.handles.len());
        Ok(())
    }

    /// Detach everything; safe to call when empty
    pub fn release_all(&mut self, host: &mut dyn Host) {
        if self.handles.is_empty() {
            return;
        }
        log::debug!("detaching {} listeners", self.handles.len());
        for handle in self.handles.drain(..) {
            host.unlisten(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            log::warn!("{} listeners dropped without release", self.handles.len());
        }
    }
}
