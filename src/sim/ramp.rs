//! Difficulty ramp and spawn clock
//!
//! Both only ever move toward their limit; nothing here reads wall time.

use serde::{Deserialize, Serialize};

/// A scalar that steps monotonically toward a clamped limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub value: f32,
    /// Signed increment applied by `bump` (negative ramps down)
    pub step: f32,
    /// Value never passes this bound
    pub limit: f32,
}

impl Ramp {
    pub fn new(value: f32, step: f32, limit: f32) -> Self {
        Self { value, step, limit }
    }

    /// Advance one notch, clamped to the limit
    pub fn bump(&mut self) {
        self.value = if self.step >= 0.0 {
            (self.value + self.step).min(self.limit)
        } else {
            (self.value + self.step).max(self.limit)
        };
    }

    pub fn at_limit(&self) -> bool {
        self.value == self.limit
    }
}

/// Accumulates elapsed milliseconds and fires once the interval is reached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnTimer {
    pub accumulated_ms: f32,
    /// Current interval; tightened by the owner through `interval.bump()`
    pub interval: Ramp,
}

impl SpawnTimer {
    pub fn new(interval: Ramp) -> Self {
        Self {
            accumulated_ms: 0.0,
            interval,
        }
    }

    /// Add `dt_ms` and report whether a spawn is due.
    ///
    /// Firing resets the accumulator to zero (overshoot is discarded), so at
    /// most one spawn happens per call however large `dt_ms` is.
    pub fn advance(&mut self, dt_ms: f32) -> bool {
        self.accumulated_ms += dt_ms;
        if self.accumulated_ms >= self.interval.value {
            self.accumulated_ms = 0.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_clamps_upward() {
        let mut speed = Ramp::new(13.9, 0.15, 14.0);
        speed.bump();
        assert_eq!(speed.value, 14.0);
        speed.bump();
        assert_eq!(speed.value, 14.0);
        assert!(speed.at_limit());
    }

    #[test]
    fn test_ramp_clamps_downward() {
        let mut interval = Ramp::new(530.0, -12.0, 520.0);
        interval.bump();
        assert_eq!(interval.value, 520.0);
    }

    #[test]
    fn test_spawn_timer_fires_once_per_crossing() {
        let mut timer = SpawnTimer::new(Ramp::new(900.0, -12.0, 520.0));
        assert!(!timer.advance(500.0));
        assert!(timer.advance(500.0));
        assert_eq!(timer.accumulated_ms, 0.0);
        assert!(!timer.advance(0.0));
    }

    #[test]
    fn test_spawn_timer_discards_overshoot() {
        let mut timer = SpawnTimer::new(Ramp::new(900.0, 0.0, 900.0));
        assert!(timer.advance(5000.0));
        assert!(!timer.advance(100.0));
    }
}
