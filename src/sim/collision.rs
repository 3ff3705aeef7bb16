//! Collision helpers for rectangles, circles and grid wraparound
//!
//! All functions are pure; callers decide what a hit means.

use glam::Vec2;

/// Axis-aligned rectangle (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }
}

/// Strict overlap test; touching edges do not count
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    let a_max = a.max();
    let b_max = b.max();
    a.min.x < b_max.x && a_max.x > b.min.x && a.min.y < b_max.y && a_max.y > b.min.y
}

/// Circle against rectangle using the circle's bounding box.
///
/// Coarse on purpose: corner hits register slightly early, matching how the
/// games have always felt.
pub fn circle_rect_overlap(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let max = rect.max();
    center.x + radius > rect.min.x
        && center.x - radius < max.x
        && center.y + radius > rect.min.y
        && center.y - radius < max.y
}

/// Which walls a circle has reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallContact {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

/// Contact with the inside walls of a `width` x `height` box
pub fn wall_contact(center: Vec2, radius: f32, width: f32, height: f32) -> WallContact {
    WallContact {
        left: center.x <= radius,
        right: center.x >= width - radius,
        top: center.y <= radius,
        bottom: center.y >= height - radius,
    }
}

/// Reflect velocity off whichever walls were reached, then pull the
/// position back inside so it is never left past a wall.
pub fn reflect_in_box(pos: &mut Vec2, vel: &mut Vec2, contact: WallContact, radius: f32, width: f32) {
    if contact.left || contact.right {
        vel.x = -vel.x;
        pos.x = pos.x.clamp(radius, width - radius);
    }
    if contact.top {
        vel.y = -vel.y;
        pos.y = pos.y.max(radius);
    }
}

/// Horizontal velocity imparted by a paddle hit.
///
/// `hit_pos` is the normalized offset along the paddle (0 = left edge,
/// 1 = right edge); the centre returns zero.
#[inline]
pub fn paddle_deflection(ball_x: f32, paddle_x: f32, paddle_width: f32, factor: f32) -> f32 {
    let hit_pos = (ball_x - paddle_x) / paddle_width;
    (hit_pos - 0.5) * factor
}

/// Move `pos` by `delta` on a ring of size `bound` (toroidal topology).
///
/// `wrap_advance(380, 20, 400) == 0`, never 400.
#[inline]
pub fn wrap_advance(pos: i32, delta: i32, bound: i32) -> i32 {
    (pos + delta).rem_euclid(bound)
}
