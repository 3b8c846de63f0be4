//! Cursor presence: the cursor record, the send throttle and identity colors.
//!
//! [`CursorThrottle`] is a pure state machine driven by caller-supplied
//! instants. Moves closer than the minimum interval to the last accepted one
//! are dropped outright. An accepted move (re)arms a debounce deadline; the
//! position becomes sendable once that deadline passes with no newer accept.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::consts::{CURSOR_DEBOUNCE_MS, CURSOR_PALETTE, CURSOR_THROTTLE_MS};
use crate::stroke::Point;

/// One participant's pointer in a room. Unique per `(room_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub room_id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub x: f64,
    pub y: f64,
    /// Last refresh, milliseconds since the Unix epoch.
    pub updated_at: i64,
}

impl Cursor {
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn color(&self) -> &'static str {
        cursor_color(&self.user_id)
    }
}

/// Palette color for a participant, stable across sessions and clients.
#[must_use]
pub fn cursor_color(user_id: &str) -> &'static str {
    let digest = Sha256::digest(user_id.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let n = u64::from_be_bytes(head);
    let len = CURSOR_PALETTE.len() as u64;
    // Remainder is below the palette length.
    #[allow(clippy::cast_possible_truncation)]
    let index = (n % len) as usize;
    CURSOR_PALETTE[index]
}

/// On-screen placement of the canvas, for converting pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
}

impl CanvasRect {
    #[must_use]
    pub fn to_local(self, client_x: f64, client_y: f64) -> Point {
        Point::new(client_x - self.left, client_y - self.top)
    }
}

#[derive(Debug, Clone)]
pub struct CursorThrottle {
    min_interval: Duration,
    debounce: Duration,
    last_accepted: Option<Instant>,
    pending: Option<(Point, Instant)>,
}

impl Default for CursorThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(CURSOR_THROTTLE_MS), Duration::from_millis(CURSOR_DEBOUNCE_MS))
    }
}

impl CursorThrottle {
    #[must_use]
    pub fn new(min_interval: Duration, debounce: Duration) -> Self {
        Self { min_interval, debounce, last_accepted: None, pending: None }
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Offer a pointer sample. Returns `true` if it was accepted, in which
    /// case the debounce deadline restarts from `now`.
    pub fn on_move(&mut self, pos: Point, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_accepted = Some(now);
        self.pending = Some((pos, now + self.debounce));
        true
    }

    /// When the pending position becomes sendable, if one is waiting.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, at)| at)
    }

    /// Take the pending position if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Point> {
        match self.pending {
            Some((pos, at)) if now >= at => {
                self.pending = None;
                Some(pos)
            }
            _ => None,
        }
    }

    /// Drop any pending send. The throttle window is kept.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}
