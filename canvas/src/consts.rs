//! Shared constants for the canvas crate.

// ── Strokes ─────────────────────────────────────────────────────

/// Reserved color value that selects subtractive compositing.
pub const ERASER: &str = "ERASER";

/// Eraser strokes are stored at this multiple of the selected brush width.
pub const ERASER_WIDTH_FACTOR: f64 = 2.0;

/// A committed stroke needs at least this many points.
pub const MIN_STROKE_POINTS: usize = 2;

/// Brush color before the user picks one.
pub const DEFAULT_COLOR: &str = "#000000";

/// Brush width before the user picks one.
pub const DEFAULT_WIDTH: f64 = 2.0;

// ── Raster ──────────────────────────────────────────────────────

pub const DEFAULT_CANVAS_WIDTH: u32 = 1200;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 800;

/// JPEG quality used by raster export.
pub const JPEG_QUALITY: u8 = 90;

// ── Presence ────────────────────────────────────────────────────

/// Minimum spacing between accepted cursor samples, in milliseconds.
pub const CURSOR_THROTTLE_MS: u64 = 50;

/// Quiet period after the last accepted sample before it is sent, in milliseconds.
pub const CURSOR_DEBOUNCE_MS: u64 = 100;

/// Cursor rows older than this are swept, in seconds.
pub const CURSOR_STALE_SECS: u64 = 300;

/// Display colors for remote participants.
pub const CURSOR_PALETTE: [&str; 15] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#FF9FF3", "#54A0FF", "#5F27CD", "#00D2D3",
    "#FF9F43", "#F8B500", "#6C5CE7", "#A29BFE", "#FD79A8", "#00B894",
];
