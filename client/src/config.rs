//! Client configuration: canvas size, presence pacing, request deadline and
//! the starting brush. Unset or unparseable keys keep their defaults.

use std::time::Duration;

use canvas::consts::{
    CURSOR_DEBOUNCE_MS, CURSOR_THROTTLE_MS, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_COLOR,
    DEFAULT_WIDTH,
};
use canvas::session::Brush;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Minimum spacing between accepted cursor samples.
    pub cursor_throttle: Duration,
    /// Quiet period before the last accepted sample is sent.
    pub cursor_debounce: Duration,
    /// How long a request waits for its reply.
    pub request_timeout: Duration,
    pub brush: Brush,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            cursor_throttle: Duration::from_millis(CURSOR_THROTTLE_MS),
            cursor_debounce: Duration::from_millis(CURSOR_DEBOUNCE_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            brush: Brush::default(),
        }
    }
}

impl ClientConfig {
    /// Build config from the process environment.
    ///
    /// Optional:
    /// - `DRAWROOM_CANVAS_WIDTH` / `DRAWROOM_CANVAS_HEIGHT`: default 1200×800
    /// - `DRAWROOM_CURSOR_THROTTLE_MS`: default 50
    /// - `DRAWROOM_CURSOR_DEBOUNCE_MS`: default 100
    /// - `DRAWROOM_REQUEST_TIMEOUT_MS`: default 10000
    /// - `DRAWROOM_BRUSH_COLOR` / `DRAWROOM_BRUSH_WIDTH`: default `#000000`, 2
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str, default: u64| Duration::from_millis(env_parse(lookup(key), default));
        let color = lookup("DRAWROOM_BRUSH_COLOR")
            .map(|c| c.trim().to_owned())
            .filter(|c| canvas::color::parse_hex_rgb(c).is_some())
            .unwrap_or_else(|| DEFAULT_COLOR.to_owned());
        let width = env_parse(lookup("DRAWROOM_BRUSH_WIDTH"), DEFAULT_WIDTH);

        Self {
            canvas_width: env_parse(lookup("DRAWROOM_CANVAS_WIDTH"), DEFAULT_CANVAS_WIDTH).max(1),
            canvas_height: env_parse(lookup("DRAWROOM_CANVAS_HEIGHT"), DEFAULT_CANVAS_HEIGHT).max(1),
            cursor_throttle: millis("DRAWROOM_CURSOR_THROTTLE_MS", CURSOR_THROTTLE_MS),
            cursor_debounce: millis("DRAWROOM_CURSOR_DEBOUNCE_MS", CURSOR_DEBOUNCE_MS),
            request_timeout: millis("DRAWROOM_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS),
            brush: Brush {
                color,
                width: if width.is_finite() && width > 0.0 { width } else { DEFAULT_WIDTH },
                eraser: false,
            },
        }
    }
}

fn env_parse<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
