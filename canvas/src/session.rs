//! Local drawing session: one pointer path between press and release.
//!
//! Each sample is painted onto the raster as soon as it arrives, with the
//! same ink and width the committed stroke will carry, so the committed
//! replay lands on exactly the pixels already shown.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use crate::consts::{DEFAULT_COLOR, DEFAULT_WIDTH, ERASER_WIDTH_FACTOR, MIN_STROKE_POINTS};
use crate::render::Raster;
use crate::stroke::{Ink, Point, StrokeDraft};

/// The user's current drawing tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub color: String,
    pub width: f64,
    pub eraser: bool,
}

impl Default for Brush {
    fn default() -> Self {
        Self { color: DEFAULT_COLOR.to_owned(), width: DEFAULT_WIDTH, eraser: false }
    }
}

impl Brush {
    #[must_use]
    pub fn ink(&self) -> Ink {
        if self.eraser { Ink::Eraser } else { Ink::color(self.color.clone()) }
    }

    /// Width the stroke is drawn and stored with.
    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        if self.eraser { self.width * ERASER_WIDTH_FACTOR } else { self.width }
    }
}

#[derive(Debug, Clone)]
struct ActivePath {
    points: Vec<Point>,
    ink: Ink,
    width: f64,
}

/// Captures at most one in-progress path.
#[derive(Debug, Clone, Default)]
pub struct DrawingSession {
    path: Option<ActivePath>,
}

impl DrawingSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.path.is_some()
    }

    /// Points captured so far; empty when idle.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        self.path.as_ref().map_or(&[], |p| p.points.as_slice())
    }

    /// Open a path at `point`. The brush is captured now; later brush
    /// changes do not affect this path. An already open path is discarded.
    pub fn begin(&mut self, brush: &Brush, point: Point) {
        self.path = Some(ActivePath { points: vec![point], ink: brush.ink(), width: brush.stroke_width() });
    }

    /// Append a sample and paint the segment from the previous one.
    ///
    /// Returns `false` (and does nothing) when no path is open.
    pub fn extend(&mut self, point: Point, raster: &mut Raster) -> bool {
        let Some(path) = self.path.as_mut() else {
            return false;
        };
        if let Some(&prev) = path.points.last() {
            raster.draw_segment(prev, point, &path.ink, path.width);
        }
        path.points.push(point);
        true
    }

    /// Paint the open path again, after the raster was re-rendered under it.
    pub fn redraw(&self, raster: &mut Raster) {
        if let Some(path) = self.path.as_ref().filter(|p| p.points.len() > 1) {
            raster.draw_path(&path.points, &path.ink, path.width);
        }
    }

    /// Close the path and hand back a draft for the log.
    ///
    /// Paths with fewer than two points yield `None` and are gone.
    pub fn commit(&mut self) -> Option<StrokeDraft> {
        let path = self.path.take()?;
        if path.points.len() < MIN_STROKE_POINTS {
            return None;
        }
        Some(StrokeDraft { points: path.points, color: path.ink, width: path.width })
    }

    /// Drop the open path without submitting it. Returns whether one was open.
    pub fn cancel(&mut self) -> bool {
        self.path.take().is_some()
    }
}
