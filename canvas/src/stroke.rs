//! Stroke model: the unit of drawing that the room log stores and replays.
//!
//! A [`StrokeDraft`] is what a client submits: the captured points plus the
//! brush it was drawn with. The log turns an accepted draft into a
//! [`Stroke`] by assigning an id, a commit sequence number and a timestamp.
//! Render order is ascending `seq` and nothing else.
//!
//! The serialized shape matches the stroke record on the wire and in the
//! `drawing_strokes` table, including the duplicated `stroke_color` /
//! `stroke_width` columns next to `stroke_data`.

#[cfg(test)]
#[path = "stroke_test.rs"]
mod stroke_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::parse_hex_rgba;
use crate::consts::{ERASER, MIN_STROKE_POINTS};

/// A sampled pointer position in canvas-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// What a stroke deposits: a paint color, or the erase marker.
///
/// Serialized as a plain string; `"ERASER"` is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Ink {
    /// Paint with a CSS hex color (`#rgb` or `#rrggbb`).
    Color(String),
    /// Remove existing pixels along the path.
    Eraser,
}

impl Ink {
    #[must_use]
    pub fn color(value: impl Into<String>) -> Self {
        Self::from(value.into())
    }

    #[must_use]
    pub fn is_eraser(&self) -> bool {
        matches!(self, Self::Eraser)
    }

    /// Wire form of this ink.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Color(c) => c,
            Self::Eraser => ERASER,
        }
    }
}

impl From<String> for Ink {
    fn from(value: String) -> Self {
        if value == ERASER { Self::Eraser } else { Self::Color(value) }
    }
}

impl From<Ink> for String {
    fn from(ink: Ink) -> Self {
        match ink {
            Ink::Color(c) => c,
            Ink::Eraser => ERASER.to_owned(),
        }
    }
}

/// Why a draft was refused before reaching the log.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedStroke {
    #[error("stroke needs at least {MIN_STROKE_POINTS} points, got {0}")]
    TooFewPoints(usize),
    #[error("stroke contains a non-finite coordinate")]
    NonFinitePoint,
    #[error("invalid stroke color: {0}")]
    InvalidColor(String),
    #[error("invalid stroke width: {0}")]
    InvalidWidth(f64),
}

/// A stroke as submitted by a client, before the log accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeDraft {
    pub points: Vec<Point>,
    pub color: Ink,
    pub width: f64,
}

impl StrokeDraft {
    /// Check the invariants every committed stroke must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first [`MalformedStroke`] violation found.
    pub fn validate(&self) -> Result<(), MalformedStroke> {
        if self.points.len() < MIN_STROKE_POINTS {
            return Err(MalformedStroke::TooFewPoints(self.points.len()));
        }
        if !self.points.iter().all(|p| p.is_finite()) {
            return Err(MalformedStroke::NonFinitePoint);
        }
        if let Ink::Color(c) = &self.color {
            if parse_hex_rgba(c).is_none() {
                return Err(MalformedStroke::InvalidColor(c.clone()));
            }
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(MalformedStroke::InvalidWidth(self.width));
        }
        Ok(())
    }
}

/// Path and brush of a committed stroke, as nested in the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeData {
    pub points: Vec<Point>,
    pub color: Ink,
    pub width: f64,
}

/// A committed stroke. Immutable once the log has accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: String,
    pub stroke_data: StrokeData,
    pub stroke_color: Ink,
    pub stroke_width: f64,
    /// Position in the room's commit order. Assigned by the log.
    #[serde(default)]
    pub seq: i64,
    /// Commit time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: i64,
}

impl Stroke {
    /// Build the committed record for an accepted draft.
    #[must_use]
    pub fn commit(draft: StrokeDraft, room_id: Uuid, user_id: &str, seq: i64, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            user_id: user_id.to_owned(),
            stroke_color: draft.color.clone(),
            stroke_width: draft.width,
            stroke_data: StrokeData { points: draft.points, color: draft.color, width: draft.width },
            seq,
            created_at,
        }
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.stroke_data.points
    }

    #[must_use]
    pub fn ink(&self) -> &Ink {
        &self.stroke_color
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.stroke_width
    }
}

/// Sort strokes into commit order, dropping repeated ids. Equal `seq`
/// values (unsequenced records) fall back to id order.
///
/// Lists coming back from the log are already ordered; this guards local
/// merges of lists with pending entries.
pub fn canonical_order(strokes: &mut Vec<Stroke>) {
    strokes.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.id.cmp(&b.id)));
    let mut seen = std::collections::HashSet::new();
    strokes.retain(|s| seen.insert(s.id));
}
