//! Stroke model, raster replay and client-side drawing state for a shared
//! freehand canvas.
//!
//! Nothing in this crate performs I/O. The `client` crate drives these types
//! from pointer input and network events; the `server` crate uses the stroke
//! model and validation when persisting to the log.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`stroke`] | Stroke record, ink, points, draft validation |
//! | [`color`] | Hex color parsing |
//! | [`render`] | Deterministic replay onto an RGBA raster, export |
//! | [`session`] | One in-progress pointer path with optimistic painting |
//! | [`history`] | Snapshot undo/redo stacks |
//! | [`mirror`] | Authoritative list plus pending overlay |
//! | [`presence`] | Cursor record, send throttle, identity colors |
//! | [`consts`] | Shared constants (eraser marker, palette, defaults) |

pub mod color;
pub mod consts;
pub mod history;
pub mod mirror;
pub mod presence;
pub mod render;
pub mod session;
pub mod stroke;

pub use stroke::{Ink, Point, Stroke, StrokeDraft};
