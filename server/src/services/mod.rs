//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own validation, persistence and room notifications so the
//! route handler can stay focused on frame translation.

pub mod channel;
pub mod cursor;
pub mod room;
pub mod stroke;
