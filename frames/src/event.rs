//! Room-scoped change notifications pushed from server to subscribers.
//!
//! Events are hints, not payloads: a receiver that sees `StrokeAdded` must
//! re-fetch the room's stroke list rather than trust the event for ordering.
//! Delivery is at-least-once, so every consumer has to tolerate duplicates.

use serde_json::{Value, json};

use crate::{Frame, Status};

/// Syscall names shared by client and server.
pub mod syscall {
    pub const SESSION_CONNECTED: &str = "session:connected";

    pub const ROOM_LIST: &str = "room:list";
    pub const ROOM_CREATE: &str = "room:create";
    pub const ROOM_DELETE: &str = "room:delete";
    pub const ROOM_JOIN: &str = "room:join";
    pub const ROOM_PART: &str = "room:part";
    pub const ROOM_JOINED: &str = "room:joined";
    pub const ROOM_PARTED: &str = "room:parted";

    pub const STROKE_APPEND: &str = "stroke:append";
    pub const STROKE_LIST: &str = "stroke:list";
    pub const STROKE_CLEAR: &str = "stroke:clear";
    pub const STROKE_ADDED: &str = "stroke:added";
    pub const STROKE_CLEARED: &str = "stroke:cleared";

    pub const CURSOR_UPDATE: &str = "cursor:update";
    pub const CURSOR_REMOVE: &str = "cursor:remove";
    pub const CURSOR_LIST: &str = "cursor:list";
    pub const CURSOR_CHANGED: &str = "cursor:changed";
}

/// A change notification for one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A stroke was committed to the room's log.
    StrokeAdded { room_id: String, stroke_id: String, seq: i64, user_id: String },
    /// Every stroke in the room was deleted.
    Cleared { room_id: String },
    /// A cursor row in the room was written or removed.
    CursorChanged { room_id: String, user_id: String },
    /// A participant subscribed to the room.
    Joined { room_id: String, user_id: String, user_name: String },
    /// A participant left the room.
    Parted { room_id: String, user_id: String },
}

impl RoomEvent {
    /// Room this event is scoped to.
    #[must_use]
    pub fn room_id(&self) -> &str {
        match self {
            Self::StrokeAdded { room_id, .. }
            | Self::Cleared { room_id }
            | Self::CursorChanged { room_id, .. }
            | Self::Joined { room_id, .. }
            | Self::Parted { room_id, .. } => room_id,
        }
    }

    /// Encode as an unsolicited notification frame.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let (name, data) = match self {
            Self::StrokeAdded { stroke_id, seq, user_id, .. } => (
                syscall::STROKE_ADDED,
                json!({ "stroke_id": stroke_id, "seq": seq, "user_id": user_id }),
            ),
            Self::Cleared { .. } => (syscall::STROKE_CLEARED, json!({})),
            Self::CursorChanged { user_id, .. } => (syscall::CURSOR_CHANGED, json!({ "user_id": user_id })),
            Self::Joined { user_id, user_name, .. } => {
                (syscall::ROOM_JOINED, json!({ "user_id": user_id, "user_name": user_name }))
            }
            Self::Parted { user_id, .. } => (syscall::ROOM_PARTED, json!({ "user_id": user_id })),
        };
        Frame::request(name, Some(self.room_id()), data)
    }

    /// Decode a notification frame. Returns `None` for anything that is not a
    /// room event (replies, unknown syscalls, frames without a room).
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        if frame.status != Status::Request || frame.parent_id.is_some() {
            return None;
        }
        let room_id = frame.room_id.clone()?;
        let field = |key: &str| frame.data_str(key).unwrap_or_default().to_owned();

        match frame.syscall.as_str() {
            syscall::STROKE_ADDED => Some(Self::StrokeAdded {
                room_id,
                stroke_id: field("stroke_id"),
                seq: frame.data.get("seq").and_then(Value::as_i64).unwrap_or_default(),
                user_id: field("user_id"),
            }),
            syscall::STROKE_CLEARED => Some(Self::Cleared { room_id }),
            syscall::CURSOR_CHANGED => Some(Self::CursorChanged { room_id, user_id: field("user_id") }),
            syscall::ROOM_JOINED => {
                Some(Self::Joined { room_id, user_id: field("user_id"), user_name: field("user_name") })
            }
            syscall::ROOM_PARTED => Some(Self::Parted { room_id, user_id: field("user_id") }),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
