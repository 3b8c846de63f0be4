//! Remote collaborator seams: the stroke log, the presence table and the
//! room directory, plus the subscription handle for room events.
//!
//! The whiteboard engine only talks to these traits. The websocket
//! connection in `remote` implements all three; tests use an in-memory fake.

use std::fmt;

use async_trait::async_trait;
use canvas::presence::Cursor;
use canvas::{Point, Stroke, StrokeDraft};
use frames::RoomEvent;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::SyncError;

/// Durable, per-room ordered store of committed strokes.
#[async_trait]
pub trait StrokeLog: Send + Sync {
    /// Store a stroke. The log assigns `id`, `seq` and `created_at`.
    async fn append(&self, room_id: Uuid, draft: &StrokeDraft) -> Result<Stroke, SyncError>;

    /// Every stroke in the room, ascending `seq`.
    async fn list(&self, room_id: Uuid) -> Result<Vec<Stroke>, SyncError>;

    /// Delete every stroke in the room.
    async fn clear(&self, room_id: Uuid) -> Result<(), SyncError>;

    /// Start receiving the room's events.
    async fn subscribe(&self, room_id: Uuid) -> Result<Subscription, SyncError>;
}

/// Shared cursor table, one row per `(room, user)`.
#[async_trait]
pub trait PresenceLog: Send + Sync {
    async fn update(&self, room_id: Uuid, user_name: &str, position: Point) -> Result<(), SyncError>;

    async fn remove(&self, room_id: Uuid) -> Result<(), SyncError>;

    async fn list(&self, room_id: Uuid) -> Result<Vec<Cursor>, SyncError>;
}

/// Named rooms. Deleting is reserved to the creator.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn list_rooms(&self) -> Result<Vec<RoomInfo>, SyncError>;

    async fn create_room(&self, name: &str) -> Result<RoomInfo, SyncError>;

    /// # Errors
    ///
    /// [`SyncError::Forbidden`] when the caller did not create the room.
    async fn delete_room(&self, room_id: Uuid) -> Result<(), SyncError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub created_by: String,
    pub created_at: i64,
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

type Release = Box<dyn FnOnce() + Send>;

/// Explicit handle on a room's event stream.
///
/// Events stop when the handle is released with [`Subscription::unsubscribe`]
/// or dropped; the release hook runs exactly once either way.
pub struct Subscription {
    room_id: Uuid,
    events: mpsc::UnboundedReceiver<RoomEvent>,
    release: Option<Release>,
}

impl Subscription {
    pub fn new(room_id: Uuid, events: mpsc::UnboundedReceiver<RoomEvent>, release: impl FnOnce() + Send + 'static) -> Self {
        Self { room_id, events, release: Some(Box::new(release)) }
    }

    #[must_use]
    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    /// Next event, or `None` once the source has gone away.
    pub async fn recv(&mut self) -> Option<RoomEvent> {
        self.events.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<RoomEvent> {
        self.events.try_recv().ok()
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        self.events.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("room_id", &self.room_id)
            .field("released", &self.release.is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "log_test.rs"]
mod tests;
