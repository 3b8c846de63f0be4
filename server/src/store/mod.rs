//! Storage seams for strokes, cursors and the room directory.
//!
//! ARCHITECTURE
//! ============
//! Services talk to these traits through `Arc<dyn _>` held in `AppState`.
//! [`pg`] backs them with Postgres; [`memory`] keeps everything in process
//! for tests and for running without `DATABASE_URL`.
//!
//! Both backends give each room a total stroke order: `seq` is strictly
//! increasing in commit order, and `list` returns ascending `seq`.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use canvas::presence::Cursor;
use canvas::{Stroke, StrokeDraft};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frame::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored stroke is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        "E_DATABASE"
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// A row in the room directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub created_by: String,
    /// Milliseconds since Unix epoch.
    pub created_at: i64,
}

/// Append-only, per-room ordered stroke log.
#[async_trait]
pub trait StrokeStore: Send + Sync {
    /// Persist a validated draft, assigning `id`, `seq` and `created_at`.
    async fn append(&self, room_id: Uuid, user_id: &str, draft: StrokeDraft) -> Result<Stroke, StoreError>;

    /// Every stroke in the room, ascending `seq`.
    async fn list(&self, room_id: Uuid) -> Result<Vec<Stroke>, StoreError>;

    /// Delete every stroke in the room. Returns how many were removed.
    async fn clear(&self, room_id: Uuid) -> Result<u64, StoreError>;
}

/// One live cursor per `(room_id, user_id)`.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Insert or overwrite the cursor. `updated_at` is stamped by the store.
    async fn upsert(&self, cursor: Cursor) -> Result<Cursor, StoreError>;

    /// Returns whether a row existed.
    async fn remove(&self, room_id: Uuid, user_id: &str) -> Result<bool, StoreError>;

    async fn list(&self, room_id: Uuid) -> Result<Vec<Cursor>, StoreError>;

    /// Delete every cursor in the room.
    async fn clear_room(&self, room_id: Uuid) -> Result<u64, StoreError>;

    /// Delete cursors with `updated_at` older than `cutoff_ms` and return
    /// the `(room_id, user_id)` keys removed.
    async fn sweep(&self, cutoff_ms: i64) -> Result<Vec<(Uuid, String)>, StoreError>;
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    /// All rooms, newest first.
    async fn list(&self) -> Result<Vec<Room>, StoreError>;

    async fn create(&self, name: &str, created_by: &str) -> Result<Room, StoreError>;

    async fn get(&self, room_id: Uuid) -> Result<Option<Room>, StoreError>;

    /// Returns whether a row existed.
    async fn delete(&self, room_id: Uuid) -> Result<bool, StoreError>;
}
