//! In-process store backends.
//!
//! Used by tests and when the server starts without `DATABASE_URL`. Nothing
//! survives a restart. Each store guards its map with one `tokio` lock, which
//! also serializes stroke appends so `seq` follows commit order.

use std::collections::HashMap;

use async_trait::async_trait;
use canvas::presence::Cursor;
use canvas::{Stroke, StrokeDraft};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{CursorStore, Room, RoomStore, StoreError, StrokeStore};
use crate::frame::now_ms;

// =============================================================================
// STROKES
// =============================================================================

#[derive(Default)]
struct StrokeLog {
    rooms: HashMap<Uuid, Vec<Stroke>>,
    /// Shared across rooms, like a serial column.
    next_seq: i64,
}

#[derive(Default)]
pub struct MemoryStrokeStore {
    log: Mutex<StrokeLog>,
}

impl MemoryStrokeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StrokeStore for MemoryStrokeStore {
    async fn append(&self, room_id: Uuid, user_id: &str, draft: StrokeDraft) -> Result<Stroke, StoreError> {
        let mut log = self.log.lock().await;
        log.next_seq += 1;
        let stroke = Stroke::commit(draft, room_id, user_id, log.next_seq, now_ms());
        log.rooms.entry(room_id).or_default().push(stroke.clone());
        Ok(stroke)
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<Stroke>, StoreError> {
        let log = self.log.lock().await;
        Ok(log.rooms.get(&room_id).cloned().unwrap_or_default())
    }

    async fn clear(&self, room_id: Uuid) -> Result<u64, StoreError> {
        let mut log = self.log.lock().await;
        let removed = log.rooms.remove(&room_id).map_or(0, |strokes| strokes.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

// =============================================================================
// CURSORS
// =============================================================================

#[derive(Default)]
pub struct MemoryCursorStore {
    cursors: RwLock<HashMap<(Uuid, String), Cursor>>,
}

impl MemoryCursorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a row's timestamp. Test hook for the staleness sweep.
    #[cfg(test)]
    pub async fn set_updated_at(&self, room_id: Uuid, user_id: &str, updated_at: i64) {
        if let Some(c) = self.cursors.write().await.get_mut(&(room_id, user_id.to_owned())) {
            c.updated_at = updated_at;
        }
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn upsert(&self, mut cursor: Cursor) -> Result<Cursor, StoreError> {
        cursor.updated_at = now_ms();
        let key = (cursor.room_id, cursor.user_id.clone());
        self.cursors.write().await.insert(key, cursor.clone());
        Ok(cursor)
    }

    async fn remove(&self, room_id: Uuid, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.cursors.write().await.remove(&(room_id, user_id.to_owned())).is_some())
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<Cursor>, StoreError> {
        let cursors = self.cursors.read().await;
        let mut list: Vec<Cursor> = cursors.values().filter(|c| c.room_id == room_id).cloned().collect();
        list.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(list)
    }

    async fn clear_room(&self, room_id: Uuid) -> Result<u64, StoreError> {
        let mut cursors = self.cursors.write().await;
        let before = cursors.len();
        cursors.retain(|(room, _), _| *room != room_id);
        Ok(u64::try_from(before - cursors.len()).unwrap_or(u64::MAX))
    }

    async fn sweep(&self, cutoff_ms: i64) -> Result<Vec<(Uuid, String)>, StoreError> {
        let mut cursors = self.cursors.write().await;
        let stale: Vec<(Uuid, String)> =
            cursors.iter().filter(|(_, c)| c.updated_at < cutoff_ms).map(|(key, _)| key.clone()).collect();
        for key in &stale {
            cursors.remove(key);
        }
        Ok(stale)
    }
}

// =============================================================================
// ROOMS
// =============================================================================

#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<Vec<Room>>,
}

impl MemoryRoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn list(&self) -> Result<Vec<Room>, StoreError> {
        let rooms = self.rooms.read().await;
        Ok(rooms.iter().rev().cloned().collect())
    }

    async fn create(&self, name: &str, created_by: &str) -> Result<Room, StoreError> {
        let room = Room { id: Uuid::new_v4(), name: name.to_owned(), created_by: created_by.to_owned(), created_at: now_ms() };
        self.rooms.write().await.push(room.clone());
        Ok(room)
    }

    async fn get(&self, room_id: Uuid) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.read().await.iter().find(|r| r.id == room_id).cloned())
    }

    async fn delete(&self, room_id: Uuid) -> Result<bool, StoreError> {
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();
        rooms.retain(|r| r.id != room_id);
        Ok(rooms.len() != before)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
