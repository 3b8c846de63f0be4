//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the three stores behind trait objects and the live subscriber
//! registry: for every room with at least one joined connection, the
//! outbound frame sender of each connection.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::frame::Frame;
use crate::store::memory::{MemoryCursorStore, MemoryRoomStore, MemoryStrokeStore};
use crate::store::pg::{PgCursorStore, PgRoomStore, PgStrokeStore};
use crate::store::{CursorStore, RoomStore, StrokeStore};

// =============================================================================
// ROOM STATE
// =============================================================================

/// A connection subscribed to a room.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub user_id: String,
    pub user_name: String,
    pub tx: mpsc::Sender<Frame>,
}

/// Participant as reported to peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub client_id: Uuid,
    pub user_id: String,
    pub user_name: String,
}

/// Live subscribers of one room.
#[derive(Default)]
pub struct RoomState {
    pub clients: HashMap<Uuid, ConnectedClient>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn participants(&self) -> Vec<Participant> {
        let mut list: Vec<Participant> = self
            .clients
            .iter()
            .map(|(client_id, c)| Participant {
                client_id: *client_id,
                user_id: c.user_id.clone(),
                user_name: c.user_name.clone(),
            })
            .collect();
        list.sort_by(|a, b| a.user_id.cmp(&b.user_id).then(a.client_id.cmp(&b.client_id)));
        list
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is required by Axum; all fields are `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub strokes: Arc<dyn StrokeStore>,
    pub cursors: Arc<dyn CursorStore>,
    pub directory: Arc<dyn RoomStore>,
    pub rooms: Arc<RwLock<HashMap<Uuid, RoomState>>>,
    /// Outbound frame buffer per connection.
    pub client_channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(
        strokes: Arc<dyn StrokeStore>,
        cursors: Arc<dyn CursorStore>,
        directory: Arc<dyn RoomStore>,
        client_channel_capacity: usize,
    ) -> Self {
        Self { strokes, cursors, directory, rooms: Arc::new(RwLock::new(HashMap::new())), client_channel_capacity }
    }

    /// State backed by Postgres.
    #[must_use]
    pub fn postgres(pool: sqlx::PgPool, client_channel_capacity: usize) -> Self {
        Self::new(
            Arc::new(PgStrokeStore::new(pool.clone())),
            Arc::new(PgCursorStore::new(pool.clone())),
            Arc::new(PgRoomStore::new(pool)),
            client_channel_capacity,
        )
    }

    /// State backed by in-process stores. Nothing persists across restarts.
    #[must_use]
    pub fn in_memory(client_channel_capacity: usize) -> Self {
        Self::new(
            Arc::new(MemoryStrokeStore::new()),
            Arc::new(MemoryCursorStore::new()),
            Arc::new(MemoryRoomStore::new()),
            client_channel_capacity,
        )
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
