//! Room directory: list, create and delete named rooms.
//!
//! Strokes and cursors never check the directory; a room id is an opaque
//! scope. Deletion is the one privileged operation: only the creator may
//! delete, and deleting wipes the room's strokes and cursors and tells
//! subscribers the canvas was cleared.

use frames::RoomEvent;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::ErrorCode;
use crate::services::channel;
use crate::state::AppState;
use crate::store::{Room, StoreError};

const DEFAULT_ROOM_NAME: &str = "Untitled Room";

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    NotFound(Uuid),
    #[error("only the room creator may delete it")]
    Forbidden,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ROOM_NOT_FOUND",
            Self::Forbidden => "E_FORBIDDEN",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.retryable())
    }
}

/// All rooms, newest first.
///
/// # Errors
///
/// Returns a store error if the read fails.
pub async fn list(state: &AppState) -> Result<Vec<Room>, RoomError> {
    Ok(state.directory.list().await?)
}

/// Create a room owned by `user_id`. Blank names get a default.
///
/// # Errors
///
/// Returns a store error if the insert fails.
pub async fn create(state: &AppState, name: &str, user_id: &str) -> Result<Room, RoomError> {
    let name = name.trim();
    let name = if name.is_empty() { DEFAULT_ROOM_NAME } else { name };
    let room = state.directory.create(name, user_id).await?;
    info!(room_id = %room.id, %user_id, "room: created");
    Ok(room)
}

/// Delete a room and everything drawn in it.
///
/// # Errors
///
/// Returns [`RoomError::NotFound`], [`RoomError::Forbidden`] when `user_id`
/// is not the creator (nothing is changed), or a store error.
pub async fn delete(state: &AppState, room_id: Uuid, user_id: &str) -> Result<(), RoomError> {
    let Some(room) = state.directory.get(room_id).await? else {
        return Err(RoomError::NotFound(room_id));
    };
    if room.created_by != user_id {
        warn!(%room_id, %user_id, "room: delete refused");
        return Err(RoomError::Forbidden);
    }

    let strokes = state.strokes.clear(room_id).await?;
    let cursors = state.cursors.clear_room(room_id).await?;
    state.directory.delete(room_id).await?;
    info!(%room_id, strokes, cursors, "room: deleted");

    channel::publish(state, &RoomEvent::Cleared { room_id: room_id.to_string() }, None).await;
    Ok(())
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
