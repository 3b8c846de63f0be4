//! Cursor presence service: upsert, remove, list, and the staleness sweep.
//!
//! DESIGN
//! ======
//! One row per `(room_id, user_id)`. Every write publishes `cursor:changed`
//! to the room's other subscribers; they re-list cursors on receipt. The
//! sweep task removes rows nobody refreshed within the staleness window,
//! which covers clients that vanished without sending `cursor:remove`.

use std::time::Duration;

use canvas::presence::Cursor;
use frames::RoomEvent;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{ErrorCode, now_ms};
use crate::services::channel;
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("invalid cursor position")]
    InvalidPosition,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for CursorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPosition => "E_INVALID_CURSOR",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::InvalidPosition => false,
            Self::Store(e) => e.retryable(),
        }
    }
}

/// Write this participant's position and tell the room.
///
/// # Errors
///
/// Returns [`CursorError::InvalidPosition`] for non-finite coordinates, or a
/// store error.
pub async fn upsert(
    state: &AppState,
    room_id: Uuid,
    user_id: &str,
    user_name: &str,
    x: f64,
    y: f64,
    exclude: Option<Uuid>,
) -> Result<Cursor, CursorError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(CursorError::InvalidPosition);
    }
    let cursor = Cursor { room_id, user_id: user_id.to_owned(), user_name: user_name.to_owned(), x, y, updated_at: 0 };
    let saved = state.cursors.upsert(cursor).await?;
    debug!(%room_id, %user_id, x, y, "cursor: updated");
    publish_changed(state, room_id, user_id, exclude).await;
    Ok(saved)
}

/// Delete this participant's cursor. Returns whether one existed.
///
/// # Errors
///
/// Returns a store error if the delete fails.
pub async fn remove(state: &AppState, room_id: Uuid, user_id: &str, exclude: Option<Uuid>) -> Result<bool, CursorError> {
    let existed = state.cursors.remove(room_id, user_id).await?;
    if existed {
        publish_changed(state, room_id, user_id, exclude).await;
    }
    Ok(existed)
}

/// Every live cursor in the room.
///
/// # Errors
///
/// Returns a store error if the read fails.
pub async fn list(state: &AppState, room_id: Uuid) -> Result<Vec<Cursor>, CursorError> {
    Ok(state.cursors.list(room_id).await?)
}

/// Remove cursors older than `stale` and notify their rooms. Returns the
/// number removed.
///
/// # Errors
///
/// Returns a store error if the sweep fails.
pub async fn sweep_once(state: &AppState, stale: Duration) -> Result<usize, CursorError> {
    let stale_ms = i64::try_from(stale.as_millis()).unwrap_or(i64::MAX);
    let cutoff = now_ms().saturating_sub(stale_ms);
    let removed = state.cursors.sweep(cutoff).await?;
    for (room_id, user_id) in &removed {
        publish_changed(state, *room_id, user_id, None).await;
    }
    Ok(removed.len())
}

/// Spawn the periodic staleness sweep. Returns a handle for shutdown.
pub fn spawn_cursor_sweep_task(state: AppState, interval: Duration, stale: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), stale_secs = stale.as_secs(), "cursor sweep configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match sweep_once(&state, stale).await {
                Ok(0) => {}
                Ok(count) => info!(count, "cursor sweep removed stale cursors"),
                Err(e) => warn!(error = %e, "cursor sweep failed"),
            }
        }
    })
}

async fn publish_changed(state: &AppState, room_id: Uuid, user_id: &str, exclude: Option<Uuid>) {
    let event = RoomEvent::CursorChanged { room_id: room_id.to_string(), user_id: user_id.to_owned() };
    channel::publish(state, &event, exclude).await;
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod tests;
