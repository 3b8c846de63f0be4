//! Stroke log service: append, list and clear a room's strokes.
//!
//! DESIGN
//! ======
//! Drafts are validated before they reach the store, so a malformed stroke
//! never receives a `seq`. A successful append or clear publishes a room
//! event to every subscriber, the author included; clients reconcile by
//! re-fetching, so the event carries only ids.

use canvas::stroke::MalformedStroke;
use canvas::{Stroke, StrokeDraft};
use frames::RoomEvent;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode};
use crate::services::channel;
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum StrokeError {
    #[error("malformed stroke: {0}")]
    Malformed(#[from] MalformedStroke),
    #[error("malformed stroke payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for StrokeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) | Self::Payload(_) => "E_MALFORMED_STROKE",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Malformed(_) | Self::Payload(_) => false,
            Self::Store(e) => e.retryable(),
        }
    }
}

/// Parse a `{points, color, width}` payload into a validated draft.
///
/// # Errors
///
/// Returns [`StrokeError::Payload`] if the shape is wrong and
/// [`StrokeError::Malformed`] if the draft breaks a stroke invariant.
pub fn parse_draft(data: &Data) -> Result<StrokeDraft, StrokeError> {
    let value = serde_json::Value::Object(data.clone().into_iter().collect());
    let draft: StrokeDraft = serde_json::from_value(value)?;
    draft.validate()?;
    Ok(draft)
}

/// Validate, persist and announce a stroke.
///
/// # Errors
///
/// Returns a malformed-stroke error (nothing stored) or a store error.
pub async fn append(state: &AppState, room_id: Uuid, user_id: &str, data: &Data) -> Result<Stroke, StrokeError> {
    let draft = match parse_draft(data) {
        Ok(draft) => draft,
        Err(e) => {
            warn!(%room_id, %user_id, error = %e, "stroke: rejected");
            return Err(e);
        }
    };
    let stroke = state.strokes.append(room_id, user_id, draft).await?;
    info!(%room_id, stroke_id = %stroke.id, seq = stroke.seq, points = stroke.points().len(), "stroke: appended");

    let event = RoomEvent::StrokeAdded {
        room_id: room_id.to_string(),
        stroke_id: stroke.id.to_string(),
        seq: stroke.seq,
        user_id: user_id.to_owned(),
    };
    channel::publish(state, &event, None).await;
    Ok(stroke)
}

/// All strokes of a room in commit order.
///
/// # Errors
///
/// Returns a store error if the read fails.
pub async fn list(state: &AppState, room_id: Uuid) -> Result<Vec<Stroke>, StrokeError> {
    Ok(state.strokes.list(room_id).await?)
}

/// Delete every stroke in the room and announce it.
///
/// # Errors
///
/// Returns a store error if the delete fails; nothing is announced then.
pub async fn clear(state: &AppState, room_id: Uuid) -> Result<u64, StrokeError> {
    let removed = state.strokes.clear(room_id).await?;
    info!(%room_id, count = removed, "stroke: room cleared");
    channel::publish(state, &RoomEvent::Cleared { room_id: room_id.to_string() }, None).await;
    Ok(removed)
}

#[cfg(test)]
#[path = "stroke_test.rs"]
mod tests;
