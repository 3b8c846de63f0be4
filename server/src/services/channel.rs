//! Stroke channel: room-scoped pub/sub over connected websocket clients.
//!
//! DESIGN
//! ======
//! Subscribers are the outbound frame senders registered in
//! `AppState::rooms`. Publishing is best-effort `try_send`: a full or closed
//! client channel drops that notification for that client only. Receivers
//! treat every event as a hint to re-fetch, so a dropped hint is repaired by
//! the next one or by the client's own resync.

use frames::RoomEvent;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::Frame;
use crate::state::{AppState, ConnectedClient, Participant};

/// Register `client_id` in `room_id` and tell existing peers.
///
/// Returns the room's participants after the join, the new one included.
pub async fn subscribe(state: &AppState, room_id: Uuid, client_id: Uuid, client: ConnectedClient) -> Vec<Participant> {
    let event = RoomEvent::Joined {
        room_id: room_id.to_string(),
        user_id: client.user_id.clone(),
        user_name: client.user_name.clone(),
    };
    let participants = {
        let mut rooms = state.rooms.write().await;
        let room = rooms.entry(room_id).or_default();
        room.clients.insert(client_id, client);
        info!(%room_id, %client_id, count = room.clients.len(), "channel: subscribed");
        room.participants()
    };
    publish(state, &event, Some(client_id)).await;
    participants
}

/// Remove `client_id` from `room_id` and tell remaining peers.
///
/// Returns the removed registration, or `None` if it was not subscribed.
pub async fn unsubscribe(state: &AppState, room_id: Uuid, client_id: Uuid) -> Option<ConnectedClient> {
    let removed = {
        let mut rooms = state.rooms.write().await;
        let room = rooms.get_mut(&room_id)?;
        let removed = room.clients.remove(&client_id);
        info!(%room_id, %client_id, remaining = room.clients.len(), "channel: unsubscribed");
        if room.clients.is_empty() {
            rooms.remove(&room_id);
        }
        removed
    }?;
    let event = RoomEvent::Parted { room_id: room_id.to_string(), user_id: removed.user_id.clone() };
    publish(state, &event, None).await;
    Some(removed)
}

/// Current participants of `room_id`.
pub async fn participants(state: &AppState, room_id: Uuid) -> Vec<Participant> {
    let rooms = state.rooms.read().await;
    rooms.get(&room_id).map(crate::state::RoomState::participants).unwrap_or_default()
}

/// Deliver `event` to every subscriber of its room except `exclude`.
///
/// Returns how many subscribers accepted the frame.
pub async fn publish(state: &AppState, event: &RoomEvent, exclude: Option<Uuid>) -> usize {
    let frame = match Frame::try_from(event.to_frame()) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(room_id = event.room_id(), error = %e, "channel: unpublishable event");
            return 0;
        }
    };
    let Some(room_id) = frame.room_id else {
        return 0;
    };

    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&room_id) else {
        return 0;
    };

    let mut delivered = 0;
    for (client_id, client) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        match client.tx.try_send(frame.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => debug!(%room_id, %client_id, syscall = %frame.syscall, error = %e, "channel: dropped notification"),
        }
    }
    delivered
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
