//! In-memory stand-in for the sync server, shared by several fake clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use canvas::presence::Cursor;
use canvas::{Point, Stroke, StrokeDraft};
use frames::RoomEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::SyncError;
use crate::log::{PresenceLog, StrokeLog, Subscription};

#[derive(Default)]
struct HubState {
    next_seq: i64,
    next_subscriber: u64,
    strokes: HashMap<Uuid, Vec<Stroke>>,
    cursors: HashMap<Uuid, Vec<Cursor>>,
    subscribers: HashMap<u64, (Uuid, mpsc::UnboundedSender<RoomEvent>)>,
    fail_appends: usize,
    fail_lists: usize,
    updates: Vec<(String, Point)>,
    removes: usize,
}

impl HubState {
    fn publish(&mut self, room_id: Uuid, event: &RoomEvent) {
        self.subscribers.retain(|_, (room, tx)| *room != room_id || tx.send(event.clone()).is_ok());
    }
}

#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A participant's view of the hub.
    pub fn client(&self, user_id: &str) -> Arc<MemoryClient> {
        Arc::new(MemoryClient { hub: self.clone(), user_id: user_id.to_owned() })
    }

    pub fn fail_next_appends(&self, count: usize) {
        self.state.lock().unwrap().fail_appends = count;
    }

    pub fn fail_next_lists(&self, count: usize) {
        self.state.lock().unwrap().fail_lists = count;
    }

    pub fn strokes(&self, room_id: Uuid) -> Vec<Stroke> {
        self.state.lock().unwrap().strokes.get(&room_id).cloned().unwrap_or_default()
    }

    pub fn updates(&self) -> Vec<(String, Point)> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn removes(&self) -> usize {
        self.state.lock().unwrap().removes
    }

    pub fn subscriber_count(&self, room_id: Uuid) -> usize {
        self.state.lock().unwrap().subscribers.values().filter(|(room, _)| *room == room_id).count()
    }

    /// Deliver an arbitrary event, as a duplicated or reordered hint would.
    pub fn publish(&self, room_id: Uuid, event: &RoomEvent) {
        self.state.lock().unwrap().publish(room_id, event);
    }
}

pub struct MemoryClient {
    hub: MemoryHub,
    user_id: String,
}

#[async_trait]
impl StrokeLog for MemoryClient {
    async fn append(&self, room_id: Uuid, draft: &StrokeDraft) -> Result<Stroke, SyncError> {
        let mut state = self.hub.state.lock().unwrap();
        if state.fail_appends > 0 {
            state.fail_appends -= 1;
            return Err(SyncError::Timeout("stroke:append".into()));
        }
        draft.validate().map_err(|e| SyncError::Rejected {
            syscall: "stroke:append".into(),
            code: "E_MALFORMED_STROKE".into(),
            message: e.to_string(),
            retryable: false,
        })?;
        state.next_seq += 1;
        let stroke = Stroke::commit(draft.clone(), room_id, &self.user_id, state.next_seq, frames::now_ms());
        state.strokes.entry(room_id).or_default().push(stroke.clone());
        let event = RoomEvent::StrokeAdded {
            room_id: room_id.to_string(),
            stroke_id: stroke.id.to_string(),
            seq: stroke.seq,
            user_id: self.user_id.clone(),
        };
        state.publish(room_id, &event);
        Ok(stroke)
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<Stroke>, SyncError> {
        let mut state = self.hub.state.lock().unwrap();
        if state.fail_lists > 0 {
            state.fail_lists -= 1;
            return Err(SyncError::WsClosed);
        }
        Ok(state.strokes.get(&room_id).cloned().unwrap_or_default())
    }

    async fn clear(&self, room_id: Uuid) -> Result<(), SyncError> {
        let mut state = self.hub.state.lock().unwrap();
        state.strokes.remove(&room_id);
        state.publish(room_id, &RoomEvent::Cleared { room_id: room_id.to_string() });
        Ok(())
    }

    async fn subscribe(&self, room_id: Uuid) -> Result<Subscription, SyncError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut state = self.hub.state.lock().unwrap();
            state.next_subscriber += 1;
            let id = state.next_subscriber;
            state.subscribers.insert(id, (room_id, tx));
            id
        };
        let hub = self.hub.clone();
        Ok(Subscription::new(room_id, rx, move || {
            hub.state.lock().unwrap().subscribers.remove(&id);
        }))
    }
}

#[async_trait]
impl PresenceLog for MemoryClient {
    async fn update(&self, room_id: Uuid, user_name: &str, position: Point) -> Result<(), SyncError> {
        let mut state = self.hub.state.lock().unwrap();
        let cursor = Cursor {
            room_id,
            user_id: self.user_id.clone(),
            user_name: user_name.to_owned(),
            x: position.x,
            y: position.y,
            updated_at: frames::now_ms(),
        };
        let rows = state.cursors.entry(room_id).or_default();
        rows.retain(|c| c.user_id != self.user_id);
        rows.push(cursor);
        state.updates.push((self.user_id.clone(), position));
        state.publish(room_id, &RoomEvent::CursorChanged { room_id: room_id.to_string(), user_id: self.user_id.clone() });
        Ok(())
    }

    async fn remove(&self, room_id: Uuid) -> Result<(), SyncError> {
        let mut state = self.hub.state.lock().unwrap();
        state.removes += 1;
        if let Some(rows) = state.cursors.get_mut(&room_id) {
            rows.retain(|c| c.user_id != self.user_id);
        }
        state.publish(room_id, &RoomEvent::CursorChanged { room_id: room_id.to_string(), user_id: self.user_id.clone() });
        Ok(())
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<Cursor>, SyncError> {
        Ok(self.hub.state.lock().unwrap().cursors.get(&room_id).cloned().unwrap_or_default())
    }
}
