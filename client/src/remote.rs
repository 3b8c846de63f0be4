//! Websocket transport: one connection to the sync server.
//!
//! DESIGN
//! ======
//! `connect` performs the upgrade, waits for `session:connected`, then
//! splits the socket into two background tasks that only move frames:
//! - writer: outbound queue → socket
//! - reader: socket → reply routing (by `parent_id`) or event fan-out
//!
//! Requests register a oneshot under their frame id before sending and wait
//! for the terminal reply under the configured deadline. Room events go to
//! every live subscription for that room. When the socket ends, pending
//! requests fail with `WsClosed` and subscriptions see the end of stream.
//!
//! The server keeps one joined room per connection; subscribing to a second
//! room moves the connection there.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use canvas::presence::Cursor;
use canvas::{Point, Stroke, StrokeDraft};
use frames::event::syscall;
use frames::{Frame, RoomEvent, Status};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::log::{PresenceLog, RoomDirectory, RoomInfo, StrokeLog, Subscription};

const OUTBOUND_CAPACITY: usize = 256;

// =============================================================================
// ROUTING TABLE
// =============================================================================

struct Listener {
    room_id: String,
    tx: mpsc::UnboundedSender<RoomEvent>,
}

#[derive(Default)]
struct Routes {
    pending: HashMap<String, oneshot::Sender<Frame>>,
    listeners: HashMap<u64, Listener>,
    closed: bool,
}

impl Routes {
    /// Hand an inbound frame to whoever is waiting for it.
    fn dispatch(&mut self, frame: Frame) {
        if let Some(parent) = frame.parent_id.as_deref() {
            if frame.status.is_terminal() {
                if let Some(waiter) = self.pending.remove(parent) {
                    let _ = waiter.send(frame);
                }
            }
            return;
        }
        if let Some(event) = RoomEvent::from_frame(&frame) {
            self.listeners
                .retain(|_, l| l.room_id != event.room_id() || l.tx.send(event.clone()).is_ok());
            return;
        }
        if frame.status == Status::Error || frame.syscall == "gateway:error" {
            warn!(syscall = %frame.syscall, message = frame.error_message(), "remote: unsolicited error frame");
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
        self.listeners.clear();
    }
}

fn lock(routes: &Mutex<Routes>) -> MutexGuard<'_, Routes> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Cloneable handle on one websocket session. The socket closes once every
/// clone and subscription is gone.
#[derive(Clone)]
pub struct FrameConnection {
    outbound: mpsc::Sender<Message>,
    routes: Arc<Mutex<Routes>>,
    next_listener: Arc<AtomicU64>,
    request_timeout: Duration,
    client_id: String,
    user_id: String,
}

impl FrameConnection {
    /// Open a session as `user_id`. `base_url` may use `http(s)` or `ws(s)`.
    ///
    /// # Errors
    ///
    /// Fails if the URL is unusable, the upgrade fails, or the server does
    /// not greet within `request_timeout`.
    pub async fn connect(
        base_url: &str,
        user_id: &str,
        user_name: &str,
        request_timeout: Duration,
    ) -> Result<Self, SyncError> {
        let url = ws_url(base_url, user_id, user_name)?;
        let (stream, _) = connect_async(url.as_str()).await.map_err(|e| SyncError::WsConnect(Box::new(e)))?;
        let (mut sink, mut source) = stream.split();

        let welcome = tokio::time::timeout(request_timeout, wait_for_session_connected(&mut source))
            .await
            .map_err(|_| SyncError::Timeout(syscall::SESSION_CONNECTED.to_owned()))??;
        let client_id = welcome.data_str("client_id").unwrap_or_default().to_owned();
        info!(%client_id, %user_id, "remote: connected");

        let (outbound, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    debug!(error = %e, "remote: writer stopped");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let routes = Arc::new(Mutex::new(Routes::default()));
        let reader_routes = Arc::clone(&routes);
        tokio::spawn(async move {
            loop {
                match next_frame(&mut source).await {
                    Ok(frame) => lock(&reader_routes).dispatch(frame),
                    Err(SyncError::Decode(e)) => warn!(error = %e, "remote: undecodable frame"),
                    Err(e) => {
                        debug!(error = %e, "remote: reader stopped");
                        break;
                    }
                }
            }
            lock(&reader_routes).close();
        });

        Ok(Self {
            outbound,
            routes,
            next_listener: Arc::new(AtomicU64::new(0)),
            request_timeout,
            client_id,
            user_id: user_id.to_owned(),
        })
    }

    /// Server-assigned id of this session.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Send one request and wait for its terminal reply.
    ///
    /// # Errors
    ///
    /// Transport failures, the deadline, or the server's error reply.
    pub async fn request(&self, name: &str, room_id: Option<Uuid>, data: Value) -> Result<Frame, SyncError> {
        let room = room_id.map(|id| id.to_string());
        let req = Frame::request(name, room.as_deref(), data);
        let (tx, rx) = oneshot::channel();
        {
            let mut routes = lock(&self.routes);
            if routes.closed {
                return Err(SyncError::WsClosed);
            }
            routes.pending.insert(req.id.clone(), tx);
        }

        let bytes = frames::encode_frame(&req);
        if self.outbound.send(Message::Binary(bytes.into())).await.is_err() {
            lock(&self.routes).pending.remove(&req.id);
            return Err(SyncError::WsClosed);
        }

        let reply = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(SyncError::WsClosed),
            Err(_) => {
                lock(&self.routes).pending.remove(&req.id);
                return Err(SyncError::Timeout(name.to_owned()));
            }
        };
        if reply.status == Status::Error {
            return Err(SyncError::from_error_frame(&reply));
        }
        Ok(reply)
    }
}

#[async_trait]
impl StrokeLog for FrameConnection {
    async fn append(&self, room_id: Uuid, draft: &StrokeDraft) -> Result<Stroke, SyncError> {
        let reply = self.request(syscall::STROKE_APPEND, Some(room_id), serde_json::to_value(draft)?).await?;
        field(&reply, "stroke")
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<Stroke>, SyncError> {
        let reply = self.request(syscall::STROKE_LIST, Some(room_id), json!({})).await?;
        field(&reply, "strokes")
    }

    async fn clear(&self, room_id: Uuid) -> Result<(), SyncError> {
        self.request(syscall::STROKE_CLEAR, Some(room_id), json!({})).await?;
        Ok(())
    }

    async fn subscribe(&self, room_id: Uuid) -> Result<Subscription, SyncError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.routes).listeners.insert(id, Listener { room_id: room_id.to_string(), tx });

        if let Err(e) = self.request(syscall::ROOM_JOIN, Some(room_id), json!({})).await {
            lock(&self.routes).listeners.remove(&id);
            return Err(e);
        }

        let routes = Arc::clone(&self.routes);
        let outbound = self.outbound.clone();
        Ok(Subscription::new(room_id, rx, move || {
            lock(&routes).listeners.remove(&id);
            let part = Frame::request(syscall::ROOM_PART, Some(&room_id.to_string()), json!({}));
            if outbound.try_send(Message::Binary(frames::encode_frame(&part).into())).is_err() {
                debug!(%room_id, "remote: part not sent, connection gone");
            }
        }))
    }
}

#[async_trait]
impl PresenceLog for FrameConnection {
    async fn update(&self, room_id: Uuid, user_name: &str, position: Point) -> Result<(), SyncError> {
        let data = json!({ "x": position.x, "y": position.y, "user_name": user_name });
        self.request(syscall::CURSOR_UPDATE, Some(room_id), data).await?;
        Ok(())
    }

    async fn remove(&self, room_id: Uuid) -> Result<(), SyncError> {
        self.request(syscall::CURSOR_REMOVE, Some(room_id), json!({})).await?;
        Ok(())
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<Cursor>, SyncError> {
        let reply = self.request(syscall::CURSOR_LIST, Some(room_id), json!({})).await?;
        field(&reply, "cursors")
    }
}

#[async_trait]
impl RoomDirectory for FrameConnection {
    async fn list_rooms(&self) -> Result<Vec<RoomInfo>, SyncError> {
        let reply = self.request(syscall::ROOM_LIST, None, json!({})).await?;
        field(&reply, "rooms")
    }

    async fn create_room(&self, name: &str) -> Result<RoomInfo, SyncError> {
        let reply = self.request(syscall::ROOM_CREATE, None, json!({ "name": name })).await?;
        field(&reply, "room")
    }

    async fn delete_room(&self, room_id: Uuid) -> Result<(), SyncError> {
        self.request(syscall::ROOM_DELETE, Some(room_id), json!({})).await?;
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn field<T: DeserializeOwned>(frame: &Frame, key: &'static str) -> Result<T, SyncError> {
    let value = frame.data.get(key).cloned().ok_or(SyncError::MissingField(key))?;
    Ok(serde_json::from_value(value)?)
}

/// Websocket endpoint for `base_url` with the identity query attached.
pub(crate) fn ws_url(base_url: &str, user_id: &str, user_name: &str) -> Result<String, SyncError> {
    let base = base_url.trim().trim_end_matches('/');
    let invalid = || SyncError::InvalidUrl(base_url.to_owned());
    let (scheme, rest) = base.split_once("://").ok_or_else(invalid)?;
    let scheme = match scheme {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid()),
    };
    Ok(format!(
        "{scheme}://{rest}/api/ws?user_id={}&user_name={}",
        urlencoding::encode(user_id),
        urlencoding::encode(user_name)
    ))
}

async fn wait_for_session_connected<S>(source: &mut S) -> Result<Frame, SyncError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let frame = next_frame(source).await?;
        if frame.syscall == syscall::SESSION_CONNECTED {
            return Ok(frame);
        }
    }
}

async fn next_frame<S>(source: &mut S) -> Result<Frame, SyncError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let Some(message) = source.next().await else {
            return Err(SyncError::WsClosed);
        };
        match message.map_err(|e| SyncError::WsConnect(Box::new(e)))? {
            Message::Binary(bytes) => return Ok(frames::decode_frame(&bytes)?),
            Message::Close(_) => return Err(SyncError::WsClosed),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "remote_test.rs"]
mod tests;
