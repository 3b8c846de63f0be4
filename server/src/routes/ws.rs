//! WebSocket handler: bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming binary frames → decode + dispatch by syscall prefix
//! - Room notifications queued by the channel → forward to client
//!
//! Handlers validate the request, call a service, and return an `Outcome`
//! describing the reply. Room notifications are published by the services
//! themselves, so every path that changes a room announces it the same way.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id` and `user_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch turns the Outcome into a done or error reply
//! 4. Close → leave the joined room (unsubscribe, delete cursor)

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use frames::event::syscall;
use futures_util::{Sink, SinkExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame, Status};
use crate::services;
use crate::state::{AppState, ConnectedClient};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer turns it into
/// the reply frame; handlers never write to the socket.
#[derive(Debug)]
enum Outcome {
    /// Send done+data to sender.
    Reply(Data),
    /// Send empty done to sender.
    Done,
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Per-socket session state.
pub(crate) struct Connection {
    pub(crate) client_id: Uuid,
    pub(crate) user_id: String,
    pub(crate) user_name: String,
    /// Room this connection is subscribed to, if any.
    pub(crate) room: Option<Uuid>,
    /// Sender half of this connection's notification queue.
    pub(crate) tx: mpsc::Sender<Frame>,
}

impl Connection {
    pub(crate) fn new(user_id: &str, user_name: &str, tx: mpsc::Sender<Frame>) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            user_id: user_id.to_owned(),
            user_name: user_name.to_owned(),
            room: None,
            tx,
        }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let non_empty = |key: &str| params.get(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
    let Some(user_id) = non_empty("user_id") else {
        return (StatusCode::BAD_REQUEST, "user_id required").into_response();
    };
    let user_name = non_empty("user_name").unwrap_or_else(|| user_id.clone());

    ws.on_upgrade(move |socket| run_ws(socket, state, user_id, user_name))
}

async fn run_ws(mut socket: WebSocket, state: AppState, user_id: String, user_name: String) {
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.client_channel_capacity);
    let mut conn = Connection::new(&user_id, &user_name, client_tx);
    let client_id = conn.client_id;

    let welcome = Frame::request(syscall::SESSION_CONNECTED, Data::new())
        .with_data("client_id", client_id.to_string())
        .with_data("user_id", user_id.clone());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, %user_id, "ws: client connected");

    'conn: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break 'conn };
                let replies = match msg {
                    Message::Binary(bytes) => process_inbound(&state, &mut conn, &bytes).await,
                    Message::Text(_) => vec![gateway_error("binary frames only")],
                    Message::Close(_) => break 'conn,
                    _ => continue 'conn,
                };
                if send_all(&mut socket, &replies).await.is_err() {
                    break 'conn;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break 'conn;
                }
            }
        }
    }

    disconnect(&state, &mut conn).await;
    info!(%client_id, "ws: client disconnected");
}

/// Leave the joined room, if any. Runs when the socket closes.
pub(crate) async fn disconnect(state: &AppState, conn: &mut Connection) {
    if let Some(room_id) = conn.room.take() {
        leave_room(state, conn, room_id).await;
    }
}

async fn leave_room(state: &AppState, conn: &Connection, room_id: Uuid) {
    services::channel::unsubscribe(state, room_id, conn.client_id).await;
    if let Err(e) = services::cursor::remove(state, room_id, &conn.user_id, Some(conn.client_id)).await {
        warn!(%room_id, client_id = %conn.client_id, error = %e, "ws: cursor cleanup failed");
    }
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode and process one inbound binary frame and return frames for the
/// sender. Kept free of socket I/O so tests can drive dispatch directly.
pub(crate) async fn process_inbound(state: &AppState, conn: &mut Connection, bytes: &[u8]) -> Vec<Frame> {
    let wire = match frames::decode_frame(bytes) {
        Ok(wire) => wire,
        Err(e) => {
            warn!(client_id = %conn.client_id, error = %e, "ws: undecodable inbound frame");
            return vec![gateway_error(&format!("invalid frame: {e}"))];
        }
    };
    let mut req = match Frame::try_from(wire) {
        Ok(req) => req,
        Err(e) => {
            warn!(client_id = %conn.client_id, error = %e, "ws: invalid inbound frame");
            return vec![gateway_error(&e.to_string())];
        }
    };

    // Only requests are dispatched; in-flight requests are not cancellable.
    if req.status != Status::Request {
        return vec![];
    }

    // Identity is whatever the connection asserted at upgrade.
    req.from = Some(conn.user_id.clone());

    let prefix = req.prefix();
    if prefix != "cursor" {
        info!(client_id = %conn.client_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");
    }

    let result = match prefix {
        "room" => handle_room(state, conn, &req).await,
        "stroke" => handle_stroke(state, conn, &req).await,
        "cursor" => handle_cursor(state, conn, &req).await,
        _ => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// ROOM HANDLERS
// =============================================================================

async fn handle_room(state: &AppState, conn: &mut Connection, req: &Frame) -> Result<Outcome, Frame> {
    match req.op() {
        "list" => {
            let rooms = services::room::list(state).await.map_err(|e| req.error_from(&e))?;
            Ok(reply([("rooms", to_json(req, &rooms)?)]))
        }
        "create" => {
            let name = req.data_str("name").unwrap_or_default();
            let room = services::room::create(state, name, &conn.user_id).await.map_err(|e| req.error_from(&e))?;
            Ok(reply([("room", to_json(req, &room)?)]))
        }
        "delete" => {
            let room_id = require_room(req, None)?;
            services::room::delete(state, room_id, &conn.user_id).await.map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Done)
        }
        "join" => {
            let room_id = require_room(req, None)?;
            if let Some(old) = conn.room.take() {
                leave_room(state, conn, old).await;
            }
            let client = ConnectedClient { user_id: conn.user_id.clone(), user_name: conn.user_name.clone(), tx: conn.tx.clone() };
            let users = services::channel::subscribe(state, room_id, conn.client_id, client).await;
            conn.room = Some(room_id);

            let strokes = services::stroke::list(state, room_id).await.map_err(|e| req.error_from(&e))?;
            let cursors = services::cursor::list(state, room_id).await.map_err(|e| req.error_from(&e))?;
            Ok(reply([
                ("room_id", serde_json::Value::String(room_id.to_string())),
                ("strokes", to_json(req, &strokes)?),
                ("cursors", to_json(req, &cursors)?),
                ("users", to_json(req, &users)?),
            ]))
        }
        "part" => {
            // A part aimed at a room this connection already left is a no-op.
            let stale = req.target_room().is_some_and(|target| conn.room != Some(target));
            if !stale {
                if let Some(room_id) = conn.room.take() {
                    leave_room(state, conn, room_id).await;
                }
            }
            Ok(Outcome::Done)
        }
        op => Err(req.error(format!("unknown room op: {op}"))),
    }
}

// =============================================================================
// STROKE HANDLERS
// =============================================================================

async fn handle_stroke(state: &AppState, conn: &Connection, req: &Frame) -> Result<Outcome, Frame> {
    let room_id = require_room(req, conn.room)?;
    match req.op() {
        "append" => {
            let stroke = services::stroke::append(state, room_id, &conn.user_id, &req.data)
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(reply([("stroke", to_json(req, &stroke)?)]))
        }
        "list" => {
            let strokes = services::stroke::list(state, room_id).await.map_err(|e| req.error_from(&e))?;
            Ok(reply([("strokes", to_json(req, &strokes)?)]))
        }
        "clear" => {
            let removed = services::stroke::clear(state, room_id).await.map_err(|e| req.error_from(&e))?;
            Ok(reply([("cleared", serde_json::Value::from(removed))]))
        }
        op => Err(req.error(format!("unknown stroke op: {op}"))),
    }
}

// =============================================================================
// CURSOR HANDLERS
// =============================================================================

async fn handle_cursor(state: &AppState, conn: &Connection, req: &Frame) -> Result<Outcome, Frame> {
    let room_id = require_room(req, conn.room)?;
    match req.op() {
        "update" => {
            let (Some(x), Some(y)) = (req.data_f64("x"), req.data_f64("y")) else {
                return Err(req.error("x and y required"));
            };
            let name = req.data_str("user_name").filter(|n| !n.is_empty()).unwrap_or(conn.user_name.as_str());
            services::cursor::upsert(state, room_id, &conn.user_id, name, x, y, Some(conn.client_id))
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Done)
        }
        "remove" => {
            services::cursor::remove(state, room_id, &conn.user_id, Some(conn.client_id))
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Done)
        }
        "list" => {
            let cursors = services::cursor::list(state, room_id).await.map_err(|e| req.error_from(&e))?;
            Ok(reply([("cursors", to_json(req, &cursors)?)]))
        }
        op => Err(req.error(format!("unknown cursor op: {op}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Room scope from the frame, else the joined room.
fn require_room(req: &Frame, joined: Option<Uuid>) -> Result<Uuid, Frame> {
    req.target_room().or(joined).ok_or_else(|| req.error("room_id required"))
}

fn to_json(req: &Frame, value: &impl Serialize) -> Result<serde_json::Value, Frame> {
    serde_json::to_value(value).map_err(|e| req.error(format!("failed to encode reply: {e}")))
}

fn reply<const N: usize>(fields: [(&str, serde_json::Value); N]) -> Outcome {
    Outcome::Reply(fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
}

fn gateway_error(message: &str) -> Frame {
    Frame::request("gateway:error", Data::new()).with_data("message", message).with_data("code", "E_BAD_FRAME")
}

/// Send replies in order, stopping at the first failed send.
async fn send_all<S>(sink: &mut S, replies: &[Frame]) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    for frame in replies {
        send_frame(sink, frame).await?;
    }
    Ok(())
}

async fn send_frame<S>(sink: &mut S, frame: &Frame) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    if frame.status == Status::Error {
        let code = frame.data_str("code").unwrap_or("-");
        let message = frame.data_str("message").unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if !frame.syscall.starts_with("cursor:") {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    let bytes = frames::encode_frame(&frames::Frame::from(frame));
    sink.send(Message::Binary(bytes.into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
