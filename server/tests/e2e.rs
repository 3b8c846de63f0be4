//! End-to-end: the real router on an ephemeral port, driven by real
//! websocket clients.

use std::sync::Arc;
use std::time::Duration;

use canvas::{Ink, Point, StrokeDraft};
use client::log::{PresenceLog, RoomDirectory, StrokeLog};
use client::{ClientConfig, FrameConnection, SyncError, Whiteboard};
use frames::RoomEvent;
use futures_util::{SinkExt, StreamExt};
use server::state::AppState;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_server() -> String {
    let app = server::routes::app(AppState::in_memory(64));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn connect(base: &str, user: &str) -> Arc<FrameConnection> {
    Arc::new(FrameConnection::connect(base, user, &user.to_uppercase(), TIMEOUT).await.unwrap())
}

fn whiteboard(room: Uuid, user: &str, conn: &Arc<FrameConnection>) -> Whiteboard {
    let config = ClientConfig { canvas_width: 64, canvas_height: 64, ..ClientConfig::default() };
    Whiteboard::new(room, user, &user.to_uppercase(), &config, conn.clone(), conn.clone())
}

async fn draw(wb: &mut Whiteboard, from: Point, to: Point) -> canvas::Stroke {
    wb.begin_stroke(from);
    wb.extend_stroke(to);
    wb.commit_stroke().await.unwrap().unwrap()
}

/// Handle events until one matches.
async fn wait_for(wb: &mut Whiteboard, wanted: impl Fn(&RoomEvent) -> bool) -> RoomEvent {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            let event = wb.next_event().await.expect("subscription open");
            wb.handle_event(&event).await.unwrap();
            if wanted(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event in time")
}

#[tokio::test]
async fn healthz_returns_ok() {
    let base = spawn_server().await;
    let addr = base.trim_start_matches("http://");
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /healthz HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
}

#[tokio::test]
async fn two_clients_see_each_others_strokes_in_one_order() {
    let base = spawn_server().await;
    let room = Uuid::new_v4();
    let alice_conn = connect(&base, "alice").await;
    let bob_conn = connect(&base, "bob").await;
    let mut alice = whiteboard(room, "alice", &alice_conn);
    let mut bob = whiteboard(room, "bob", &bob_conn);
    alice.subscribe().await.unwrap();
    bob.subscribe().await.unwrap();

    let a = draw(&mut alice, Point::new(0.0, 10.0), Point::new(30.0, 10.0)).await;
    wait_for(&mut bob, |e| matches!(e, RoomEvent::StrokeAdded { user_id, .. } if user_id == "alice")).await;
    assert_eq!(bob.strokes().iter().map(|s| s.id).collect::<Vec<_>>(), vec![a.id]);

    let b = draw(&mut bob, Point::new(0.0, 20.0), Point::new(30.0, 20.0)).await;
    wait_for(&mut alice, |e| matches!(e, RoomEvent::StrokeAdded { user_id, .. } if user_id == "bob")).await;

    alice.resync().await.unwrap();
    bob.resync().await.unwrap();
    let order: Vec<Uuid> = alice.strokes().iter().map(|s| s.id).collect();
    assert_eq!(order, vec![a.id, b.id]);
    assert_eq!(bob.strokes().iter().map(|s| s.id).collect::<Vec<_>>(), order);
    assert!(b.seq > a.seq);
    assert_eq!(alice.raster().image().as_raw(), bob.raster().image().as_raw());
}

#[tokio::test]
async fn clear_reaches_peers_and_is_not_undoable() {
    let base = spawn_server().await;
    let room = Uuid::new_v4();
    let alice_conn = connect(&base, "alice").await;
    let bob_conn = connect(&base, "bob").await;
    let mut alice = whiteboard(room, "alice", &alice_conn);
    let mut bob = whiteboard(room, "bob", &bob_conn);
    alice.subscribe().await.unwrap();
    bob.subscribe().await.unwrap();

    draw(&mut alice, Point::new(0.0, 10.0), Point::new(30.0, 10.0)).await;
    bob.clear_room().await.unwrap();
    wait_for(&mut alice, |e| matches!(e, RoomEvent::Cleared { .. })).await;

    assert!(alice.strokes().is_empty());
    assert!(!alice.undo());
    assert!(StrokeLog::list(alice_conn.as_ref(), room).await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_stroke_is_rejected_and_never_listed() {
    let base = spawn_server().await;
    let room = Uuid::new_v4();
    let conn = connect(&base, "alice").await;

    let draft = StrokeDraft { points: vec![Point::new(1.0, 1.0)], color: Ink::color("#000000"), width: 2.0 };
    match conn.append(room, &draft).await {
        Err(SyncError::Rejected { code, retryable, .. }) => {
            assert_eq!(code, "E_MALFORMED_STROKE");
            assert!(!retryable);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(StrokeLog::list(conn.as_ref(), room).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_the_creator_may_delete_a_room() {
    let base = spawn_server().await;
    let alice = connect(&base, "alice").await;
    let mallory = connect(&base, "mallory").await;

    let room = alice.create_room("Sketches").await.unwrap();
    assert_eq!(room.created_by, "alice");
    assert_eq!(mallory.list_rooms().await.unwrap(), vec![room.clone()]);

    assert!(matches!(mallory.delete_room(room.id).await, Err(SyncError::Forbidden(_))));
    alice.delete_room(room.id).await.unwrap();
    assert!(alice.list_rooms().await.unwrap().is_empty());
}

#[tokio::test]
async fn disconnect_removes_the_departed_cursor() {
    let base = spawn_server().await;
    let room = Uuid::new_v4();
    let alice_conn = connect(&base, "alice").await;
    let mut alice = whiteboard(room, "alice", &alice_conn);
    alice.subscribe().await.unwrap();

    let bob_conn = connect(&base, "bob").await;
    let bob_sub = bob_conn.subscribe(room).await.unwrap();
    bob_conn.update(room, "Bob", Point::new(4.0, 5.0)).await.unwrap();
    wait_for(&mut alice, |e| matches!(e, RoomEvent::CursorChanged { user_id, .. } if user_id == "bob")).await;
    assert_eq!(alice.remote_cursors().len(), 1);

    drop(bob_sub);
    drop(bob_conn);
    wait_for(&mut alice, |e| matches!(e, RoomEvent::Parted { user_id, .. } if user_id == "bob")).await;
    wait_for(&mut alice, |e| matches!(e, RoomEvent::CursorChanged { user_id, .. } if user_id == "bob")).await;
    assert!(alice.remote_cursors().is_empty());
}

#[tokio::test]
async fn missing_identity_is_refused() {
    let base = spawn_server().await;
    let url = format!("{}/api/ws", base.replace("http://", "ws://"));
    assert!(connect_async(url.as_str()).await.is_err());
}

type Socket = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_frame(ws: &mut Socket) -> frames::Frame {
    let read = async {
        loop {
            if let Message::Binary(bytes) = ws.next().await.unwrap().unwrap() {
                return frames::decode_frame(&bytes).unwrap();
            }
        }
    };
    tokio::time::timeout(TIMEOUT, read).await.expect("frame in time")
}

#[tokio::test]
async fn garbage_bytes_get_an_error_frame() {
    let base = spawn_server().await;
    let url = format!("{}/api/ws?user_id=probe", base.replace("http://", "ws://"));
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

    let welcome = next_frame(&mut ws).await;
    assert_eq!(welcome.syscall, "session:connected");
    assert_eq!(welcome.data_str("user_id"), Some("probe"));

    ws.send(Message::Binary(vec![0xff, 0x00, 0x13].into())).await.unwrap();
    let reply = next_frame(&mut ws).await;
    assert_eq!(reply.syscall, "gateway:error");
    assert_eq!(reply.error_code(), Some("E_BAD_FRAME"));
}
