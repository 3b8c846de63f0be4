//! Runs against a real database: `TEST_DATABASE_URL` must point at a
//! scratch Postgres. Enabled with `--features live-db-tests`.

use canvas::{Ink, Point};

use super::*;

async fn pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for live-db-tests");
    crate::db::init_pool(&url, 2).await.expect("database init failed")
}

fn draft() -> StrokeDraft {
    StrokeDraft { points: vec![Point::new(0.0, 0.0), Point::new(4.0, 4.0)], color: Ink::Eraser, width: 8.0 }
}

#[tokio::test]
async fn strokes_round_trip_in_seq_order() {
    let store = PgStrokeStore::new(pool().await);
    let room = Uuid::new_v4();
    let a = store.append(room, "alice", draft()).await.unwrap();
    let b = store.append(room, "bob", draft()).await.unwrap();
    assert!(b.seq > a.seq);

    let list = store.list(room).await.unwrap();
    assert_eq!(list, vec![a, b]);
    assert_eq!(list[0].stroke_color, Ink::Eraser);

    assert_eq!(store.clear(room).await.unwrap(), 2);
    assert!(store.list(room).await.unwrap().is_empty());
}

#[tokio::test]
async fn cursor_upsert_and_sweep() {
    let store = PgCursorStore::new(pool().await);
    let room = Uuid::new_v4();
    let c = Cursor { room_id: room, user_id: "alice".into(), user_name: "Alice".into(), x: 1.0, y: 2.0, updated_at: 0 };
    store.upsert(c.clone()).await.unwrap();
    let saved = store.upsert(Cursor { x: 9.0, ..c }).await.unwrap();
    assert!(saved.updated_at > 0);
    assert_eq!(store.list(room).await.unwrap().len(), 1);

    let removed = store.sweep(saved.updated_at + 1).await.unwrap();
    assert!(removed.contains(&(room, "alice".to_string())));
    assert!(store.list(room).await.unwrap().is_empty());
}

#[tokio::test]
async fn rooms_create_get_delete() {
    let store = PgRoomStore::new(pool().await);
    let room = store.create("live", "alice").await.unwrap();
    assert_eq!(store.get(room.id).await.unwrap().map(|r| r.created_by), Some("alice".into()));
    assert!(store.delete(room.id).await.unwrap());
    assert_eq!(store.get(room.id).await.unwrap(), None);
}
