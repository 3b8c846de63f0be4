//! Postgres store backends.
//!
//! Schema lives in `src/db/migrations`. `drawing_strokes.seq` is a
//! `BIGSERIAL`; appends take a per-room transaction-scoped advisory lock so
//! that within a room, `seq` order and commit order agree and a concurrent
//! `list` never sees a gap that later fills in.

use async_trait::async_trait;
use canvas::presence::Cursor;
use canvas::stroke::StrokeData;
use canvas::{Stroke, StrokeDraft};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CursorStore, Room, RoomStore, StoreError, StrokeStore};

/// Select expression for a timestamp column as Unix milliseconds.
fn epoch_ms(col: &str) -> String {
    format!("(EXTRACT(EPOCH FROM {col}) * 1000)::BIGINT")
}

type StrokeRow = (Uuid, Uuid, String, serde_json::Value, String, f64, i64, i64);
type CursorRow = (Uuid, String, String, f64, f64, i64);
type RoomRow = (Uuid, String, String, i64);

fn stroke_from_row(row: StrokeRow) -> Result<Stroke, StoreError> {
    let (id, room_id, user_id, data, color, width, created_at, seq) = row;
    let stroke_data: StrokeData = serde_json::from_value(data)?;
    Ok(Stroke {
        id,
        room_id,
        user_id,
        stroke_data,
        stroke_color: color.into(),
        stroke_width: width,
        seq,
        created_at,
    })
}

fn cursor_from_row(row: CursorRow) -> Cursor {
    let (room_id, user_id, user_name, x, y, updated_at) = row;
    Cursor { room_id, user_id, user_name, x, y, updated_at }
}

fn room_from_row(row: RoomRow) -> Room {
    let (id, name, created_by, created_at) = row;
    Room { id, name, created_by, created_at }
}

// =============================================================================
// STROKES
// =============================================================================

pub struct PgStrokeStore {
    pool: PgPool,
}

impl PgStrokeStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StrokeStore for PgStrokeStore {
    async fn append(&self, room_id: Uuid, user_id: &str, draft: StrokeDraft) -> Result<Stroke, StoreError> {
        let mut stroke = Stroke::commit(draft, room_id, user_id, 0, 0);
        let data = serde_json::to_value(&stroke.stroke_data)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended(CAST($1 AS UUID)::text, 0))")
            .bind(room_id)
            .execute(&mut *tx)
            .await?;
        let (seq, created_at) = sqlx::query_as::<_, (i64, i64)>(&format!(
            "INSERT INTO drawing_strokes (id, room_id, user_id, stroke_data, stroke_color, stroke_width)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING seq, {}",
            epoch_ms("created_at")
        ))
        .bind(stroke.id)
        .bind(room_id)
        .bind(user_id)
        .bind(data)
        .bind(stroke.stroke_color.as_str())
        .bind(stroke.stroke_width)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        stroke.seq = seq;
        stroke.created_at = created_at;
        Ok(stroke)
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<Stroke>, StoreError> {
        let rows = sqlx::query_as::<_, StrokeRow>(&format!(
            "SELECT id, room_id, user_id, stroke_data, stroke_color, stroke_width, {}, seq
             FROM drawing_strokes
             WHERE room_id = $1
             ORDER BY seq ASC",
            epoch_ms("created_at")
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(stroke_from_row).collect()
    }

    async fn clear(&self, room_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM drawing_strokes WHERE room_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// CURSORS
// =============================================================================

pub struct PgCursorStore {
    pool: PgPool,
}

impl PgCursorStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CursorStore for PgCursorStore {
    async fn upsert(&self, mut cursor: Cursor) -> Result<Cursor, StoreError> {
        let updated_at = sqlx::query_scalar::<_, i64>(&format!(
            "INSERT INTO user_cursors (room_id, user_id, user_name, x, y, updated_at)
             VALUES ($1, $2, $3, $4, $5, now())
             ON CONFLICT (room_id, user_id) DO UPDATE
             SET user_name = EXCLUDED.user_name, x = EXCLUDED.x, y = EXCLUDED.y, updated_at = now()
             RETURNING {}",
            epoch_ms("updated_at")
        ))
        .bind(cursor.room_id)
        .bind(&cursor.user_id)
        .bind(&cursor.user_name)
        .bind(cursor.x)
        .bind(cursor.y)
        .fetch_one(&self.pool)
        .await?;

        cursor.updated_at = updated_at;
        Ok(cursor)
    }

    async fn remove(&self, room_id: Uuid, user_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_cursors WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<Cursor>, StoreError> {
        let rows = sqlx::query_as::<_, CursorRow>(&format!(
            "SELECT room_id, user_id, user_name, x, y, {}
             FROM user_cursors
             WHERE room_id = $1
             ORDER BY user_id ASC",
            epoch_ms("updated_at")
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(cursor_from_row).collect())
    }

    async fn clear_room(&self, room_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM user_cursors WHERE room_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn sweep(&self, cutoff_ms: i64) -> Result<Vec<(Uuid, String)>, StoreError> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "DELETE FROM user_cursors
             WHERE updated_at < to_timestamp(CAST($1 AS BIGINT) / 1000.0)
             RETURNING room_id, user_id",
        )
        .bind(cutoff_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// =============================================================================
// ROOMS
// =============================================================================

pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn list(&self) -> Result<Vec<Room>, StoreError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT id, name, created_by, {} FROM drawing_rooms ORDER BY created_at DESC",
            epoch_ms("created_at")
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(room_from_row).collect())
    }

    async fn create(&self, name: &str, created_by: &str) -> Result<Room, StoreError> {
        let id = Uuid::new_v4();
        let created_at = sqlx::query_scalar::<_, i64>(&format!(
            "INSERT INTO drawing_rooms (id, name, created_by) VALUES ($1, $2, $3) RETURNING {}",
            epoch_ms("created_at")
        ))
        .bind(id)
        .bind(name)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(Room { id, name: name.to_owned(), created_by: created_by.to_owned(), created_at })
    }

    async fn get(&self, room_id: Uuid) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT id, name, created_by, {} FROM drawing_rooms WHERE id = $1",
            epoch_ms("created_at")
        ))
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(room_from_row))
    }

    async fn delete(&self, room_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM drawing_rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "pg_test.rs"]
mod tests;
