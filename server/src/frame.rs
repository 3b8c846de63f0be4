//! Frame: the server's typed view of a wire message.
//!
//! ARCHITECTURE
//! ============
//! The websocket carries `frames::Frame` (string ids, JSON payload) encoded
//! as protobuf. Inbound frames are converted to this type so handlers work
//! with parsed UUIDs and a flat `Data` map; replies and notifications are
//! converted back before encoding.
//!
//! DESIGN
//! ======
//! - Flat data: payload is always `Map<String, Value>`.
//! - Responses correlate to requests via `parent_id`.
//! - The WS handler routes on `syscall` prefix (`"room:"`, `"stroke:"`,
//!   `"cursor:"`) and leaves `data` to the handlers.

use std::collections::HashMap;

use uuid::Uuid;

pub use frames::{ErrorCode, FRAME_CODE, FRAME_MESSAGE, FRAME_RETRYABLE, Status, now_ms};

/// Flat key-value payload.
pub type Data = HashMap<String, serde_json::Value>;

/// Why an inbound wire frame could not be turned into a [`Frame`].
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame id: {0}")]
    InvalidId(String),
    #[error("invalid room id: {0}")]
    InvalidRoomId(String),
    #[error("frame data must be an object")]
    DataNotObject,
}

impl ErrorCode for FrameError {
    fn error_code(&self) -> &'static str {
        "E_BAD_FRAME"
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch.
    pub ts: i64,
    pub room_id: Option<Uuid>,
    pub from: Option<String>,
    pub syscall: String,
    pub status: Status,
    pub data: Data,
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl Frame {
    /// Create a request frame. Also used for unsolicited notifications.
    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            room_id: None,
            from: None,
            syscall: syscall.into(),
            status: Status::Request,
            data,
        }
    }

    /// Create a done response carrying `data`. Terminal.
    #[must_use]
    pub fn done_with(&self, data: Data) -> Self {
        self.reply(Status::Done, data)
    }

    /// Create an empty done response. Terminal.
    #[must_use]
    pub fn done(&self) -> Self {
        self.reply(Status::Done, Data::new())
    }

    /// Create an error response from a plain string. Terminal.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(message.into()));
        self.reply(Status::Error, data)
    }

    /// Create a structured error response from a typed error. Terminal.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_CODE.into(), serde_json::Value::String(err.error_code().to_string()));
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), serde_json::Value::Bool(err.retryable()));
        self.reply(Status::Error, data)
    }

    /// Build a reply frame. Inherits `room_id` and `syscall`.
    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            room_id: self.room_id,
            from: None,
            syscall: self.syscall.clone(),
            status,
            data,
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_room_id(mut self, room_id: Uuid) -> Self {
        self.room_id = Some(room_id);
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// ROUTING
// =============================================================================

impl Frame {
    /// Extract the syscall prefix (everything before the first ':').
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.syscall.split_once(':') else {
            return &self.syscall;
        };
        prefix
    }

    /// Extract the operation (everything after the first ':').
    #[must_use]
    pub fn op(&self) -> &str {
        self.syscall.split_once(':').map_or("", |(_, op)| op)
    }

    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Room scope: the frame's `room_id`, else a `room_id` payload field.
    #[must_use]
    pub fn target_room(&self) -> Option<Uuid> {
        self.room_id.or_else(|| {
            self.data_str("room_id").and_then(|raw| Uuid::parse_str(raw).ok())
        })
    }
}

// =============================================================================
// WIRE CONVERSION
// =============================================================================

impl From<&Frame> for frames::Frame {
    fn from(frame: &Frame) -> Self {
        Self {
            id: frame.id.to_string(),
            parent_id: frame.parent_id.map(|id| id.to_string()),
            ts: frame.ts,
            room_id: frame.room_id.map(|id| id.to_string()),
            from: frame.from.clone(),
            syscall: frame.syscall.clone(),
            status: frame.status,
            data: serde_json::Value::Object(frame.data.clone().into_iter().collect()),
        }
    }
}

impl TryFrom<frames::Frame> for Frame {
    type Error = FrameError;

    fn try_from(wire: frames::Frame) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&wire.id).map_err(|_| FrameError::InvalidId(wire.id.clone()))?;
        let parent_id = match wire.parent_id {
            Some(raw) => Some(Uuid::parse_str(&raw).map_err(|_| FrameError::InvalidId(raw.clone()))?),
            None => None,
        };
        let room_id = match wire.room_id {
            Some(raw) if raw.is_empty() => None,
            Some(raw) => Some(Uuid::parse_str(&raw).map_err(|_| FrameError::InvalidRoomId(raw.clone()))?),
            None => None,
        };
        let data = match wire.data {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            serde_json::Value::Null => Data::new(),
            _ => return Err(FrameError::DataNotObject),
        };
        Ok(Self { id, parent_id, ts: wire.ts, room_id, from: wire.from, syscall: wire.syscall, status: wire.status, data })
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
