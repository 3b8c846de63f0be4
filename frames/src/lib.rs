//! Wire model shared by the drawroom server and its clients.
//!
//! Every websocket message is one [`Frame`]: a syscall name, a lifecycle
//! [`Status`], correlation ids and a JSON payload. [`wire`] turns frames into
//! compact protobuf bytes and back; [`event`] gives the room notifications a
//! typed shape.

pub mod event;
pub mod wire;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use event::RoomEvent;
pub use wire::{CodecError, decode_frame, encode_frame};

/// Payload key holding a human-readable failure.
pub const FRAME_MESSAGE: &str = "message";

/// Payload key holding a stable `E_*` failure code.
pub const FRAME_CODE: &str = "code";

/// Payload key telling the caller whether resending may succeed.
pub const FRAME_RETRYABLE: &str = "retryable";

/// Where a frame sits in a request/reply exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// A request, or a notification nobody asked for.
    Request,
    Item,
    Bulk,
    Done,
    Error,
    Cancel,
}

impl Status {
    /// `Done`, `Error` and `Cancel` close an exchange; nothing follows them.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancel)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: String,
    /// Request this frame answers.
    pub parent_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub room_id: Option<String>,
    /// User id of the sender; stamped by the server on inbound requests.
    pub from: Option<String>,
    /// `prefix:verb`, e.g. `stroke:append`.
    pub syscall: String,
    pub status: Status,
    pub data: Value,
}

/// Failures that travel inside error frames carry a code and a retry hint.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Wall clock in epoch milliseconds; 0 if the clock is before the epoch.
#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

impl Frame {
    /// New request with a fresh v4 id, stamped now.
    #[must_use]
    pub fn request(syscall: &str, room_id: Option<&str>, data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id: None,
            ts: now_ms(),
            room_id: room_id.map(str::to_owned),
            from: None,
            syscall: syscall.to_owned(),
            status: Status::Request,
            data,
        }
    }

    /// Namespace part of the syscall: `stroke` for `stroke:append`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.syscall.split(':').next().unwrap_or_default()
    }

    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key)?.as_str()
    }

    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.data_str(FRAME_CODE)
    }

    #[must_use]
    pub fn error_message(&self) -> &str {
        self.data_str(FRAME_MESSAGE).unwrap_or("request failed")
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
