//! Sync error taxonomy for the client.
//!
//! Transport failures and retryable server rejections are transient: the
//! caller's local state is left as it was and the next resync repairs it.
//! `Forbidden` is an authorization failure and is never retried.

use frames::{ErrorCode, FRAME_RETRYABLE, Frame};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("not permitted: {0}")]
    Forbidden(String),
    #[error("server rejected {syscall}: {message}")]
    Rejected { syscall: String, code: String, message: String, retryable: bool },
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("invalid payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
}

impl SyncError {
    /// Build the error carried by an error-status reply.
    #[must_use]
    pub fn from_error_frame(frame: &Frame) -> Self {
        let message = frame.error_message().to_owned();
        let code = frame.error_code().unwrap_or("E_UNKNOWN").to_owned();
        if code == "E_FORBIDDEN" {
            return Self::Forbidden(message);
        }
        let retryable = frame.data.get(FRAME_RETRYABLE).and_then(Value::as_bool).unwrap_or(false);
        Self::Rejected { syscall: frame.syscall.clone(), code, message, retryable }
    }

    /// Whether a later attempt or resync could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::WsConnect(_) | Self::WsClosed | Self::Timeout(_) => true,
            Self::Rejected { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

impl ErrorCode for SyncError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::WsConnect(_) | Self::WsClosed => "E_TRANSPORT",
            Self::Decode(_) => "E_BAD_FRAME",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Rejected { .. } => "E_REJECTED",
            Self::MissingField(_) | Self::InvalidJson(_) => "E_BAD_REPLY",
            Self::InvalidUrl(_) => "E_BAD_URL",
        }
    }

    fn retryable(&self) -> bool {
        self.is_transient()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
