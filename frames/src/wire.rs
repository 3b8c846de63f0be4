//! Protobuf encoding of [`Frame`].
//!
//! The payload is carried as a `google.protobuf.Value`, so any JSON object
//! survives the trip. Protobuf has a single double number type; whole numbers
//! that fit a double exactly decode as JSON integers again.

use prost::Message;
use prost_types::value::Kind;
use prost_types::{ListValue, NullValue, Struct};
use serde_json::Value;

use crate::{Frame, Status};

/// Largest integer a double represents without gaps (2^53).
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("unknown frame status {0}")]
    InvalidStatus(i32),
}

#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    // `WireFrame::from` resolves to prost's getter for the `from` field.
    let wire: WireFrame = frame.into();
    wire.encode_to_vec()
}

/// # Errors
///
/// [`CodecError::Decode`] when the bytes are not a frame,
/// [`CodecError::InvalidStatus`] when the status number is unknown.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    Frame::try_from(WireFrame::decode(bytes)?)
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct WireFrame {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, optional, tag = "2")]
    pub parent_id: Option<String>,
    #[prost(int64, tag = "3")]
    pub ts: i64,
    #[prost(string, optional, tag = "4")]
    pub room_id: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub from: Option<String>,
    #[prost(string, tag = "6")]
    pub syscall: String,
    #[prost(enumeration = "WireStatus", tag = "7")]
    pub status: i32,
    #[prost(message, optional, tag = "8")]
    pub data: Option<prost_types::Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub(crate) enum WireStatus {
    Request = 0,
    Done = 1,
    Error = 2,
    Cancel = 3,
    Item = 4,
    Bulk = 5,
}

impl From<Status> for WireStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Request => Self::Request,
            Status::Item => Self::Item,
            Status::Bulk => Self::Bulk,
            Status::Done => Self::Done,
            Status::Error => Self::Error,
            Status::Cancel => Self::Cancel,
        }
    }
}

impl From<WireStatus> for Status {
    fn from(status: WireStatus) -> Self {
        match status {
            WireStatus::Request => Self::Request,
            WireStatus::Item => Self::Item,
            WireStatus::Bulk => Self::Bulk,
            WireStatus::Done => Self::Done,
            WireStatus::Error => Self::Error,
            WireStatus::Cancel => Self::Cancel,
        }
    }
}

impl From<&Frame> for WireFrame {
    fn from(frame: &Frame) -> Self {
        Self {
            id: frame.id.clone(),
            parent_id: frame.parent_id.clone(),
            ts: frame.ts,
            room_id: frame.room_id.clone(),
            from: frame.from.clone(),
            syscall: frame.syscall.clone(),
            status: WireStatus::from(frame.status).into(),
            data: Some(to_proto(&frame.data)),
        }
    }
}

impl TryFrom<WireFrame> for Frame {
    type Error = CodecError;

    fn try_from(wire: WireFrame) -> Result<Self, Self::Error> {
        let status = WireStatus::try_from(wire.status).map_err(|_| CodecError::InvalidStatus(wire.status))?;
        let data = wire.data.as_ref().map_or_else(|| Value::Object(serde_json::Map::new()), from_proto);
        Ok(Self {
            id: wire.id,
            parent_id: wire.parent_id,
            ts: wire.ts,
            room_id: wire.room_id,
            from: wire.from,
            syscall: wire.syscall,
            status: status.into(),
            data,
        })
    }
}

pub(crate) fn to_proto(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => Kind::NullValue(NullValue::NullValue.into()),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(items) => Kind::ListValue(ListValue { values: items.iter().map(to_proto).collect() }),
        Value::Object(map) => Kind::StructValue(Struct {
            fields: map.iter().map(|(key, item)| (key.clone(), to_proto(item))).collect(),
        }),
    };
    prost_types::Value { kind: Some(kind) }
}

fn from_proto(value: &prost_types::Value) -> Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::NumberValue(n)) => number(*n),
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(list)) => list.values.iter().map(from_proto).collect(),
        Some(Kind::StructValue(fields)) => {
            Value::Object(fields.fields.iter().map(|(key, item)| (key.clone(), from_proto(item))).collect())
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < EXACT_INT_LIMIT {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;
