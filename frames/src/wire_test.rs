use prost::Message;
use serde_json::json;

use super::*;

fn wire(status: i32, data: Option<prost_types::Value>) -> Vec<u8> {
    WireFrame {
        id: "f1".into(),
        parent_id: None,
        ts: 1,
        room_id: None,
        from: None,
        syscall: "stroke:list".into(),
        status,
        data,
    }
    .encode_to_vec()
}

#[test]
fn wire_status_numbers_are_stable() {
    let numbers: Vec<i32> = [Status::Request, Status::Done, Status::Error, Status::Cancel, Status::Item, Status::Bulk]
        .into_iter()
        .map(|s| WireStatus::from(s).into())
        .collect();
    assert_eq!(numbers, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn reply_frame_survives_encoding() {
    let frame = Frame {
        id: "f2".into(),
        parent_id: Some("f1".into()),
        ts: 1_700_000_000_000,
        room_id: Some("r1".into()),
        from: Some("alice".into()),
        syscall: "stroke:append".into(),
        status: Status::Done,
        data: json!({
            "stroke": {"seq": 4, "width": 2.5, "color": "#ff0000", "points": [{"x": 0, "y": 1.5}]},
            "eraser": false,
            "note": null
        }),
    };
    assert_eq!(decode_frame(&encode_frame(&frame)).unwrap(), frame);
}

#[test]
fn garbage_is_a_decode_error() {
    assert!(matches!(decode_frame(&[0xff, 0x00, 0x01]), Err(CodecError::Decode(_))));
}

#[test]
fn unknown_status_is_rejected() {
    let bytes = wire(42, Some(to_proto(&json!({}))));
    assert!(matches!(decode_frame(&bytes), Err(CodecError::InvalidStatus(42))));
}

#[test]
fn absent_payload_decodes_as_empty_object() {
    let frame = decode_frame(&wire(0, None)).unwrap();
    assert_eq!(frame.data, json!({}));
    assert_eq!(frame.status, Status::Request);
}

#[test]
fn non_finite_numbers_become_null() {
    let nan = prost_types::Value { kind: Some(Kind::NumberValue(f64::NAN)) };
    assert_eq!(decode_frame(&wire(0, Some(nan))).unwrap().data, Value::Null);
}

#[test]
fn whole_numbers_decode_as_integers() {
    let frame = Frame::request("stroke:list", None, json!({"seq": 9, "x": 0.25, "big": 1e300}));
    let back = decode_frame(&encode_frame(&frame)).unwrap();
    assert!(back.data["seq"].is_i64());
    assert_eq!(back.data["x"].as_f64(), Some(0.25));
    assert!(back.data["big"].is_f64());
}

#[test]
fn sender_lands_in_the_wire_from_field() {
    let mut frame = Frame::request("cursor:update", Some("r1"), json!({"x": 1, "y": 2}));
    frame.from = Some("alice".into());
    let wire = WireFrame::decode(encode_frame(&frame).as_slice()).unwrap();
    assert_eq!(wire.from(), "alice");
    assert_eq!(wire.room_id(), "r1");
    assert_eq!(wire.syscall, "cursor:update");
}
