use serde_json::json;

use super::*;

#[test]
fn only_done_error_and_cancel_close_an_exchange() {
    let closing: Vec<Status> = [Status::Request, Status::Item, Status::Bulk, Status::Done, Status::Error, Status::Cancel]
        .into_iter()
        .filter(|s| s.is_terminal())
        .collect();
    assert_eq!(closing, vec![Status::Done, Status::Error, Status::Cancel]);
}

#[test]
fn status_is_lowercase_in_json() {
    assert_eq!(serde_json::to_value(Status::Bulk).unwrap(), json!("bulk"));
    let parsed: Status = serde_json::from_value(json!("cancel")).unwrap();
    assert_eq!(parsed, Status::Cancel);
}

#[test]
fn request_gets_fresh_id_and_timestamp() {
    let a = Frame::request("room:join", Some("r1"), json!({}));
    let b = Frame::request("room:join", Some("r1"), json!({}));
    assert_ne!(a.id, b.id);
    assert!(uuid::Uuid::parse_str(&a.id).is_ok());
    assert_eq!(a.status, Status::Request);
    assert_eq!(a.room_id.as_deref(), Some("r1"));
    assert!(a.parent_id.is_none() && a.from.is_none());
    assert!(a.ts > 0);
}

#[test]
fn prefix_is_text_before_first_colon() {
    assert_eq!(Frame::request("cursor:update", None, json!({})).prefix(), "cursor");
    assert_eq!(Frame::request("a:b:c", None, json!({})).prefix(), "a");
    assert_eq!(Frame::request("ping", None, json!({})).prefix(), "ping");
}

#[test]
fn data_str_ignores_non_strings() {
    let frame = Frame::request("stroke:list", None, json!({"room_id": "r1", "seq": 3}));
    assert_eq!(frame.data_str("room_id"), Some("r1"));
    assert_eq!(frame.data_str("seq"), None);
    assert_eq!(frame.data_str("missing"), None);
}

#[test]
fn error_payload_accessors() {
    let mut frame = Frame::request("room:delete", None, json!({"code": "E_FORBIDDEN", "message": "not yours"}));
    frame.status = Status::Error;
    assert_eq!(frame.error_code(), Some("E_FORBIDDEN"));
    assert_eq!(frame.error_message(), "not yours");

    let bare = Frame::request("room:delete", None, json!({}));
    assert_eq!(bare.error_code(), None);
    assert_eq!(bare.error_message(), "request failed");
}
