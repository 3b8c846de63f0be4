use super::*;

#[test]
fn ws_url_maps_schemes_and_escapes_identity() {
    assert_eq!(
        ws_url("http://127.0.0.1:3000/", "alice", "Alice B").unwrap(),
        "ws://127.0.0.1:3000/api/ws?user_id=alice&user_name=Alice%20B"
    );
    assert_eq!(
        ws_url("https://draw.example", "u&1", "Zoë").unwrap(),
        "wss://draw.example/api/ws?user_id=u%261&user_name=Zo%C3%AB"
    );
    assert!(ws_url("ws://host", "a", "b").unwrap().starts_with("ws://host/api/ws?"));
}

#[test]
fn ws_url_rejects_unknown_scheme() {
    assert!(matches!(ws_url("ftp://host", "a", "b"), Err(SyncError::InvalidUrl(_))));
    assert!(matches!(ws_url("host:3000", "a", "b"), Err(SyncError::InvalidUrl(_))));
}

#[test]
fn ws_url_escapes_reserved_but_keeps_unreserved() {
    assert_eq!(
        ws_url("http://host", "a-b_c.d~9", "a/b?c").unwrap(),
        "ws://host/api/ws?user_id=a-b_c.d~9&user_name=a%2Fb%3Fc"
    );
}

#[test]
fn terminal_reply_resolves_pending_request() {
    let mut routes = Routes::default();
    let req = Frame::request("stroke:list", None, json!({}));
    let (tx, mut rx) = oneshot::channel();
    routes.pending.insert(req.id.clone(), tx);

    let mut item = req.clone();
    item.parent_id = Some(req.id.clone());
    item.status = Status::Item;
    routes.dispatch(item);
    assert!(rx.try_recv().is_err());
    assert_eq!(routes.pending.len(), 1);

    let mut done = req.clone();
    done.parent_id = Some(req.id.clone());
    done.status = Status::Done;
    routes.dispatch(done);
    assert_eq!(rx.try_recv().unwrap().status, Status::Done);
    assert!(routes.pending.is_empty());
}

#[test]
fn events_fan_out_by_room_and_drop_closed_listeners() {
    let mut routes = Routes::default();
    let room = Uuid::new_v4();
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let (tx_gone, rx_gone) = mpsc::unbounded_channel();
    drop(rx_gone);
    routes.listeners.insert(0, Listener { room_id: room.to_string(), tx: tx_a });
    routes.listeners.insert(1, Listener { room_id: Uuid::new_v4().to_string(), tx: tx_b });
    routes.listeners.insert(2, Listener { room_id: room.to_string(), tx: tx_gone });

    routes.dispatch(RoomEvent::Cleared { room_id: room.to_string() }.to_frame());

    assert_eq!(rx_a.try_recv().unwrap(), RoomEvent::Cleared { room_id: room.to_string() });
    assert!(rx_b.try_recv().is_err());
    assert_eq!(routes.listeners.len(), 2);
}

#[test]
fn close_fails_waiters_and_ends_streams() {
    let mut routes = Routes::default();
    let (tx, mut rx) = oneshot::channel::<Frame>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    routes.pending.insert("r".into(), tx);
    routes.listeners.insert(0, Listener { room_id: "room".into(), tx: event_tx });

    routes.close();

    assert!(routes.closed);
    assert!(matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Closed)));
    assert!(matches!(event_rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
}
