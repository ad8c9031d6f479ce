//! End-to-end match lifecycle through the registry and the hub

use std::sync::Arc;
use std::time::Duration;

use pong_server::game::body::Size;
use pong_server::game::{EndReason, GameSettings, MatchRegistry, MatchStatus, Side};
use pong_server::messaging::ConnectionHub;
use pong_server::store::{InMemoryMatchStore, StoreCall};
use pong_server::ws::protocol::{decode_server, ServerMsg};
use tokio::sync::mpsc;
use uuid::Uuid;

struct Harness {
    hub: Arc<ConnectionHub>,
    store: Arc<InMemoryMatchStore>,
    registry: Arc<MatchRegistry>,
}

fn harness(settings: GameSettings) -> Harness {
    let hub = Arc::new(ConnectionHub::new());
    let store = Arc::new(InMemoryMatchStore::new());
    let registry = Arc::new(MatchRegistry::new(settings, hub.clone(), store.clone()));
    Harness {
        hub,
        store,
        registry,
    }
}

fn drain(inbox: &mut mpsc::Receiver<String>) -> Vec<ServerMsg> {
    let mut out = Vec::new();
    while let Ok(text) = inbox.try_recv() {
        out.push(decode_server(&text).expect("server message decodes"));
    }
    out
}

fn end_calls(store: &InMemoryMatchStore, match_id: i64) -> Vec<StoreCall> {
    store
        .calls_for(match_id)
        .into_iter()
        .filter(|c| matches!(c, StoreCall::End { .. }))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn remote_match_streams_side_relative_state() {
    let h = harness(GameSettings::default());
    let (left, right) = (Uuid::new_v4(), Uuid::new_v4());
    let (_, mut left_inbox) = h.hub.connect(left);
    let (_, mut right_inbox) = h.hub.connect(right);

    h.registry.create_remote_match(42, left, right).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let left_msgs = drain(&mut left_inbox);
    let right_msgs = drain(&mut right_inbox);
    assert!(!left_msgs.is_empty());
    assert_eq!(left_msgs.len(), right_msgs.len());

    for (l, r) in left_msgs.iter().zip(&right_msgs) {
        match (l, r) {
            (ServerMsg::State(l), ServerMsg::State(r)) => {
                assert_eq!(l.side, Side::Left);
                assert_eq!(r.side, Side::Right);
                assert_eq!(l.ball, r.ball);
                assert_eq!(l.paddles, r.paddles);
            }
            other => panic!("unexpected pair {:?}", other),
        }
    }
    assert_eq!(h.store.calls_for(42)[0], StoreCall::Start { match_id: 42 });
}

#[tokio::test(start_paused = true)]
async fn socket_input_moves_only_the_senders_paddle() {
    let h = harness(GameSettings::default());
    let (left, right) = (Uuid::new_v4(), Uuid::new_v4());
    let (_, _left_inbox) = h.hub.connect(left);
    let (_, _right_inbox) = h.hub.connect(right);
    let handle = h.registry.create_remote_match(7, left, right).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.hub
        .dispatch(right, r#"{"topic":"pong","type":"input","down":true}"#)
        .unwrap();
    // a clientId claiming another identity is dropped
    let spoof = format!(
        r#"{{"topic":"pong","type":"input","clientId":"{}","up":true}}"#,
        left
    );
    h.hub.dispatch(right, &spoof).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let view = handle.state();
    assert_eq!(view.paddles.p1_y, 200.0);
    assert!(view.paddles.p2_y > 200.0);
    assert!(view.paddles.p2_input.down);
}

#[tokio::test(start_paused = true)]
async fn local_owner_disconnect_ends_and_removes_match() {
    let h = harness(GameSettings::default());
    let owner = Uuid::new_v4();
    let (connection, mut inbox) = h.hub.connect(owner);
    let handle = h.registry.create_local_match(owner).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.status(), MatchStatus::Ongoing);

    h.hub.disconnect(owner, connection);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.registry.get(handle.id).is_none());
    assert_eq!(handle.status(), MatchStatus::Ended);
    assert_eq!(
        end_calls(&h.store, handle.id),
        vec![StoreCall::End {
            match_id: handle.id,
            reason: EndReason::Disconnected
        }]
    );
    // nothing after the final message
    let before = drain(&mut inbox).len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(drain(&mut inbox).len(), 0);
    assert!(before > 0);
}

#[tokio::test(start_paused = true)]
async fn remote_disconnect_keeps_match_running() {
    let h = harness(GameSettings::default());
    let (left, right) = (Uuid::new_v4(), Uuid::new_v4());
    let (left_conn, _left_inbox) = h.hub.connect(left);
    let (_, _right_inbox) = h.hub.connect(right);
    let handle = h.registry.create_remote_match(3, left, right).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    h.hub.disconnect(left, left_conn);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(handle.status(), MatchStatus::Ongoing);
    assert!(h.registry.get(3).is_some());
    assert!(end_calls(&h.store, 3).is_empty());
}

#[tokio::test(start_paused = true)]
async fn match_without_participants_is_abandoned() {
    let settings = GameSettings {
        join_timeout: Duration::from_secs(2),
        ..GameSettings::default()
    };
    let h = harness(settings);

    let handle = h
        .registry
        .create_remote_match(9, Uuid::new_v4(), Uuid::new_v4())
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.status(), MatchStatus::Initialised);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(h.registry.get(9).is_none());
    assert_eq!(
        end_calls(&h.store, 9),
        vec![StoreCall::End {
            match_id: 9,
            reason: EndReason::Abandoned
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn unattended_match_plays_out_to_win_score() {
    // Zero-height paddles never block, so every serve is a point.
    let settings = GameSettings {
        win_score: 2,
        paddle_size: Size::new(10.0, 0.0),
        ..GameSettings::default()
    };
    let h = harness(settings);
    let owner = Uuid::new_v4();
    let (_, mut inbox) = h.hub.connect(owner);
    let handle = h.registry.create_local_match(owner).unwrap();

    let mut waited = 0;
    while h.registry.get(handle.id).is_some() && waited < 60 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        drain(&mut inbox);
        waited += 1;
    }
    assert!(h.registry.get(handle.id).is_none(), "match never finished");

    let view = handle.state();
    assert_eq!(view.status, MatchStatus::Ended);
    assert_eq!(view.score.p1.max(view.score.p2), 2);

    let calls = h.store.calls_for(handle.id);
    let scores = calls
        .iter()
        .filter(|c| matches!(c, StoreCall::Score { .. }))
        .count() as u32;
    assert_eq!(scores, view.score.p1 + view.score.p2);
    assert_eq!(
        calls.last(),
        Some(&StoreCall::End {
            match_id: handle.id,
            reason: EndReason::ScoreLimit
        })
    );
}
