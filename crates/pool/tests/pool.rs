//! Channel pool lifecycle tests against a simulated clock.

use std::sync::Arc;
use std::time::Duration;
use tickmesh_pool::{ChannelPool, PoolConfig, PoolEvent};
use tickmesh_test_helpers::{ConnectOutcome, ScriptedConnector};
use tickmesh_types::SlotIndex;
use tokio::sync::mpsc;

fn config(slots: usize) -> PoolConfig {
    PoolConfig {
        slots,
        min_attempt_window: Duration::from_secs(6),
        backoff_step: Duration::from_millis(100),
        inactivity_window: Duration::from_secs(10),
        rotation_lifetime: Duration::from_secs(60),
    }
}

async fn wait_for_attempts(connector: &ScriptedConnector, slot: SlotIndex, count: usize) {
    while connector.attempts(slot).len() < count {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn next_event(events: &mut mpsc::Receiver<PoolEvent>) -> PoolEvent {
    events.recv().await.expect("pool event stream alive")
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_per_failure_and_resets_on_success() {
    let (connector, mut opened) = ScriptedConnector::new();
    let connector = Arc::new(connector);
    let slot = SlotIndex(0);

    // Ten consecutive synthetic failures, then a success.
    connector.enqueue_many(slot, ConnectOutcome::Fail, 10);
    connector.enqueue(slot, ConnectOutcome::Open);

    let (_pool, _events) = ChannelPool::launch(config(1), connector.clone());

    wait_for_attempts(&connector, slot, 11).await;
    let attempts = connector.attempts(slot);
    let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();

    // Attempt N+1 is scheduled strictly later than attempt N.
    for pair in gaps.windows(2) {
        assert!(
            pair[1] > pair[0],
            "backoff must grow: {:?} then {:?}",
            pair[0],
            pair[1]
        );
    }

    // The 11th attempt opened; a remote close after success restarts the
    // backoff from one step.
    let (_, peer) = opened.recv().await.expect("channel opened");
    peer.close().await;

    wait_for_attempts(&connector, slot, 12).await;
    let attempts = connector.attempts(slot);
    let reset_gap = attempts[11] - attempts[10];
    let last_failure_gap = *gaps.last().unwrap();
    assert!(
        reset_gap < last_failure_gap,
        "success must reset the failure counter"
    );
}

#[tokio::test(start_paused = true)]
async fn test_open_slot_forwards_messages_both_ways() {
    let (connector, mut opened) = ScriptedConnector::new();
    let connector = Arc::new(connector);
    connector.enqueue(SlotIndex(0), ConnectOutcome::Open);

    let (pool, mut events) = ChannelPool::launch(config(2), connector.clone());
    let (slot, peer) = opened.recv().await.expect("channel opened");
    assert_eq!(slot, SlotIndex(0));
    assert_eq!(next_event(&mut events).await, PoolEvent::Peers(1));
    assert_eq!(pool.peer_count(), 1);
    assert_eq!(pool.open_slots(), vec![true, false]);

    // Inbound payloads surface regardless of content.
    peer.deliver(b"payload".to_vec()).await;
    assert_eq!(
        next_event(&mut events).await,
        PoolEvent::Message {
            slot: SlotIndex(0),
            bytes: b"payload".to_vec()
        }
    );

    // Outbound send reaches the peer.
    assert!(pool.send(SlotIndex(0), b"reply".to_vec()));
    assert_eq!(peer.next_sent().await, Some(b"reply".to_vec()));

    // Broadcast excluding the origin reaches nobody else (slot 1 closed).
    assert_eq!(pool.broadcast_except(Some(SlotIndex(0)), b"x"), 0);
    // Without the exclusion the open slot is reached.
    assert_eq!(pool.broadcast_except(None, b"x"), 1);

    pool.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_silent_channel_is_closed_and_reopened() {
    let (connector, mut opened) = ScriptedConnector::new();
    let connector = Arc::new(connector);
    let slot = SlotIndex(0);
    connector.enqueue(slot, ConnectOutcome::Open);
    connector.enqueue(slot, ConnectOutcome::Open);

    let (pool, mut events) = ChannelPool::launch(config(1), connector.clone());
    let (_, peer) = opened.recv().await.expect("channel opened");
    assert_eq!(next_event(&mut events).await, PoolEvent::Peers(1));

    // Activity pushes the inactivity deadline out.
    tokio::time::sleep(Duration::from_secs(6)).await;
    peer.deliver(b"keepalive".to_vec()).await;
    let _ = next_event(&mut events).await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(!peer.is_closed(), "active channel must stay open");

    // Silence past the window closes the channel.
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(peer.is_closed(), "silent channel must be closed");
    assert_eq!(next_event(&mut events).await, PoolEvent::Peers(0));

    // And the slot reconnects.
    let (_, _peer2) = opened.recv().await.expect("slot reopened");
    assert_eq!(next_event(&mut events).await, PoolEvent::Peers(1));

    pool.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_last_slot_rotates_even_when_healthy() {
    let (connector, mut opened) = ScriptedConnector::new();
    let connector = Arc::new(connector);
    let mut cfg = config(2);
    // Isolate rotation from the inactivity timeout.
    cfg.inactivity_window = Duration::from_secs(3600);
    connector.enqueue(SlotIndex(0), ConnectOutcome::Open);
    connector.enqueue(SlotIndex(1), ConnectOutcome::Open);

    let (pool, _events) = ChannelPool::launch(cfg, connector.clone());
    let mut peers = Vec::new();
    for _ in 0..2 {
        peers.push(opened.recv().await.expect("channel opened"));
    }

    tokio::time::sleep(Duration::from_secs(61)).await;
    for (slot, peer) in &peers {
        if *slot == SlotIndex(1) {
            assert!(peer.is_closed(), "last slot must rotate");
        } else {
            assert!(!peer.is_closed(), "non-rotating slot must stay open");
        }
    }

    pool.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_closes_and_reconnects() {
    let (connector, mut opened) = ScriptedConnector::new();
    let connector = Arc::new(connector);
    let slot = SlotIndex(0);
    connector.enqueue(slot, ConnectOutcome::Open);
    connector.enqueue(slot, ConnectOutcome::Open);

    let (pool, mut events) = ChannelPool::launch(config(1), connector.clone());
    let (_, peer) = opened.recv().await.expect("channel opened");
    assert_eq!(next_event(&mut events).await, PoolEvent::Peers(1));

    // A consumer-reported protocol violation drops the peer.
    pool.disconnect(slot);
    // Disconnecting again is a no-op.
    pool.disconnect(slot);

    assert_eq!(next_event(&mut events).await, PoolEvent::Peers(0));
    assert!(peer.is_closed());

    let _ = opened.recv().await.expect("slot reopened");
    assert_eq!(next_event(&mut events).await, PoolEvent::Peers(1));

    pool.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_fresh_peer_receives_replayed_messages() {
    let (connector, mut opened) = ScriptedConnector::new();
    let connector = Arc::new(connector);
    let slot = SlotIndex(0);

    let (pool, _events) = ChannelPool::launch(config(1), connector.clone());
    pool.replay_store().set_committee(b"committee".to_vec());
    pool.replay_store().set_ticks(vec![b"tick".to_vec()]);

    connector.enqueue(slot, ConnectOutcome::Open);
    let (_, peer) = opened.recv().await.expect("channel opened");

    assert_eq!(peer.next_sent().await, Some(b"committee".to_vec()));
    assert_eq!(peer.next_sent().await, Some(b"tick".to_vec()));

    pool.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_reconnects() {
    let (connector, _opened) = ScriptedConnector::new();
    let connector = Arc::new(connector);

    let (pool, _events) = ChannelPool::launch(config(2), connector.clone());
    wait_for_attempts(&connector, SlotIndex(0), 3).await;

    pool.shutdown().await;
    let before: Vec<usize> = (0..2)
        .map(|i| connector.attempts(SlotIndex(i)).len())
        .collect();

    // No timer may resurrect a slot after shutdown.
    tokio::time::sleep(Duration::from_secs(3600)).await;
    let after: Vec<usize> = (0..2)
        .map(|i| connector.attempts(SlotIndex(i)).len())
        .collect();
    assert_eq!(before, after);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_open_channels() {
    let (connector, mut opened) = ScriptedConnector::new();
    let connector = Arc::new(connector);
    connector.enqueue(SlotIndex(0), ConnectOutcome::Open);

    let (pool, _events) = ChannelPool::launch(config(1), connector.clone());
    let (_, peer) = opened.recv().await.expect("channel opened");

    pool.shutdown().await;
    assert!(peer.is_closed());
}
