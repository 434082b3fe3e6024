//! Scripted handshake collaborator.

use crate::memory::{memory_channel, PeerHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tickmesh_pool::{Channel, ConnectError, Connector};
use tickmesh_types::SlotIndex;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// What the next connect attempt on a slot should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The handshake fails immediately.
    Fail,
    /// The handshake succeeds with a fresh in-memory channel.
    Open,
}

struct Inner {
    queues: HashMap<usize, VecDeque<ConnectOutcome>>,
    attempts: HashMap<usize, Vec<Instant>>,
}

/// A connector whose per-slot outcomes are queued by the test.
///
/// Unscripted attempts fail, so idle slots just keep backing off.
/// Every successful open is reported on the `opened` channel together
/// with its scripted far side.
pub struct ScriptedConnector {
    inner: Mutex<Inner>,
    opened: mpsc::UnboundedSender<(SlotIndex, PeerHandle)>,
}

impl ScriptedConnector {
    /// Create a connector and the stream of opened channels.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SlotIndex, PeerHandle)>) {
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Mutex::new(Inner {
                    queues: HashMap::new(),
                    attempts: HashMap::new(),
                }),
                opened: opened_tx,
            },
            opened_rx,
        )
    }

    /// Queue the outcome of the next connect attempt on a slot.
    pub fn enqueue(&self, slot: SlotIndex, outcome: ConnectOutcome) {
        self.inner
            .lock()
            .queues
            .entry(slot.0)
            .or_default()
            .push_back(outcome);
    }

    /// Queue `count` copies of an outcome.
    pub fn enqueue_many(&self, slot: SlotIndex, outcome: ConnectOutcome, count: usize) {
        for _ in 0..count {
            self.enqueue(slot, outcome);
        }
    }

    /// Times at which connect attempts were made on a slot.
    pub fn attempts(&self, slot: SlotIndex) -> Vec<Instant> {
        self.inner
            .lock()
            .attempts
            .get(&slot.0)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, slot: SlotIndex) -> Result<Channel, ConnectError> {
        let outcome = {
            let mut inner = self.inner.lock();
            inner
                .attempts
                .entry(slot.0)
                .or_default()
                .push(Instant::now());
            inner
                .queues
                .get_mut(&slot.0)
                .and_then(|queue| queue.pop_front())
                .unwrap_or(ConnectOutcome::Fail)
        };

        match outcome {
            ConnectOutcome::Fail => Err(ConnectError("scripted failure".into())),
            ConnectOutcome::Open => {
                let (channel, peer) = memory_channel();
                let _ = self.opened.send((slot, peer));
                Ok(channel)
            }
        }
    }
}
