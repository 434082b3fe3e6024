//! The channel pool.

use crate::slot::run_slot;
use crate::transport::{Connector, Transport};
use crate::{PoolConfig, ReplayStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tickmesh_types::SlotIndex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Events emitted by the pool to its single consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// The number of open slots changed.
    Peers(usize),
    /// An inbound payload, regardless of message type.
    Message {
        /// The slot the payload arrived on.
        slot: SlotIndex,
        /// The raw payload.
        bytes: Vec<u8>,
    },
}

/// State shared between the pool handle and the slot tasks.
pub(crate) struct Shared {
    slots: Vec<Mutex<Option<Arc<dyn Transport>>>>,
    events: mpsc::Sender<PoolEvent>,
}

impl Shared {
    pub(crate) fn install(&self, slot: SlotIndex, transport: Arc<dyn Transport>) -> usize {
        *self.slots[slot.0].lock() = Some(transport);
        self.count_open()
    }

    pub(crate) fn remove(&self, slot: SlotIndex) -> usize {
        *self.slots[slot.0].lock() = None;
        self.count_open()
    }

    pub(crate) fn count_open(&self) -> usize {
        self.slots.iter().filter(|s| s.lock().is_some()).count()
    }

    pub(crate) async fn emit(&self, event: PoolEvent) {
        // A dropped consumer only matters during shutdown.
        let _ = self.events.send(event).await;
    }
}

/// A fixed-size set of logical peer slots, each independently opening,
/// monitoring and re-opening a transport channel.
pub struct ChannelPool {
    shared: Arc<Shared>,
    replay: Arc<ReplayStore>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChannelPool {
    /// Launch the pool: one lifecycle task per slot.
    ///
    /// Returns the pool handle and the single-consumer event stream.
    pub fn launch(
        config: PoolConfig,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::Receiver<PoolEvent>) {
        let (events_tx, events_rx) = mpsc::channel(1024);
        let shared = Arc::new(Shared {
            slots: (0..config.slots).map(|_| Mutex::new(None)).collect(),
            events: events_tx,
        });
        let replay = Arc::new(ReplayStore::new());
        let cancel = CancellationToken::new();

        let tasks = (0..config.slots)
            .map(|i| {
                tokio::spawn(run_slot(
                    SlotIndex(i),
                    config.clone(),
                    connector.clone(),
                    shared.clone(),
                    replay.clone(),
                    cancel.child_token(),
                ))
            })
            .collect();

        (
            Self {
                shared,
                replay,
                cancel,
                tasks: Mutex::new(tasks),
            },
            events_rx,
        )
    }

    /// Send bytes on one slot. Returns false if the slot is not open.
    pub fn send(&self, slot: SlotIndex, bytes: Vec<u8>) -> bool {
        let transport = self.shared.slots[slot.0].lock().clone();
        match transport {
            Some(transport) => transport.send(bytes).is_ok(),
            None => false,
        }
    }

    /// Send bytes on every open slot except the origin. Returns the
    /// number of slots reached.
    pub fn broadcast_except(&self, origin: Option<SlotIndex>, bytes: &[u8]) -> usize {
        let mut reached = 0;
        for (i, slot) in self.shared.slots.iter().enumerate() {
            if Some(SlotIndex(i)) == origin {
                continue;
            }
            let transport = slot.lock().clone();
            if let Some(transport) = transport {
                if transport.send(bytes.to_vec()).is_ok() {
                    reached += 1;
                }
            }
        }
        reached
    }

    /// Number of slots currently open.
    pub fn peer_count(&self) -> usize {
        self.shared.count_open()
    }

    /// Open/closed state per slot, for propagation decisions.
    pub fn open_slots(&self) -> Vec<bool> {
        self.shared
            .slots
            .iter()
            .map(|s| s.lock().is_some())
            .collect()
    }

    /// Close a slot's channel (it will reconnect with backoff). Used by
    /// consumers to drop a peer after a protocol violation. Closing a
    /// slot that is not open is a no-op.
    pub fn disconnect(&self, slot: SlotIndex) {
        let transport = self.shared.slots[slot.0].lock().clone();
        if let Some(transport) = transport {
            transport.close();
        }
    }

    /// The store of messages replayed to freshly opened channels.
    pub fn replay_store(&self) -> Arc<ReplayStore> {
        self.replay.clone()
    }

    /// Close all slots and cancel every pending timer. Idempotent; after
    /// return no task can resurrect a slot.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
    }
}
