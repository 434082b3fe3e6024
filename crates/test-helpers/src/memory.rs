//! In-memory transport channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tickmesh_pool::{Channel, ChannelEvent, Transport, TransportError};
use tokio::sync::{mpsc, Mutex};

/// The scripted far side of an in-memory channel.
pub struct PeerHandle {
    sent: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    events: mpsc::Sender<ChannelEvent>,
    closed: Arc<AtomicBool>,
}

impl PeerHandle {
    /// Deliver a payload to the pool side.
    pub async fn deliver(&self, bytes: Vec<u8>) {
        let _ = self.events.send(ChannelEvent::Message(bytes)).await;
    }

    /// Close the channel from the remote side.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.events.send(ChannelEvent::Closed).await;
    }

    /// Pop the next payload the pool sent, if any.
    pub fn try_sent(&self) -> Option<Vec<u8>> {
        self.sent.try_lock().ok()?.try_recv().ok()
    }

    /// Await the next payload the pool sent.
    pub async fn next_sent(&self) -> Option<Vec<u8>> {
        self.sent.lock().await.recv().await
    }

    /// Whether either side closed the channel.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MemoryTransport {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    events: mpsc::Sender<ChannelEvent>,
    closed: Arc<AtomicBool>,
}

impl Transport for MemoryTransport {
    fn send(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(bytes)
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        // Idempotent: only the first close emits the event.
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.events.try_send(ChannelEvent::Closed);
        }
    }
}

/// Create an open in-memory channel and its scripted far side.
pub fn memory_channel() -> (Channel, PeerHandle) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::channel(64);
    let closed = Arc::new(AtomicBool::new(false));

    let transport = MemoryTransport {
        outbound: outbound_tx,
        events: events_tx.clone(),
        closed: closed.clone(),
    };
    let channel = Channel {
        transport: Box::new(transport),
        events: events_rx,
    };
    let peer = PeerHandle {
        sent: Mutex::new(outbound_rx),
        events: events_tx,
        closed,
    };
    (channel, peer)
}
