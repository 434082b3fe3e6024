//! Transport abstraction over the external handshake collaborator.
//!
//! The pool never opens sockets itself. A [`Connector`] performs the
//! session negotiation and hands back an open [`Transport`] plus its
//! event stream, already demultiplexed per logical slot index.

use async_trait::async_trait;
use thiserror::Error;
use tickmesh_types::SlotIndex;
use tokio::sync::mpsc;

/// Events surfaced by an open transport channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// An inbound byte payload.
    Message(Vec<u8>),
    /// The channel closed (remote close or transport failure).
    Closed,
}

/// Errors sending on a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The channel is no longer open.
    #[error("transport closed")]
    Closed,
}

/// A byte-message channel to one peer.
///
/// Contract: `close` is idempotent, and closing (from either side) must
/// end the channel's event stream with a [`ChannelEvent::Closed`] or by
/// dropping the sender. `send` enqueues without blocking; delivery is
/// best-effort.
pub trait Transport: Send + Sync {
    /// Queue bytes for delivery to the peer.
    fn send(&self, bytes: Vec<u8>) -> Result<(), TransportError>;

    /// Close the channel. Closing an already-closed channel is a no-op.
    fn close(&self);
}

/// An open channel as delivered by the handshake collaborator.
pub struct Channel {
    /// The send/close half.
    pub transport: Box<dyn Transport>,
    /// Inbound events. Ends when the channel closes.
    pub events: mpsc::Receiver<ChannelEvent>,
}

/// Errors establishing a channel.
#[derive(Debug, Clone, Error)]
#[error("handshake failed: {0}")]
pub struct ConnectError(pub String);

/// The external session-negotiation collaborator.
///
/// `connect` resolves once the channel for the given slot is open.
/// Handshake failures are transient: the pool retries with backoff,
/// indefinitely.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establish the transport channel for a slot.
    async fn connect(&self, slot: SlotIndex) -> Result<Channel, ConnectError>;
}
