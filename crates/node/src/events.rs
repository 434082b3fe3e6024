//! Events emitted to the owning application.

use tickmesh_consensus::{AlignmentEvent, FinalizedTick};

/// Node events; any subscriber sees every event.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// The number of open mesh channels changed.
    Peers(usize),

    /// A raw inbound payload, emitted for every frame that passes
    /// header validation, regardless of type.
    Message(Vec<u8>),

    /// A committee alignment change.
    Committee(AlignmentEvent),

    /// A tick was finalized by quorum.
    Tick(FinalizedTick),

    /// A transaction was accepted for relay (first sight).
    Transaction(Vec<u8>),
}

impl NodeEvent {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeEvent::Peers(_) => "Peers",
            NodeEvent::Message(_) => "Message",
            NodeEvent::Committee(_) => "Committee",
            NodeEvent::Tick(_) => "Tick",
            NodeEvent::Transaction(_) => "Transaction",
        }
    }
}
