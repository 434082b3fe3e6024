//! Actions returned by the consensus tracker.
//!
//! The tracker performs no I/O; the runner executes each action against
//! the propagation engine, the channel pool and the node event stream.

use tickmesh_messages::TICK_DIGEST_COUNT;
use tickmesh_types::{Committee, Epoch, Hash, MemberIndex, TickNumber};

/// A finalized tick record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedTick {
    /// The finalized tick number.
    pub tick: TickNumber,
    /// Epoch the tick belongs to.
    pub epoch: Epoch,
    /// The member whose submission completed the quorum.
    pub member: MemberIndex,
    /// The quorum digest vector.
    pub digests: [Hash; TICK_DIGEST_COUNT],
    /// Digest of the tick's transaction set, retained after the working
    /// set is discarded.
    pub tx_digest: Hash,
}

/// A committee alignment change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentEvent {
    /// The newly adopted epoch.
    pub epoch: Epoch,
    /// Number of slots agreeing on the committee digest.
    pub alignment: u32,
    /// The active committee.
    pub committee: Committee,
}

/// Instructions for the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Relay the message on the other slots via the propagation engine.
    Propagate,

    /// Close and reconnect the slot that delivered the message.
    Disconnect,

    /// Epoch reputation cutover: clear the solution dedup records and
    /// the verifier's per-member nonce sets.
    ClearSolutionState,

    /// Notify the owning application of an alignment change.
    EmitAlignment(AlignmentEvent),

    /// Notify the owning application of a finalized tick.
    EmitFinalizedTick(FinalizedTick),
}

impl Action {
    /// Get a human-readable name for this action.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Propagate => "Propagate",
            Action::Disconnect => "Disconnect",
            Action::ClearSolutionState => "ClearSolutionState",
            Action::EmitAlignment(_) => "EmitAlignment",
            Action::EmitFinalizedTick(_) => "EmitFinalizedTick",
        }
    }
}
