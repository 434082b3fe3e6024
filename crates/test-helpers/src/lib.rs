//! Shared test fixtures.
//!
//! In-memory transports and a scripted handshake collaborator, so pool
//! and node tests run against a fully in-process mesh with a simulated
//! clock.

mod memory;
mod scripted;

pub use memory::{memory_channel, PeerHandle};
pub use scripted::{ConnectOutcome, ScriptedConnector};

use tickmesh_types::test_utils::keypair;
use tickmesh_types::{KeyPair, PublicKey};

/// Deterministic committee member keypairs plus their public keys.
pub fn test_committee(count: usize) -> (Vec<KeyPair>, Vec<PublicKey>) {
    let members: Vec<KeyPair> = (0..count as u64).map(keypair).collect();
    let keys = members.iter().map(|k| k.public_key()).collect();
    (members, keys)
}
