//! Core types for the tickmesh protocol.
//!
//! Hashing, signing and verification wrap fixed-size primitives (32-byte
//! keys and digests, 64-byte signatures); everything above this crate
//! treats them as a trusted black box.

mod committee;
mod crypto;
mod hash;
mod identifiers;

pub use committee::{Committee, CommitteeError, COMMITTEE_SIZE, QUORUM};
pub use crypto::{KeyPair, PublicKey, Signature, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
pub use hash::Hash;
pub use identifiers::{Epoch, MemberIndex, SlotIndex, TickNumber};

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    //! Deterministic key material for tests.

    use crate::{Hash, KeyPair};

    /// Deterministic keypair for a test index.
    pub fn keypair(n: u64) -> KeyPair {
        let seed = Hash::from_parts(&[b"tickmesh-test-key", &n.to_le_bytes()]);
        KeyPair::from_seed_bytes(seed.as_bytes())
    }

    /// Deterministic root-authority keypair.
    pub fn root_keypair() -> KeyPair {
        let seed = Hash::from_bytes(b"tickmesh-test-root-authority");
        KeyPair::from_seed_bytes(seed.as_bytes())
    }
}
