//! Wire message layouts for the tickmesh protocol.
//!
//! Every message is a fixed-layout little-endian byte string: an 8-byte
//! header followed by a type-specific body read at explicit offsets.
//! Typed views borrow the raw bytes and expose field accessors; builders
//! produce fully-signed messages for tests and the transaction
//! broadcaster.

mod committee;
mod header;
mod solution;
mod tick;
mod transaction;

pub use committee::{
    build_committee, CommitteeView, COMMITTEE_EPOCH_OFFSET, COMMITTEE_KEYS_OFFSET,
    COMMITTEE_MESSAGE_LENGTH, COMMITTEE_SIGNATURE_OFFSET,
};
pub use header::{
    Header, MessageType, HEADER_LENGTH, PROTOCOL_VERSION_OFFSET, SIZE_OFFSET, TYPE_OFFSET,
};
pub use solution::{
    build_solution, SolutionTimestamp, SolutionView, NONCE_LENGTH, SOLUTION_MESSAGE_LENGTH,
    SOLUTION_NONCE_COUNT, SOLUTION_NONCES_OFFSET, SOLUTION_SIGNATURE_OFFSET,
};
pub use tick::{
    build_tick, TickView, TICK_DIGEST_COUNT, TICK_MESSAGE_LENGTH, TICK_NUMBER_OFFSET,
    TICK_SIGNATURE_OFFSET,
};
pub use transaction::{
    build_transaction, TransactionView, TX_BASE_MESSAGE_LENGTH, TX_TICK_OFFSET,
};

use thiserror::Error;
use tickmesh_types::Hash;

/// Errors that can occur while decoding wire messages.
///
/// Every variant is a protocol violation: the slot that delivered the
/// message must be closed and reconnected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Message shorter than the wire header.
    #[error("message too short: {actual} bytes")]
    TooShort {
        /// Actual message length.
        actual: usize,
    },

    /// Declared length does not match the delivered payload.
    #[error("declared length {declared} does not match actual length {actual}")]
    LengthMismatch {
        /// Length claimed in the header.
        declared: usize,
        /// Delivered payload length.
        actual: usize,
    },

    /// Remote speaks a different protocol version.
    #[error("protocol version {received}, expected {expected}")]
    ProtocolMismatch {
        /// Version claimed in the header.
        received: u16,
        /// Local protocol version.
        expected: u16,
    },

    /// Body length wrong for the declared message type.
    #[error("wrong {kind} message length: expected {expected}, got {actual}")]
    WrongLength {
        /// Message kind being parsed.
        kind: &'static str,
        /// Expected body length.
        expected: usize,
        /// Actual body length.
        actual: usize,
    },
}

/// Canonical signing digest with the type-tag canonicalization: the low
/// byte of the message type code is XORed into the first byte of the
/// signed region before hashing. Signers apply the same flip, so the
/// digest binds the message type without occupying wire space.
pub fn tagged_signing_digest(
    bytes: &[u8],
    start: usize,
    end: usize,
    message_type: MessageType,
) -> Hash {
    let mut region = bytes[start..end].to_vec();
    region[0] ^= message_type.code() as u8;
    Hash::from_bytes(&region)
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(bytes[offset..offset + 2].try_into().expect("2-byte read"))
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().expect("4-byte read"))
}

pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(bytes[offset..offset + 8].try_into().expect("8-byte read"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_digest_differs_by_type() {
        let bytes = vec![0u8; 32];
        let tick = tagged_signing_digest(&bytes, 8, 32, MessageType::Tick);
        let solution = tagged_signing_digest(&bytes, 8, 32, MessageType::ResourceTestSolution);
        assert_ne!(tick, solution);
    }

    #[test]
    fn test_tagged_digest_restores_input() {
        // The helper must not mutate the caller's buffer.
        let bytes = vec![0xAAu8; 32];
        let before = bytes.clone();
        let _ = tagged_signing_digest(&bytes, 0, 32, MessageType::Tick);
        assert_eq!(bytes, before);
    }
}
