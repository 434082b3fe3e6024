//! Tick broadcast layout.
//!
//! A tick message carries one committee member's view of a round: ten
//! 32-byte digests covering the state, asset and contract stores at the
//! initial, previous and salted checkpoints, plus the digest of the
//! round's transaction set. The member signature covers everything from
//! the member-index field through the next-tick digest, with the tick
//! type code XORed into the first signed byte around hashing.

use crate::header::{write_header, HEADER_LENGTH};
use crate::{read_u16, read_u32, tagged_signing_digest, CodecError, MessageType};
use tickmesh_types::{
    Epoch, Hash, KeyPair, MemberIndex, Signature, TickNumber, SIGNATURE_LENGTH,
};

/// Offset of the committee-member index.
pub const TICK_MEMBER_INDEX_OFFSET: usize = HEADER_LENGTH;
/// Offset of the epoch.
pub const TICK_EPOCH_OFFSET: usize = TICK_MEMBER_INDEX_OFFSET + 2;
/// Offset of the tick number.
pub const TICK_NUMBER_OFFSET: usize = TICK_EPOCH_OFFSET + 2;
/// Offset of the first digest.
pub const TICK_DIGESTS_OFFSET: usize = TICK_NUMBER_OFFSET + 4;
/// Number of digests in the compared vector.
pub const TICK_DIGEST_COUNT: usize = 10;
/// Offset of the zero padding between the digest vector and the
/// next-tick digest.
pub const TICK_PADDING_OFFSET: usize = TICK_DIGESTS_OFFSET + TICK_DIGEST_COUNT * Hash::BYTES;
/// Length of the zero padding.
pub const TICK_PADDING_LENGTH: usize = SIGNATURE_LENGTH - Hash::BYTES;
/// Offset of the transaction-set digest announced for the next tick.
pub const TICK_NEXT_TX_DIGEST_OFFSET: usize = TICK_PADDING_OFFSET + TICK_PADDING_LENGTH;
/// Offset of the member signature.
pub const TICK_SIGNATURE_OFFSET: usize = TICK_NEXT_TX_DIGEST_OFFSET + Hash::BYTES;
/// Total tick message length.
pub const TICK_MESSAGE_LENGTH: usize = TICK_SIGNATURE_OFFSET + SIGNATURE_LENGTH;

/// A typed view over a tick message.
#[derive(Debug, Clone, Copy)]
pub struct TickView<'a> {
    bytes: &'a [u8],
}

impl<'a> TickView<'a> {
    /// Parse a tick message, checking the exact length.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, CodecError> {
        if bytes.len() != TICK_MESSAGE_LENGTH {
            return Err(CodecError::WrongLength {
                kind: "tick",
                expected: TICK_MESSAGE_LENGTH,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// Committee-member index claimed by the sender.
    pub fn member_index(&self) -> MemberIndex {
        MemberIndex(read_u16(self.bytes, TICK_MEMBER_INDEX_OFFSET))
    }

    /// Epoch this tick belongs to.
    pub fn epoch(&self) -> Epoch {
        Epoch(read_u16(self.bytes, TICK_EPOCH_OFFSET))
    }

    /// Tick number.
    pub fn tick(&self) -> TickNumber {
        TickNumber(read_u32(self.bytes, TICK_NUMBER_OFFSET))
    }

    /// The ten-digest vector compared bit-for-bit for quorum.
    pub fn digests(&self) -> [Hash; TICK_DIGEST_COUNT] {
        let mut out = [Hash::ZERO; TICK_DIGEST_COUNT];
        for (i, digest) in out.iter_mut().enumerate() {
            let offset = TICK_DIGESTS_OFFSET + i * Hash::BYTES;
            *digest = Hash::from_hash_bytes(&self.bytes[offset..offset + Hash::BYTES]);
        }
        out
    }

    /// Digest of the tick's transaction set (last entry of the vector).
    pub fn tx_digest(&self) -> Hash {
        let offset = TICK_DIGESTS_OFFSET + (TICK_DIGEST_COUNT - 1) * Hash::BYTES;
        Hash::from_hash_bytes(&self.bytes[offset..offset + Hash::BYTES])
    }

    /// Transaction-set digest announced for the next tick.
    pub fn next_tick_tx_digest(&self) -> Hash {
        Hash::from_hash_bytes(
            &self.bytes[TICK_NEXT_TX_DIGEST_OFFSET..TICK_NEXT_TX_DIGEST_OFFSET + Hash::BYTES],
        )
    }

    /// The member signature.
    pub fn signature(&self) -> Signature {
        Signature::from_slice(
            &self.bytes[TICK_SIGNATURE_OFFSET..TICK_SIGNATURE_OFFSET + SIGNATURE_LENGTH],
        )
    }

    /// The canonical digest the member signature covers.
    pub fn signing_digest(&self) -> Hash {
        tagged_signing_digest(
            self.bytes,
            TICK_MEMBER_INDEX_OFFSET,
            TICK_SIGNATURE_OFFSET,
            MessageType::Tick,
        )
    }
}

/// Build a signed tick message.
pub fn build_tick(
    protocol: u16,
    member_index: MemberIndex,
    epoch: Epoch,
    tick: TickNumber,
    digests: &[Hash; TICK_DIGEST_COUNT],
    next_tick_tx_digest: Hash,
    key: &KeyPair,
) -> Vec<u8> {
    let mut bytes = vec![0u8; TICK_MESSAGE_LENGTH];
    write_header(&mut bytes, protocol, MessageType::Tick);

    bytes[TICK_MEMBER_INDEX_OFFSET..TICK_MEMBER_INDEX_OFFSET + 2]
        .copy_from_slice(&member_index.0.to_le_bytes());
    bytes[TICK_EPOCH_OFFSET..TICK_EPOCH_OFFSET + 2].copy_from_slice(&epoch.0.to_le_bytes());
    bytes[TICK_NUMBER_OFFSET..TICK_NUMBER_OFFSET + 4].copy_from_slice(&tick.0.to_le_bytes());
    for (i, digest) in digests.iter().enumerate() {
        let offset = TICK_DIGESTS_OFFSET + i * Hash::BYTES;
        bytes[offset..offset + Hash::BYTES].copy_from_slice(digest.as_bytes());
    }
    bytes[TICK_NEXT_TX_DIGEST_OFFSET..TICK_NEXT_TX_DIGEST_OFFSET + Hash::BYTES]
        .copy_from_slice(next_tick_tx_digest.as_bytes());

    let digest = tagged_signing_digest(
        &bytes,
        TICK_MEMBER_INDEX_OFFSET,
        TICK_SIGNATURE_OFFSET,
        MessageType::Tick,
    );
    let signature = key.sign(&digest);
    bytes[TICK_SIGNATURE_OFFSET..TICK_SIGNATURE_OFFSET + SIGNATURE_LENGTH]
        .copy_from_slice(signature.as_bytes());
    bytes
}
