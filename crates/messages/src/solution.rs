//! Resource-test solution broadcast layout.
//!
//! A solution carries up to [`SOLUTION_NONCE_COUNT`] nonces claimed by one
//! committee member. The member signature covers everything from the
//! member key through the last nonce, with the solution type code XORed
//! into the first signed byte around hashing — the same canonicalization
//! the propagation digest uses, so it must stay bit-exact.

use crate::header::{write_header, HEADER_LENGTH};
use crate::{read_u16, tagged_signing_digest, CodecError, MessageType};
use tickmesh_types::{Hash, KeyPair, PublicKey, Signature, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Size of one nonce in bytes.
pub const NONCE_LENGTH: usize = 32;
/// Maximum number of nonces per solution.
pub const SOLUTION_NONCE_COUNT: usize = 1000;

/// Offset of the member public key.
pub const SOLUTION_MEMBER_KEY_OFFSET: usize = HEADER_LENGTH;
/// Offset of the submission timestamp block.
pub const SOLUTION_TIMESTAMP_OFFSET: usize = SOLUTION_MEMBER_KEY_OFFSET + PUBLIC_KEY_LENGTH;
/// Length of the submission timestamp block.
pub const SOLUTION_TIMESTAMP_LENGTH: usize = 8;
/// Offset of the first nonce.
pub const SOLUTION_NONCES_OFFSET: usize = SOLUTION_TIMESTAMP_OFFSET + SOLUTION_TIMESTAMP_LENGTH;
/// Length of the nonce region.
pub const SOLUTION_NONCES_LENGTH: usize = SOLUTION_NONCE_COUNT * NONCE_LENGTH;
/// Offset of the member signature.
pub const SOLUTION_SIGNATURE_OFFSET: usize = SOLUTION_NONCES_OFFSET + SOLUTION_NONCES_LENGTH;
/// Total solution message length.
pub const SOLUTION_MESSAGE_LENGTH: usize = SOLUTION_SIGNATURE_OFFSET + SIGNATURE_LENGTH;

/// Submission wall-clock stamp carried inside a solution.
///
/// Purely informational; it is covered by the signature but never
/// interpreted by the verifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolutionTimestamp {
    pub millisecond: u16,
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

/// A typed view over a resource-test solution message.
#[derive(Debug, Clone, Copy)]
pub struct SolutionView<'a> {
    bytes: &'a [u8],
}

impl<'a> SolutionView<'a> {
    /// Parse a solution message, checking the exact length.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, CodecError> {
        if bytes.len() != SOLUTION_MESSAGE_LENGTH {
            return Err(CodecError::WrongLength {
                kind: "resource-test solution",
                expected: SOLUTION_MESSAGE_LENGTH,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// The committee member claiming the solution.
    pub fn member_key(&self) -> PublicKey {
        PublicKey::from_slice(
            &self.bytes[SOLUTION_MEMBER_KEY_OFFSET..SOLUTION_MEMBER_KEY_OFFSET + PUBLIC_KEY_LENGTH],
        )
    }

    /// The submission timestamp block.
    pub fn timestamp(&self) -> SolutionTimestamp {
        let o = SOLUTION_TIMESTAMP_OFFSET;
        SolutionTimestamp {
            millisecond: read_u16(self.bytes, o),
            second: self.bytes[o + 2],
            minute: self.bytes[o + 3],
            hour: self.bytes[o + 4],
            day: self.bytes[o + 5],
            month: self.bytes[o + 6],
            year: self.bytes[o + 7],
        }
    }

    /// The nonce at an index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= SOLUTION_NONCE_COUNT`.
    pub fn nonce(&self, index: usize) -> [u8; NONCE_LENGTH] {
        assert!(index < SOLUTION_NONCE_COUNT);
        let offset = SOLUTION_NONCES_OFFSET + index * NONCE_LENGTH;
        self.bytes[offset..offset + NONCE_LENGTH]
            .try_into()
            .expect("fixed-size nonce")
    }

    /// The member signature.
    pub fn signature(&self) -> Signature {
        Signature::from_slice(
            &self.bytes[SOLUTION_SIGNATURE_OFFSET..SOLUTION_SIGNATURE_OFFSET + SIGNATURE_LENGTH],
        )
    }

    /// The canonical digest the member signature covers. Also the
    /// propagation dedup key for this solution.
    pub fn signing_digest(&self) -> Hash {
        tagged_signing_digest(
            self.bytes,
            SOLUTION_MEMBER_KEY_OFFSET,
            SOLUTION_SIGNATURE_OFFSET,
            MessageType::ResourceTestSolution,
        )
    }
}

/// Build a signed solution message. Unused nonce slots stay all-zero and
/// are skipped by the verifier.
///
/// # Panics
///
/// Panics if more than [`SOLUTION_NONCE_COUNT`] nonces are given.
pub fn build_solution(
    protocol: u16,
    timestamp: SolutionTimestamp,
    nonces: &[[u8; NONCE_LENGTH]],
    member: &KeyPair,
) -> Vec<u8> {
    assert!(nonces.len() <= SOLUTION_NONCE_COUNT);
    let mut bytes = vec![0u8; SOLUTION_MESSAGE_LENGTH];
    write_header(&mut bytes, protocol, MessageType::ResourceTestSolution);

    bytes[SOLUTION_MEMBER_KEY_OFFSET..SOLUTION_MEMBER_KEY_OFFSET + PUBLIC_KEY_LENGTH]
        .copy_from_slice(member.public_key().as_bytes());
    let o = SOLUTION_TIMESTAMP_OFFSET;
    bytes[o..o + 2].copy_from_slice(&timestamp.millisecond.to_le_bytes());
    bytes[o + 2] = timestamp.second;
    bytes[o + 3] = timestamp.minute;
    bytes[o + 4] = timestamp.hour;
    bytes[o + 5] = timestamp.day;
    bytes[o + 6] = timestamp.month;
    bytes[o + 7] = timestamp.year;
    for (i, nonce) in nonces.iter().enumerate() {
        let offset = SOLUTION_NONCES_OFFSET + i * NONCE_LENGTH;
        bytes[offset..offset + NONCE_LENGTH].copy_from_slice(nonce);
    }

    let digest = tagged_signing_digest(
        &bytes,
        SOLUTION_MEMBER_KEY_OFFSET,
        SOLUTION_SIGNATURE_OFFSET,
        MessageType::ResourceTestSolution,
    );
    let signature = member.sign(&digest);
    bytes[SOLUTION_SIGNATURE_OFFSET..SOLUTION_SIGNATURE_OFFSET + SIGNATURE_LENGTH]
        .copy_from_slice(signature.as_bytes());
    bytes
}
