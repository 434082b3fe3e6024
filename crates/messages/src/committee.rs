//! Committee-set broadcast layout.
//!
//! Carries the full ordered member array for an epoch, signed by the
//! root authority over the epoch+keys region.

use crate::header::{write_header, HEADER_LENGTH};
use crate::{read_u16, CodecError, MessageType};
use tickmesh_types::{
    Committee, Epoch, Hash, KeyPair, PublicKey, Signature, COMMITTEE_SIZE, PUBLIC_KEY_LENGTH,
    SIGNATURE_LENGTH,
};

/// Offset of the epoch.
pub const COMMITTEE_EPOCH_OFFSET: usize = HEADER_LENGTH;
/// Offset of the first member key.
pub const COMMITTEE_KEYS_OFFSET: usize = COMMITTEE_EPOCH_OFFSET + 2;
/// Length of the member key region.
pub const COMMITTEE_KEYS_LENGTH: usize = COMMITTEE_SIZE * PUBLIC_KEY_LENGTH;
/// Offset of the root-authority signature.
pub const COMMITTEE_SIGNATURE_OFFSET: usize = COMMITTEE_KEYS_OFFSET + COMMITTEE_KEYS_LENGTH;
/// Total committee message length.
pub const COMMITTEE_MESSAGE_LENGTH: usize = COMMITTEE_SIGNATURE_OFFSET + SIGNATURE_LENGTH;

/// A typed view over a committee-set message.
#[derive(Debug, Clone, Copy)]
pub struct CommitteeView<'a> {
    bytes: &'a [u8],
}

impl<'a> CommitteeView<'a> {
    /// Parse a committee message, checking the exact length.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, CodecError> {
        if bytes.len() != COMMITTEE_MESSAGE_LENGTH {
            return Err(CodecError::WrongLength {
                kind: "committee",
                expected: COMMITTEE_MESSAGE_LENGTH,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// Epoch this committee is authorized for.
    pub fn epoch(&self) -> Epoch {
        Epoch(read_u16(self.bytes, COMMITTEE_EPOCH_OFFSET))
    }

    /// The member key at a seat.
    ///
    /// # Panics
    ///
    /// Panics if `seat >= COMMITTEE_SIZE`.
    pub fn member_key(&self, seat: usize) -> PublicKey {
        assert!(seat < COMMITTEE_SIZE);
        let offset = COMMITTEE_KEYS_OFFSET + seat * PUBLIC_KEY_LENGTH;
        PublicKey::from_slice(&self.bytes[offset..offset + PUBLIC_KEY_LENGTH])
    }

    /// Extract the full ordered committee.
    pub fn committee(&self) -> Committee {
        let members = (0..COMMITTEE_SIZE).map(|seat| self.member_key(seat)).collect();
        Committee::from_members(members).expect("fixed-size extraction")
    }

    /// The root-authority signature.
    pub fn signature(&self) -> Signature {
        Signature::from_slice(
            &self.bytes[COMMITTEE_SIGNATURE_OFFSET..COMMITTEE_SIGNATURE_OFFSET + SIGNATURE_LENGTH],
        )
    }

    /// The digest the root-authority signature covers (epoch+keys region,
    /// no type-tag canonicalization).
    pub fn signing_digest(&self) -> Hash {
        Hash::from_bytes(&self.bytes[COMMITTEE_EPOCH_OFFSET..COMMITTEE_SIGNATURE_OFFSET])
    }
}

/// Build a signed committee message. Missing seats are padded with the
/// placeholder key.
///
/// # Panics
///
/// Panics if more than [`COMMITTEE_SIZE`] members are given.
pub fn build_committee(
    protocol: u16,
    epoch: Epoch,
    members: &[PublicKey],
    authority: &KeyPair,
) -> Vec<u8> {
    assert!(members.len() <= COMMITTEE_SIZE);
    let mut bytes = vec![0u8; COMMITTEE_MESSAGE_LENGTH];
    write_header(&mut bytes, protocol, MessageType::Committee);

    bytes[COMMITTEE_EPOCH_OFFSET..COMMITTEE_EPOCH_OFFSET + 2]
        .copy_from_slice(&epoch.0.to_le_bytes());
    for (seat, key) in members.iter().enumerate() {
        let offset = COMMITTEE_KEYS_OFFSET + seat * PUBLIC_KEY_LENGTH;
        bytes[offset..offset + PUBLIC_KEY_LENGTH].copy_from_slice(key.as_bytes());
    }

    let digest = Hash::from_bytes(&bytes[COMMITTEE_EPOCH_OFFSET..COMMITTEE_SIGNATURE_OFFSET]);
    let signature = authority.sign(&digest);
    bytes[COMMITTEE_SIGNATURE_OFFSET..COMMITTEE_SIGNATURE_OFFSET + SIGNATURE_LENGTH]
        .copy_from_slice(signature.as_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickmesh_types::test_utils::{keypair, root_keypair};

    #[test]
    fn test_build_parse_roundtrip() {
        let authority = root_keypair();
        let members: Vec<PublicKey> = (0..3).map(|n| keypair(n).public_key()).collect();
        let bytes = build_committee(1, Epoch(9), &members, &authority);

        assert_eq!(bytes.len(), COMMITTEE_MESSAGE_LENGTH);
        let view = CommitteeView::parse(&bytes).unwrap();
        assert_eq!(view.epoch(), Epoch(9));
        assert_eq!(view.member_key(0), keypair(0).public_key());
        assert_eq!(view.member_key(2), keypair(2).public_key());
        // Unfilled seats hold the placeholder.
        assert!(view.member_key(3).is_zero());

        let committee = view.committee();
        assert_eq!(committee.non_placeholder_count(), 3);
    }

    #[test]
    fn test_authority_signature_verifies() {
        let authority = root_keypair();
        let bytes = build_committee(1, Epoch(2), &[], &authority);
        let view = CommitteeView::parse(&bytes).unwrap();
        assert!(authority
            .public_key()
            .verify(&view.signing_digest(), &view.signature()));
        assert!(!keypair(0)
            .public_key()
            .verify(&view.signing_digest(), &view.signature()));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            CommitteeView::parse(&[0u8; 64]),
            Err(CodecError::WrongLength {
                kind: "committee",
                ..
            })
        ));
    }
}
