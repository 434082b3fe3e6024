//! Transaction broadcast layout.
//!
//! Fixed-layout transfer: source, destination, amount, target tick and an
//! input descriptor, signed by the source key over everything before the
//! signature. This node never executes transactions; it only relays them
//! and needs the target tick for re-announcement supersession.

use crate::header::{write_header, HEADER_LENGTH};
use crate::{read_u16, read_u32, read_u64, CodecError, MessageType};
use tickmesh_types::{
    Hash, KeyPair, PublicKey, Signature, TickNumber, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};

/// Offset of the source public key.
pub const TX_SOURCE_OFFSET: usize = HEADER_LENGTH;
/// Offset of the destination public key.
pub const TX_DESTINATION_OFFSET: usize = TX_SOURCE_OFFSET + PUBLIC_KEY_LENGTH;
/// Offset of the amount.
pub const TX_AMOUNT_OFFSET: usize = TX_DESTINATION_OFFSET + PUBLIC_KEY_LENGTH;
/// Offset of the target tick.
pub const TX_TICK_OFFSET: usize = TX_AMOUNT_OFFSET + 8;
/// Offset of the input type.
pub const TX_INPUT_TYPE_OFFSET: usize = TX_TICK_OFFSET + 4;
/// Offset of the input size.
pub const TX_INPUT_SIZE_OFFSET: usize = TX_INPUT_TYPE_OFFSET + 2;
/// Offset of the input payload (and, with no input, of the signature).
pub const TX_INPUT_OFFSET: usize = TX_INPUT_SIZE_OFFSET + 2;
/// Length of a transaction with no input payload.
pub const TX_BASE_MESSAGE_LENGTH: usize = TX_INPUT_OFFSET + SIGNATURE_LENGTH;

/// A typed view over a transaction message.
#[derive(Debug, Clone, Copy)]
pub struct TransactionView<'a> {
    bytes: &'a [u8],
}

impl<'a> TransactionView<'a> {
    /// Parse a transaction message.
    ///
    /// The total length must equal the base length plus the declared
    /// input size.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, CodecError> {
        if bytes.len() < TX_BASE_MESSAGE_LENGTH {
            return Err(CodecError::WrongLength {
                kind: "transaction",
                expected: TX_BASE_MESSAGE_LENGTH,
                actual: bytes.len(),
            });
        }
        let view = Self { bytes };
        let expected = TX_BASE_MESSAGE_LENGTH + view.input_size() as usize;
        if bytes.len() != expected {
            return Err(CodecError::WrongLength {
                kind: "transaction",
                expected,
                actual: bytes.len(),
            });
        }
        Ok(view)
    }

    /// The sender's public key.
    pub fn source(&self) -> PublicKey {
        PublicKey::from_slice(&self.bytes[TX_SOURCE_OFFSET..TX_SOURCE_OFFSET + PUBLIC_KEY_LENGTH])
    }

    /// The destination public key.
    pub fn destination(&self) -> PublicKey {
        PublicKey::from_slice(
            &self.bytes[TX_DESTINATION_OFFSET..TX_DESTINATION_OFFSET + PUBLIC_KEY_LENGTH],
        )
    }

    /// The transferred amount.
    pub fn amount(&self) -> u64 {
        read_u64(self.bytes, TX_AMOUNT_OFFSET)
    }

    /// The tick this transaction targets.
    pub fn tick(&self) -> TickNumber {
        TickNumber(read_u32(self.bytes, TX_TICK_OFFSET))
    }

    /// The input type descriptor.
    pub fn input_type(&self) -> u16 {
        read_u16(self.bytes, TX_INPUT_TYPE_OFFSET)
    }

    /// The declared input payload size.
    pub fn input_size(&self) -> u16 {
        read_u16(self.bytes, TX_INPUT_SIZE_OFFSET)
    }

    /// The source signature.
    pub fn signature(&self) -> Signature {
        let offset = self.bytes.len() - SIGNATURE_LENGTH;
        Signature::from_slice(&self.bytes[offset..])
    }

    /// The digest the source signature covers (source key through input,
    /// no type-tag canonicalization).
    pub fn signing_digest(&self) -> Hash {
        Hash::from_bytes(&self.bytes[TX_SOURCE_OFFSET..self.bytes.len() - SIGNATURE_LENGTH])
    }
}

/// Build a signed transfer with no input payload.
pub fn build_transaction(
    protocol: u16,
    source: &KeyPair,
    destination: PublicKey,
    amount: u64,
    tick: TickNumber,
) -> Vec<u8> {
    let mut bytes = vec![0u8; TX_BASE_MESSAGE_LENGTH];
    write_header(&mut bytes, protocol, MessageType::Transaction);

    bytes[TX_SOURCE_OFFSET..TX_SOURCE_OFFSET + PUBLIC_KEY_LENGTH]
        .copy_from_slice(source.public_key().as_bytes());
    bytes[TX_DESTINATION_OFFSET..TX_DESTINATION_OFFSET + PUBLIC_KEY_LENGTH]
        .copy_from_slice(destination.as_bytes());
    bytes[TX_AMOUNT_OFFSET..TX_AMOUNT_OFFSET + 8].copy_from_slice(&amount.to_le_bytes());
    bytes[TX_TICK_OFFSET..TX_TICK_OFFSET + 4].copy_from_slice(&tick.0.to_le_bytes());

    let digest = Hash::from_bytes(&bytes[TX_SOURCE_OFFSET..TX_INPUT_OFFSET]);
    let signature = source.sign(&digest);
    bytes[TX_INPUT_OFFSET..TX_INPUT_OFFSET + SIGNATURE_LENGTH]
        .copy_from_slice(signature.as_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickmesh_types::test_utils::keypair;

    #[test]
    fn test_build_parse_roundtrip() {
        let source = keypair(1);
        let destination = keypair(2).public_key();
        let bytes = build_transaction(1, &source, destination, 1_000_000, TickNumber(500));

        assert_eq!(bytes.len(), TX_BASE_MESSAGE_LENGTH);
        let view = TransactionView::parse(&bytes).unwrap();
        assert_eq!(view.source(), source.public_key());
        assert_eq!(view.destination(), destination);
        assert_eq!(view.amount(), 1_000_000);
        assert_eq!(view.tick(), TickNumber(500));
        assert_eq!(view.input_type(), 0);
        assert_eq!(view.input_size(), 0);
    }

    #[test]
    fn test_signature_verifies() {
        let source = keypair(3);
        let bytes = build_transaction(1, &source, PublicKey::ZERO, 1, TickNumber(1));
        let view = TransactionView::parse(&bytes).unwrap();
        assert!(source
            .public_key()
            .verify(&view.signing_digest(), &view.signature()));
    }

    #[test]
    fn test_input_size_mismatch_rejected() {
        let source = keypair(4);
        let mut bytes = build_transaction(1, &source, PublicKey::ZERO, 1, TickNumber(1));
        // Declare an input payload the message does not carry.
        bytes[TX_INPUT_SIZE_OFFSET..TX_INPUT_SIZE_OFFSET + 2]
            .copy_from_slice(&8u16.to_le_bytes());
        assert!(matches!(
            TransactionView::parse(&bytes),
            Err(CodecError::WrongLength { .. })
        ));
    }
}
