//! Fixed wire header shared by every message type.
//!
//! Layout (little-endian): `[length: u32][protocol: u16][type: u16]`.
//! The declared length covers the whole message including the header.

use crate::CodecError;

/// Offset of the length field.
pub const SIZE_OFFSET: usize = 0;
/// Length of the length field.
pub const SIZE_LENGTH: usize = 4;
/// Offset of the protocol version field.
pub const PROTOCOL_VERSION_OFFSET: usize = SIZE_OFFSET + SIZE_LENGTH;
/// Length of the protocol version field.
pub const PROTOCOL_VERSION_LENGTH: usize = 2;
/// Offset of the message type field.
pub const TYPE_OFFSET: usize = PROTOCOL_VERSION_OFFSET + PROTOCOL_VERSION_LENGTH;
/// Length of the message type field.
pub const TYPE_LENGTH: usize = 2;
/// Total header length.
pub const HEADER_LENGTH: usize = TYPE_OFFSET + TYPE_LENGTH;

/// Broadcast message type codes.
///
/// Codes 4 (revenues) and 11 (committee request) are reserved on the wire
/// but not routed by this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    /// Peer address exchange.
    ExchangePeers = 0,
    /// Resource-test solution broadcast.
    ResourceTestSolution = 1,
    /// Committee-set broadcast, signed by the root authority.
    Committee = 2,
    /// Per-member tick broadcast.
    Tick = 3,
    /// Transaction broadcast.
    Transaction = 24,
}

impl MessageType {
    /// Map a wire code to a routed message type.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(MessageType::ExchangePeers),
            1 => Some(MessageType::ResourceTestSolution),
            2 => Some(MessageType::Committee),
            3 => Some(MessageType::Tick),
            24 => Some(MessageType::Transaction),
            _ => None,
        }
    }

    /// The wire code for this type.
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Parsed wire header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Declared total message length.
    pub declared_length: u32,
    /// Protocol version.
    pub protocol: u16,
    /// Raw message type code.
    pub type_code: u16,
}

impl Header {
    /// Parse the header fields.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_LENGTH {
            return Err(CodecError::TooShort { actual: bytes.len() });
        }
        Ok(Self {
            declared_length: crate::read_u32(bytes, SIZE_OFFSET),
            protocol: crate::read_u16(bytes, PROTOCOL_VERSION_OFFSET),
            type_code: crate::read_u16(bytes, TYPE_OFFSET),
        })
    }

    /// Validate the frame against its declared length and the local
    /// protocol version.
    ///
    /// A mismatch on either is a protocol violation: the offending slot
    /// must be closed and reconnected without further processing.
    pub fn validate(&self, bytes: &[u8], local_protocol: u16) -> Result<(), CodecError> {
        if self.declared_length as usize != bytes.len() {
            return Err(CodecError::LengthMismatch {
                declared: self.declared_length as usize,
                actual: bytes.len(),
            });
        }
        if self.protocol != local_protocol {
            return Err(CodecError::ProtocolMismatch {
                received: self.protocol,
                expected: local_protocol,
            });
        }
        Ok(())
    }

    /// The routed message type, if this node knows the code.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_code(self.type_code)
    }
}

/// Write a header into the first [`HEADER_LENGTH`] bytes of a message.
pub(crate) fn write_header(bytes: &mut [u8], protocol: u16, message_type: MessageType) {
    let length = bytes.len() as u32;
    bytes[SIZE_OFFSET..SIZE_OFFSET + SIZE_LENGTH].copy_from_slice(&length.to_le_bytes());
    bytes[PROTOCOL_VERSION_OFFSET..PROTOCOL_VERSION_OFFSET + PROTOCOL_VERSION_LENGTH]
        .copy_from_slice(&protocol.to_le_bytes());
    bytes[TYPE_OFFSET..TYPE_OFFSET + TYPE_LENGTH]
        .copy_from_slice(&message_type.code().to_le_bytes());
}
