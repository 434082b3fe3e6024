//! Cryptographic key pairs and signatures.
//!
//! The wire protocol fixes key, digest and signature sizes: 32-byte public
//! keys, 32-byte digests, 64-byte signatures. Signing always covers a
//! message digest, never the raw message.

use crate::Hash;
use std::fmt;

/// Size of a public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Size of a signature in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// A 32-byte public key for signature verification.
///
/// The all-zero key is the committee placeholder: it never verifies and
/// marks an unfilled committee seat.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// The all-zero placeholder key.
    pub const ZERO: Self = Self([0u8; PUBLIC_KEY_LENGTH]);

    /// Create a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create a public key from a slice.
    ///
    /// # Panics
    ///
    /// Panics if the slice is not exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut arr = [0u8; PUBLIC_KEY_LENGTH];
        arr.copy_from_slice(bytes);
        Self(arr)
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Check if this is the all-zero placeholder.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Verify a signature over a digest.
    ///
    /// Returns false for malformed keys or signatures; verification never
    /// fails with an error, it only rejects.
    pub fn verify(&self, digest: &Hash, signature: &Signature) -> bool {
        use ed25519_dalek::Verifier;
        let key = match ed25519_dalek::VerifyingKey::from_bytes(&self.0) {
            Ok(key) => key,
            Err(_) => return false,
        };
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        key.verify(digest.as_bytes(), &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(self.0);
        write!(f, "PublicKey({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A 64-byte signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create a signature from a slice.
    ///
    /// # Panics
    ///
    /// Panics if the slice is not exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut arr = [0u8; SIGNATURE_LENGTH];
        arr.copy_from_slice(bytes);
        Self(arr)
    }

    /// A zero/placeholder signature for tests.
    pub fn zero() -> Self {
        Self([0u8; SIGNATURE_LENGTH])
    }

    /// Get the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", &hex::encode(self.0)[..16])
    }
}

/// A signing key pair.
#[derive(Clone)]
pub struct KeyPair(ed25519_dalek::SigningKey);

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Derive a keypair from a 32-byte seed (deterministic).
    pub fn from_seed_bytes(seed: &[u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(seed))
    }

    /// Sign a digest.
    pub fn sign(&self, digest: &Hash) -> Signature {
        use ed25519_dalek::Signer;
        let sig = self.0.sign(digest.as_bytes());
        Signature(sig.to_bytes())
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key())
    }
}
