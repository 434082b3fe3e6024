//! Deterministic random material.
//!
//! Both the process-wide tape and the per-nonce neuron links come from a
//! ChaCha20 stream keyed by a Blake3 digest of the seed material, so
//! every verifier with the same parameters replays identical networks.

use crate::params::TAPE_WORDS;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tickmesh_types::{Hash, PublicKey};

/// The process-wide random tape the output bit-stream is compared to.
#[derive(Debug, Clone)]
pub(crate) struct RandomTape {
    words: Vec<u64>,
}

impl RandomTape {
    /// Generate the tape from the configured seed.
    pub(crate) fn generate(seed: &[u8; 32]) -> Self {
        let mut rng = ChaCha20Rng::from_seed(Hash::from_bytes(seed).to_bytes());
        let words = (0..TAPE_WORDS).map(|_| rng.next_u64()).collect();
        Self { words }
    }

    /// The tape bit at an index.
    pub(crate) fn bit(&self, index: usize) -> bool {
        (self.words[index >> 6] >> (index & 63)) & 1 != 0
    }

    /// Tape length in bits.
    pub(crate) fn len_bits(&self) -> usize {
        self.words.len() * 64
    }
}

/// Derive the two-link table of a nonce's boolean network, seeded by
/// (member key, nonce).
pub(crate) fn derive_links(
    member: &PublicKey,
    nonce: &[u8; 32],
    neuron_count: usize,
) -> Vec<(usize, usize)> {
    let seed = Hash::from_parts(&[member.as_bytes(), nonce]);
    let mut rng = ChaCha20Rng::from_seed(seed.to_bytes());
    (0..neuron_count)
        .map(|_| {
            let a = rng.next_u32() as usize % neuron_count;
            let b = rng.next_u32() as usize % neuron_count;
            (a, b)
        })
        .collect()
}
