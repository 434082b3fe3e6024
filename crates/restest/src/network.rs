//! Boolean-network replay for one nonce.
//!
//! The network is a ring of NAND gates over two derived links per
//! neuron. Whenever exactly one of the last two neurons flips, the
//! network emits an output bit (which neuron flipped selects the bit
//! value); the emitted stream must match the random tape bit-for-bit.
//! The matched length is the nonce's measured work.

use crate::params::ResourceTestParams;
use crate::tape::{derive_links, RandomTape};
use tickmesh_types::PublicKey;

/// Replay the network for one nonce and return the matched output
/// length.
///
/// Steps without a single-flip output are bounded by a limiter equal to
/// the tape word count, so a cycling network terminates.
pub(crate) fn matched_length(
    member: &PublicKey,
    nonce: &[u8; 32],
    params: &ResourceTestParams,
    tape: &RandomTape,
) -> usize {
    let n = params.neuron_count;
    let links = derive_links(member, nonce, n);

    let mut values = vec![0xFFu8; n];
    let mut limiter = crate::params::TAPE_WORDS;
    let mut matched = 0usize;

    while matched < tape.len_bits() {
        let prev_last = values[n - 1];
        let prev_second = values[n - 2];

        // In-place update: earlier neurons feed later ones within the
        // same step.
        for j in 0..n {
            let (a, b) = links[j];
            values[j] = !(values[a] & values[b]);
        }

        let last_flipped = values[n - 1] != prev_last;
        let second_flipped = values[n - 2] != prev_second;

        if last_flipped && !second_flipped {
            if !tape.bit(matched) {
                break;
            }
            matched += 1;
        } else if second_flipped && !last_flipped {
            if tape.bit(matched) {
                break;
            }
            matched += 1;
        } else {
            limiter -= 1;
            if limiter == 0 {
                break;
            }
        }
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ResourceTestParams {
        ResourceTestParams {
            random_seed: [1u8; 32],
            neuron_count: 32,
            solution_threshold: 1,
        }
    }

    #[test]
    fn test_matched_length_deterministic() {
        let params = params();
        let tape = RandomTape::generate(&params.random_seed);
        let member = PublicKey::from_bytes([9u8; 32]);

        let a = matched_length(&member, &[1u8; 32], &params, &tape);
        let b = matched_length(&member, &[1u8; 32], &params, &tape);
        assert_eq!(a, b);
    }

    #[test]
    fn test_matched_length_terminates_on_degenerate_network() {
        // Two neurons is the smallest allowed network; whatever its
        // dynamics, the limiter bounds the replay.
        let params = ResourceTestParams {
            random_seed: [2u8; 32],
            neuron_count: 2,
            solution_threshold: 1,
        };
        let tape = RandomTape::generate(&params.random_seed);
        let member = PublicKey::from_bytes([1u8; 32]);
        let matched = matched_length(&member, &[3u8; 32], &params, &tape);
        assert!(matched <= tape.len_bits());
    }
}
