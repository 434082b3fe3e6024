//! Resource-test solution verification and scoring.

use crate::network::matched_length;
use crate::params::{ParamsError, ResourceTestParams};
use crate::tape::RandomTape;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tickmesh_messages::{CodecError, SolutionView, NONCE_LENGTH, SOLUTION_NONCE_COUNT};
use tickmesh_types::{Hash, PublicKey};
use tracing::{debug, trace};

/// A verified, scored solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// The committee member the solution belongs to.
    pub member: PublicKey,
    /// Sum of per-nonce scores over all distinct nonces.
    pub score: u32,
    /// Canonical content digest; also the propagation dedup key.
    pub digest: Hash,
}

/// Reasons a solution is rejected.
///
/// All variants are protocol violations: the slot that delivered the
/// solution is closed and reconnected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolutionError {
    /// The declared member key is the all-zero placeholder.
    #[error("solution claims the placeholder member key")]
    PlaceholderKey,

    /// The message does not parse.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The embedded signature does not verify against the member key.
    #[error("bad member signature")]
    BadSignature,

    /// A nonce was already submitted by this member. Duplicate-nonce
    /// submissions void the whole solution, they are not merely scored 0.
    #[error("duplicate nonce for member {member}")]
    DuplicateNonce {
        /// The offending member.
        member: PublicKey,
    },
}

/// Validates resource-test solutions and maintains per-member nonce
/// bookkeeping.
///
/// The signature check is a deliberately cheap anti-spam gate relative
/// to the work a solution represents; the replay of each nonce's network
/// is the expensive part and must run off the I/O dispatch path.
pub struct ResourceTester {
    params: ResourceTestParams,
    tape: RandomTape,
    seen_nonces: HashMap<PublicKey, HashSet<[u8; NONCE_LENGTH]>>,
}

impl ResourceTester {
    /// Create a tester. Parameter validation failure is fatal at
    /// startup.
    pub fn new(params: ResourceTestParams) -> Result<Self, ParamsError> {
        params.validate()?;
        let tape = RandomTape::generate(&params.random_seed);
        Ok(Self {
            params,
            tape,
            seen_nonces: HashMap::new(),
        })
    }

    /// Verify a solution message and score its nonces.
    pub fn verify(&mut self, bytes: &[u8]) -> Result<Verified, SolutionError> {
        let view = SolutionView::parse(bytes)?;

        let member = view.member_key();
        if member.is_zero() {
            return Err(SolutionError::PlaceholderKey);
        }

        let digest = view.signing_digest();
        if !member.verify(&digest, &view.signature()) {
            return Err(SolutionError::BadSignature);
        }

        let seen = self.seen_nonces.entry(member).or_default();
        let mut score = 0u32;
        for i in 0..SOLUTION_NONCE_COUNT {
            let nonce = view.nonce(i);
            if nonce == [0u8; NONCE_LENGTH] {
                continue;
            }
            if !seen.insert(nonce) {
                return Err(SolutionError::DuplicateNonce { member });
            }

            let matched = matched_length(&member, &nonce, &self.params, &self.tape);
            trace!(%member, nonce_index = i, matched, "nonce replayed");
            if matched >= self.params.solution_threshold {
                score += 1;
            }
        }

        debug!(%member, score, "solution verified");
        Ok(Verified {
            member,
            score,
            digest,
        })
    }

    /// Forget all member nonce sets (epoch-cutover hook).
    pub fn reset(&mut self) {
        self.seen_nonces.clear();
    }

    /// Replace the parameters and regenerate the tape.
    ///
    /// Only the explicit reputation-cutover reconfiguration path calls
    /// this; parameters are otherwise immutable after startup.
    pub fn set_params(&mut self, params: ResourceTestParams) -> Result<(), ParamsError> {
        params.validate()?;
        self.tape = RandomTape::generate(&params.random_seed);
        self.params = params;
        Ok(())
    }

    /// The active parameters.
    pub fn params(&self) -> &ResourceTestParams {
        &self.params
    }
}
