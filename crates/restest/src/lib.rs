//! Resource-test verifier.
//!
//! Committee members submit proof-of-work-style solutions as an
//! anti-spam/reputation signal. Each nonce seeds a deterministic boolean
//! network whose output bit-stream is compared against a process-wide
//! random tape; the per-member score feeds the epoch reputation cutover.

mod network;
mod params;
mod tape;
mod verifier;

pub use params::{ParamsError, ResourceTestParams, LINKS_PER_NEURON, TAPE_BITS, TAPE_WORDS};
pub use verifier::{ResourceTester, SolutionError, Verified};
