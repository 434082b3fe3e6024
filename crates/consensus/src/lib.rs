//! Quorum tick consensus tracker.
//!
//! Maintains committee membership, the current epoch and alignment, and
//! per-tick per-member submissions; declares a tick final when a quorum
//! of committee members agree bit-for-bit on its digest vector. The
//! tracker is a synchronous state machine: it performs no I/O and
//! returns [`Action`]s for the runner to execute.

mod action;
mod alignment;
mod tracker;

pub use action::{Action, AlignmentEvent, FinalizedTick};
pub use alignment::{Alignment, AlignmentTracker};
pub use tracker::ConsensusTracker;
