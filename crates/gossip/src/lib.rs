//! Per-type de-duplication and propagation ("gossip") engine.
//!
//! Given an inbound authenticated message and its declared type, the
//! engine decides whether to re-emit it on the other channel slots.
//! Every class except transactions uses a time-boxed repeat window per
//! slot; transactions use a capacity-boxed bloom filter plus a bounded
//! number of timed re-announcements.

mod bloom;
mod config;
mod dejavu;
mod engine;

pub use bloom::BloomFilter;
pub use config::PropagationConfig;
pub use dejavu::DedupState;
pub use engine::{PropagationEngine, TransactionRelay};
