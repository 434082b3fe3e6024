//! Propagation decisions for inbound broadcast messages.
//!
//! The engine is sans-io and deterministic: callers pass the current
//! time and the open/closed state of every slot, and get back the list
//! of slots to relay on. Sends are marked at decision time, so a
//! decision must be executed (the pool sends to each returned slot).
//!
//! Signature verification is the consumer's job; the engine only answers
//! "who still needs this message".

use crate::{DedupState, PropagationConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tickmesh_types::{Hash, MemberIndex, SlotIndex, TickNumber};
use tracing::trace;

/// Relay instructions for a first-seen transaction.
///
/// Transactions must survive transient partitions, so beyond the
/// immediate broadcast they get a fixed number of timed re-broadcasts
/// regardless of further dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRelay {
    /// Number of timed re-broadcasts after the immediate one.
    pub rebroadcast_count: u32,
    /// Interval between re-broadcasts.
    pub rebroadcast_interval: Duration,
}

/// Per-type de-duplicating propagation engine.
pub struct PropagationEngine {
    config: PropagationConfig,
    dedup: DedupState,
    rng: ChaCha8Rng,
}

impl PropagationEngine {
    /// Create an engine. The seed drives only the tick propagation
    /// probability draws, so runs are reproducible in tests.
    pub fn new(config: PropagationConfig, rng_seed: u64) -> Self {
        let dedup = DedupState::new(
            config.slots,
            config.transaction_capacity,
            config.transaction_false_positive_rate,
        );
        Self {
            config,
            dedup,
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
        }
    }

    /// Decide relay targets for a committee-set message.
    ///
    /// Single-flight per slot: one active committee message, one stamp
    /// per slot, never resent within the committee repeat window.
    pub fn propagate_committee(
        &mut self,
        origin: Option<SlotIndex>,
        open: &[bool],
        now: Duration,
    ) -> Vec<SlotIndex> {
        let (slots, window) = (self.config.slots, self.config.committee_window);
        let stamps = self.dedup.committee_mut();
        if let Some(origin) = origin {
            stamps.mark(origin, now);
        }
        let mut targets = Vec::new();
        for j in 0..slots {
            let slot = SlotIndex(j);
            if Some(slot) == origin || !is_open(open, slot) {
                continue;
            }
            if stamps.window_elapsed(slot, window, now) {
                stamps.mark(slot, now);
                targets.push(slot);
            }
        }
        trace!(?origin, targets = targets.len(), "committee relay");
        targets
    }

    /// Decide relay targets for a resource-test solution, keyed by its
    /// canonical content digest.
    pub fn propagate_solution(
        &mut self,
        origin: Option<SlotIndex>,
        digest: Hash,
        open: &[bool],
        now: Duration,
    ) -> Vec<SlotIndex> {
        let (slots, window) = (self.config.slots, self.config.solution_window);
        let stamps = self.dedup.solution_mut(digest);
        if let Some(origin) = origin {
            stamps.mark(origin, now);
        }
        let mut targets = Vec::new();
        for j in 0..slots {
            let slot = SlotIndex(j);
            if Some(slot) == origin || !is_open(open, slot) {
                continue;
            }
            if stamps.window_elapsed(slot, window, now) {
                stamps.mark(slot, now);
                targets.push(slot);
            }
        }
        trace!(?origin, %digest, targets = targets.len(), "solution relay");
        targets
    }

    /// Decide relay targets for a tick, keyed by (member index, tick
    /// number) and additionally gated by the propagation probability.
    ///
    /// A slot skipped by the probability draw is not stamped, so a later
    /// delivery may still reach it.
    pub fn propagate_tick(
        &mut self,
        origin: Option<SlotIndex>,
        member: MemberIndex,
        tick: TickNumber,
        open: &[bool],
        now: Duration,
    ) -> Vec<SlotIndex> {
        let (slots, window) = (self.config.slots, self.config.tick_window);
        let probability = self.config.tick_propagation_probability;
        let stamps = self.dedup.tick_mut(member, tick);
        if let Some(origin) = origin {
            stamps.mark(origin, now);
        }
        let mut targets = Vec::new();
        for j in 0..slots {
            let slot = SlotIndex(j);
            if Some(slot) == origin || !is_open(open, slot) {
                continue;
            }
            if !stamps.window_elapsed(slot, window, now) {
                continue;
            }
            if self.rng.gen::<f64>() <= probability {
                stamps.mark(slot, now);
                targets.push(slot);
            }
        }
        trace!(?origin, %member, %tick, targets = targets.len(), "tick relay");
        targets
    }

    /// Test-and-set a transaction digest.
    ///
    /// Returns relay instructions on first sight, `None` when the filter
    /// already holds the digest. The caller broadcasts immediately to
    /// every open slot except the origin, then re-broadcasts per the
    /// returned schedule.
    pub fn propagate_transaction(&mut self, digest: &Hash) -> Option<TransactionRelay> {
        if self.dedup.transaction_first_seen(digest) {
            Some(TransactionRelay {
                rebroadcast_count: self.config.transaction_rebroadcast_count,
                rebroadcast_interval: self.config.transaction_rebroadcast_interval,
            })
        } else {
            trace!(%digest, "transaction already seen");
            None
        }
    }

    /// Drop all solution dedup records (epoch-cutover hook).
    pub fn clear_solutions(&mut self) {
        self.dedup.clear_solutions();
    }

    /// Drop dedup records that aged out of their repeat windows.
    pub fn prune(&mut self, now: Duration) {
        self.dedup
            .prune(self.config.solution_window, self.config.tick_window, now);
    }

    /// The engine configuration.
    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// The underlying dedup state (read-only).
    pub fn dedup(&self) -> &DedupState {
        &self.dedup
    }
}

fn is_open(open: &[bool], slot: SlotIndex) -> bool {
    open.get(slot.0).copied().unwrap_or(false)
}
