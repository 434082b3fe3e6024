//! Per-type dedup records ("dejavu" state).
//!
//! Each record stores, per channel slot, when a given message key was
//! last seen or sent. Ticks and solutions are time-boxed rather than
//! remembered forever: entries whose every slot stamp has aged past the
//! repeat window are dropped by [`DedupState::prune`].

use crate::BloomFilter;
use std::collections::HashMap;
use std::time::Duration;
use tickmesh_types::{Hash, MemberIndex, SlotIndex, TickNumber};

/// Last-touch timestamps per channel slot for one message key.
#[derive(Debug, Clone)]
pub(crate) struct SlotStamps(Vec<Option<Duration>>);

impl SlotStamps {
    fn new(slots: usize) -> Self {
        Self(vec![None; slots])
    }

    /// Record a touch (seen or sent) on a slot.
    pub(crate) fn mark(&mut self, slot: SlotIndex, now: Duration) {
        if let Some(stamp) = self.0.get_mut(slot.0) {
            *stamp = Some(now);
        }
    }

    /// True if the slot was never touched or its repeat window elapsed.
    pub(crate) fn window_elapsed(&self, slot: SlotIndex, window: Duration, now: Duration) -> bool {
        match self.0.get(slot.0).copied().flatten() {
            Some(stamp) => now.saturating_sub(stamp) > window,
            None => true,
        }
    }

    /// True if every touched slot has aged past the window.
    fn expired(&self, window: Duration, now: Duration) -> bool {
        self.0
            .iter()
            .flatten()
            .all(|stamp| now.saturating_sub(*stamp) > window)
    }
}

/// Per-message-type dedup state shared by all channel slots.
#[derive(Debug)]
pub struct DedupState {
    slots: usize,
    /// One active committee-set message at a time: a single stamp per slot.
    committee: SlotStamps,
    /// Solutions keyed by content digest.
    solutions: HashMap<Hash, SlotStamps>,
    /// Ticks keyed by (committee member index, tick number).
    ticks: HashMap<(MemberIndex, TickNumber), SlotStamps>,
    /// Transactions: membership alone gates rebroadcast.
    transactions: BloomFilter,
}

impl DedupState {
    /// Create dedup state for a pool of `slots` channels.
    pub fn new(slots: usize, tx_capacity: usize, tx_false_positive_rate: f64) -> Self {
        Self {
            slots,
            committee: SlotStamps::new(slots),
            solutions: HashMap::new(),
            ticks: HashMap::new(),
            transactions: BloomFilter::with_capacity(tx_capacity, tx_false_positive_rate),
        }
    }

    pub(crate) fn committee_mut(&mut self) -> &mut SlotStamps {
        &mut self.committee
    }

    pub(crate) fn solution_mut(&mut self, digest: Hash) -> &mut SlotStamps {
        let slots = self.slots;
        self.solutions
            .entry(digest)
            .or_insert_with(|| SlotStamps::new(slots))
    }

    pub(crate) fn tick_mut(&mut self, member: MemberIndex, tick: TickNumber) -> &mut SlotStamps {
        let slots = self.slots;
        self.ticks
            .entry((member, tick))
            .or_insert_with(|| SlotStamps::new(slots))
    }

    /// Test-and-set a transaction digest. True if first seen.
    pub(crate) fn transaction_first_seen(&mut self, digest: &Hash) -> bool {
        self.transactions.insert(digest)
    }

    /// Drop all solution records (epoch-cutover hook).
    pub fn clear_solutions(&mut self) {
        self.solutions.clear();
    }

    /// Drop tick and solution records whose every stamp has aged past the
    /// given windows. Keeps dedup memory bounded over the process life.
    pub fn prune(&mut self, solution_window: Duration, tick_window: Duration, now: Duration) {
        self.solutions
            .retain(|_, stamps| !stamps.expired(solution_window, now));
        self.ticks
            .retain(|_, stamps| !stamps.expired(tick_window, now));
    }

    /// Number of live solution records.
    pub fn solution_records(&self) -> usize {
        self.solutions.len()
    }

    /// Number of live tick records.
    pub fn tick_records(&self) -> usize {
        self.ticks.len()
    }
}
