//! Messages replayed to freshly opened channels.
//!
//! A peer that just joined the mesh has no committee and no tick
//! history; replaying the cached committee message and the most recent
//! tick broadcasts bootstraps it without waiting for the next round of
//! gossip.

use parking_lot::RwLock;

#[derive(Debug, Default)]
struct ReplayState {
    committee: Option<Vec<u8>>,
    ticks: Vec<Vec<u8>>,
}

/// Shared store of messages sent to every newly opened channel.
#[derive(Debug, Default)]
pub struct ReplayStore {
    state: RwLock<ReplayState>,
}

impl ReplayStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the latest adopted committee message.
    pub fn set_committee(&self, bytes: Vec<u8>) {
        self.state.write().committee = Some(bytes);
    }

    /// Replace the cached recent tick broadcasts.
    pub fn set_ticks(&self, ticks: Vec<Vec<u8>>) {
        self.state.write().ticks = ticks;
    }

    /// Snapshot everything a fresh peer should receive, committee first.
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        let state = self.state.read();
        let mut out = Vec::with_capacity(1 + state.ticks.len());
        if let Some(committee) = &state.committee {
            out.push(committee.clone());
        }
        out.extend(state.ticks.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_orders_committee_first() {
        let store = ReplayStore::new();
        assert!(store.snapshot().is_empty());

        store.set_ticks(vec![vec![3], vec![4]]);
        store.set_committee(vec![1, 2]);
        assert_eq!(store.snapshot(), vec![vec![1, 2], vec![3], vec![4]]);
    }
}
