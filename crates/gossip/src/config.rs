//! Propagation configuration.

use std::time::Duration;

/// Configuration for the propagation engine.
#[derive(Debug, Clone)]
pub struct PropagationConfig {
    /// Number of channel slots in the mesh pool.
    pub slots: usize,

    /// Minimum repeat window per slot for committee messages.
    pub committee_window: Duration,

    /// Minimum repeat window per slot per digest for resource-test
    /// solutions.
    pub solution_window: Duration,

    /// Minimum repeat window per slot per (member, tick) key for ticks.
    pub tick_window: Duration,

    /// Probability of relaying an eligible tick. Normally 1.0; tunable
    /// down to shed load.
    pub tick_propagation_probability: f64,

    /// Target capacity of the transaction dedup filter.
    pub transaction_capacity: usize,

    /// Target false-positive rate of the transaction dedup filter.
    pub transaction_false_positive_rate: f64,

    /// How many timed re-broadcasts a first-seen transaction gets.
    pub transaction_rebroadcast_count: u32,

    /// Interval between transaction re-broadcasts.
    pub transaction_rebroadcast_interval: Duration,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            slots: 4,
            committee_window: Duration::from_secs(30),
            solution_window: Duration::from_secs(30),
            tick_window: Duration::from_secs(3),
            tick_propagation_probability: 1.0,
            transaction_capacity: 16_000_000,
            transaction_false_positive_rate: 0.1,
            transaction_rebroadcast_count: 5,
            transaction_rebroadcast_interval: Duration::from_secs(1),
        }
    }
}
