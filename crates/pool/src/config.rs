//! Channel pool configuration.

use std::time::Duration;

/// Configuration for the channel pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of logical peer slots in the mesh.
    pub slots: usize,

    /// Minimum time a connection attempt may take before it is
    /// force-closed and retried.
    pub min_attempt_window: Duration,

    /// Linear backoff step: the retry delay is `consecutive_failures x
    /// backoff_step`. A successful open resets the failure counter.
    pub backoff_step: Duration,

    /// An open slot that receives nothing for this long is proactively
    /// closed; silence is treated as a dead peer.
    pub inactivity_window: Duration,

    /// The last slot is force-rotated after this lifetime even when
    /// healthy, to continuously refresh mesh diversity.
    pub rotation_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            slots: 4,
            min_attempt_window: Duration::from_secs(6),
            backoff_step: Duration::from_millis(100),
            inactivity_window: Duration::from_secs(10),
            rotation_lifetime: Duration::from_secs(60),
        }
    }
}
