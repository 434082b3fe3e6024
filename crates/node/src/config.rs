//! Node configuration.
//!
//! Validation is the only fallible startup path; once a node is
//! launched, every steady-state fault self-heals via reconnect/backoff.

use std::time::Duration;
use thiserror::Error;
use tickmesh_gossip::PropagationConfig;
use tickmesh_pool::PoolConfig;
use tickmesh_restest::{ParamsError, ResourceTestParams};
use tickmesh_types::PublicKey;

/// Errors in node configuration. Fatal at startup only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The root authority key is the all-zero placeholder.
    #[error("root authority key is the all-zero placeholder")]
    ZeroRootAuthority,

    /// Invalid resource-test parameters.
    #[error(transparent)]
    ResourceTest(#[from] ParamsError),

    /// The pool needs at least one slot.
    #[error("pool must have at least one slot")]
    NoSlots,

    /// Pool and propagation engine disagree on the slot count.
    #[error("pool has {pool} slots but the propagation engine expects {propagation}")]
    SlotMismatch {
        /// Slots configured for the pool.
        pool: usize,
        /// Slots configured for the propagation engine.
        propagation: usize,
    },

    /// A zero margin would target already-finalized ticks.
    #[error("tick offset margin must be nonzero")]
    ZeroTickMargin,
}

/// Configuration for a mesh node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Local wire protocol version.
    pub protocol: u16,

    /// The hardcoded root authority that signs committee sets.
    pub root_authority: PublicKey,

    /// Resource-test verifier parameters.
    pub restest: ResourceTestParams,

    /// Channel pool configuration.
    pub pool: PoolConfig,

    /// Propagation engine configuration.
    pub propagation: PropagationConfig,

    /// Minimum resource-test score for the epoch reputation cutover.
    /// `None` disables the green-light computation.
    pub min_score: Option<u32>,

    /// How far ahead of the finalized tick a locally originated
    /// transaction targets.
    pub tick_offset_margin: u32,

    /// Base interval for re-announcing own transactions; the interval
    /// scales linearly with the attempt number.
    pub own_rebroadcast_interval: Duration,
}

impl NodeConfig {
    /// Build a configuration with defaults for everything except the
    /// protocol version, root authority and resource-test parameters.
    pub fn new(protocol: u16, root_authority: PublicKey, restest: ResourceTestParams) -> Self {
        Self {
            protocol,
            root_authority,
            restest,
            pool: PoolConfig::default(),
            propagation: PropagationConfig::default(),
            min_score: None,
            tick_offset_margin: 4,
            own_rebroadcast_interval: Duration::from_secs(1),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_authority.is_zero() {
            return Err(ConfigError::ZeroRootAuthority);
        }
        self.restest.validate()?;
        if self.pool.slots == 0 {
            return Err(ConfigError::NoSlots);
        }
        if self.pool.slots != self.propagation.slots {
            return Err(ConfigError::SlotMismatch {
                pool: self.pool.slots,
                propagation: self.propagation.slots,
            });
        }
        if self.tick_offset_margin == 0 {
            return Err(ConfigError::ZeroTickMargin);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickmesh_types::Hash;

    fn valid() -> NodeConfig {
        NodeConfig::new(
            1,
            PublicKey::from_bytes(*Hash::from_bytes(b"authority").as_bytes()),
            ResourceTestParams {
                random_seed: [1u8; 32],
                neuron_count: 32,
                solution_threshold: 8,
            },
        )
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_zero_authority_rejected() {
        let mut config = valid();
        config.root_authority = PublicKey::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroRootAuthority));
    }

    #[test]
    fn test_bad_restest_params_rejected() {
        let mut config = valid();
        config.restest.solution_threshold = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ResourceTest(_))
        ));
    }

    #[test]
    fn test_slot_mismatch_rejected() {
        let mut config = valid();
        config.pool.slots = 4;
        config.propagation.slots = 8;
        assert_eq!(
            config.validate(),
            Err(ConfigError::SlotMismatch {
                pool: 4,
                propagation: 8
            })
        );
    }
}
