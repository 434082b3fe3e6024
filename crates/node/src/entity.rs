//! Local identity derivation and per-sender tick bookkeeping.

use thiserror::Error;
use tickmesh_types::{Hash, KeyPair, PublicKey, TickNumber};

/// Required seed length in lowercase latin characters.
pub const SEED_LENGTH: usize = 55;

/// Errors deriving an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The seed is not 55 lowercase latin characters.
    #[error("seed must be {SEED_LENGTH} lowercase latin characters")]
    InvalidSeed,
}

/// A derived keypair plus the monotonically increasing tick offset used
/// to avoid same-tick resubmission for one sender.
#[derive(Debug)]
pub struct Entity {
    key: KeyPair,
    last_target: TickNumber,
}

impl Entity {
    /// Derive an entity from a seed and a derivation index.
    pub fn from_seed(seed: &str, index: u32) -> Result<Self, EntityError> {
        if seed.len() != SEED_LENGTH || !seed.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(EntityError::InvalidSeed);
        }

        // Base-26 preimage with the index added as a counter, hashed
        // into the signing seed.
        let mut preimage: Vec<u8> = seed.bytes().map(|b| b - b'a').collect();
        let mut remaining = index;
        while remaining > 0 {
            for digit in preimage.iter_mut() {
                *digit += 1;
                if *digit < 26 {
                    break;
                }
                *digit = 0;
            }
            remaining -= 1;
        }

        let key = KeyPair::from_seed_bytes(Hash::from_bytes(&preimage).as_bytes());
        Ok(Self {
            key,
            last_target: TickNumber::GENESIS,
        })
    }

    /// The entity's public identity.
    pub fn identity(&self) -> PublicKey {
        self.key.public_key()
    }

    /// The signing keypair.
    pub fn keypair(&self) -> &KeyPair {
        &self.key
    }

    /// Choose the next transaction target tick: the first free tick at
    /// least `margin` ahead of the finalized tick, strictly increasing
    /// per sender.
    pub fn next_target_tick(&mut self, finalized: TickNumber, margin: u32) -> TickNumber {
        let floor = TickNumber(finalized.0 + margin);
        let target = if self.last_target < floor {
            floor
        } else {
            TickNumber(self.last_target.0 + 1)
        };
        self.last_target = target;
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> String {
        "a".repeat(SEED_LENGTH)
    }

    #[test]
    fn test_seed_validation() {
        assert!(Entity::from_seed(&seed(), 0).is_ok());
        assert_eq!(
            Entity::from_seed("short", 0).unwrap_err(),
            EntityError::InvalidSeed
        );
        let upper = "A".repeat(SEED_LENGTH);
        assert_eq!(
            Entity::from_seed(&upper, 0).unwrap_err(),
            EntityError::InvalidSeed
        );
    }

    #[test]
    fn test_derivation_deterministic_per_index() {
        let a = Entity::from_seed(&seed(), 0).unwrap();
        let b = Entity::from_seed(&seed(), 0).unwrap();
        let c = Entity::from_seed(&seed(), 1).unwrap();
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
    }

    #[test]
    fn test_target_tick_monotonic() {
        let mut entity = Entity::from_seed(&seed(), 0).unwrap();

        // First transaction lands margin ahead of the finalized tick.
        assert_eq!(
            entity.next_target_tick(TickNumber(100), 4),
            TickNumber(104)
        );
        // Same finalized tick: the next free tick is used instead.
        assert_eq!(
            entity.next_target_tick(TickNumber(100), 4),
            TickNumber(105)
        );
        // Finalization catching up moves the floor forward.
        assert_eq!(
            entity.next_target_tick(TickNumber(200), 4),
            TickNumber(204)
        );
    }
}
