//! Resource-test parameters.

use thiserror::Error;

/// Number of boolean-network links per neuron.
pub const LINKS_PER_NEURON: usize = 2;

/// Size of the random tape in 64-bit words.
pub const TAPE_WORDS: usize = 65_536;

/// Total tape length in bits; also the upper bound on a nonce's matched
/// output length.
pub const TAPE_BITS: usize = TAPE_WORDS * 64;

/// Errors in resource-test parameters. Fatal at startup; parameters are
/// immutable afterwards except through the epoch-cutover hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    /// The boolean network needs at least the two output neurons.
    #[error("neuron count must be at least 2, got {0}")]
    TooFewNeurons(usize),

    /// A zero threshold would score every nonce.
    #[error("solution threshold must be nonzero")]
    ZeroThreshold,

    /// A threshold beyond the tape can never be reached.
    #[error("solution threshold {0} exceeds tape length {TAPE_BITS}")]
    ThresholdBeyondTape(usize),
}

/// Injected-once parameters of the resource test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTestParams {
    /// Seed of the process-wide random tape.
    pub random_seed: [u8; 32],
    /// Number of neurons in the derived boolean network.
    pub neuron_count: usize,
    /// Matched output length required for a nonce to score.
    pub solution_threshold: usize,
}

impl ResourceTestParams {
    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.neuron_count < LINKS_PER_NEURON {
            return Err(ParamsError::TooFewNeurons(self.neuron_count));
        }
        if self.solution_threshold == 0 {
            return Err(ParamsError::ZeroThreshold);
        }
        if self.solution_threshold > TAPE_BITS {
            return Err(ParamsError::ThresholdBeyondTape(self.solution_threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ResourceTestParams {
        ResourceTestParams {
            random_seed: [1u8; 32],
            neuron_count: 64,
            solution_threshold: 16,
        }
    }

    #[test]
    fn test_valid_params() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut p = params();
        p.neuron_count = 1;
        assert_eq!(p.validate(), Err(ParamsError::TooFewNeurons(1)));

        let mut p = params();
        p.solution_threshold = 0;
        assert_eq!(p.validate(), Err(ParamsError::ZeroThreshold));

        let mut p = params();
        p.solution_threshold = TAPE_BITS + 1;
        assert_eq!(
            p.validate(),
            Err(ParamsError::ThresholdBeyondTape(TAPE_BITS + 1))
        );
    }
}
