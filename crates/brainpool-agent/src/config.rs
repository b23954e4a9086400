//! Tunable parameters of the learning engine.

use brainpool_net::NetworkSizes;
use brainpool_training::policy_gradient::TrainerParams;
use serde::{Deserialize, Serialize};

/// Configuration shared by the scheduler and every brain it drives.
///
/// Missing fields fall back to their defaults when deserialized:
///
/// ```
/// use brainpool_agent::config::BrainConfig;
///
/// let config: BrainConfig = serde_json::from_str(r#"{ "batch_size": 8 }"#).unwrap();
/// assert_eq!(config.batch_size, 8);
/// assert_eq!(config.replay_capacity, 100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub sizes: NetworkSizes,
    /// Experiences kept per agent.
    pub replay_capacity: usize,
    /// Experiences sampled per training batch; also the minimum buffer length
    /// for training to fire.
    pub batch_size: usize,
    /// Ticks between training batches of one agent.
    pub training_interval: u32,
    /// Size `K` of the rotating decision window.
    pub decisions_per_tick: usize,
    /// Threads used for forward passes within one decision window.
    pub inference_threads: usize,
    pub temperature: f32,
    pub mutation_rate: f32,
    pub trainer: TrainerParams,
    /// Seed for the scheduler's RNG; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            sizes: NetworkSizes {
                input: 20,
                hidden: 32,
                output: 14,
            },
            replay_capacity: 100,
            batch_size: 16,
            training_interval: 100,
            decisions_per_tick: 10,
            inference_threads: 1,
            temperature: 1.0,
            mutation_rate: 0.05,
            trainer: TrainerParams::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("network size `{name}` must be non-zero")]
    ZeroSize { name: &'static str },
    #[display("network sizes {sizes:?} have too many parameters")]
    TooLarge { sizes: NetworkSizes },
    #[display("`{name}` must be non-zero")]
    ZeroCount { name: &'static str },
    #[display("batch size {batch_size} exceeds replay capacity {replay_capacity}")]
    BatchExceedsCapacity {
        batch_size: usize,
        replay_capacity: usize,
    },
    #[display("`{name}` must be a finite positive number, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[display("`{name}` must lie in [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f32 },
}

impl BrainConfig {
    /// Checks the configuration for values that would violate a precondition
    /// somewhere in the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, size) in [
            ("input", self.sizes.input),
            ("hidden", self.sizes.hidden),
            ("output", self.sizes.output),
        ] {
            if size == 0 {
                return Err(ConfigError::ZeroSize { name });
            }
        }
        if self.sizes.checked_parameter_count().is_none() {
            return Err(ConfigError::TooLarge { sizes: self.sizes });
        }
        for (name, count) in [
            ("replay_capacity", self.replay_capacity),
            ("batch_size", self.batch_size),
            ("decisions_per_tick", self.decisions_per_tick),
            ("inference_threads", self.inference_threads),
        ] {
            if count == 0 {
                return Err(ConfigError::ZeroCount { name });
            }
        }
        if self.batch_size > self.replay_capacity {
            return Err(ConfigError::BatchExceedsCapacity {
                batch_size: self.batch_size,
                replay_capacity: self.replay_capacity,
            });
        }
        for (name, value) in [
            ("temperature", self.temperature),
            ("trainer.epsilon", self.trainer.epsilon),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("trainer.discount_factor", self.trainer.discount_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(BrainConfig::default().validate(), Ok(()));
        assert_eq!(BrainConfig::default().sizes.parameter_count(), 7695);
    }

    #[test]
    fn test_zero_hidden_size_is_rejected() {
        let mut config = BrainConfig::default();
        config.sizes.hidden = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroSize { name: "hidden" })
        );
    }

    #[test]
    fn test_overflowing_sizes_are_rejected() {
        let mut config = BrainConfig::default();
        config.sizes.hidden = 1 << 32;
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooLarge {
                sizes: config.sizes
            })
        );
    }

    #[test]
    fn test_batch_larger_than_capacity_is_rejected() {
        let config = BrainConfig {
            replay_capacity: 10,
            batch_size: 11,
            ..BrainConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BatchExceedsCapacity { .. })
        ));
    }

    #[test]
    fn test_bad_rates_are_rejected() {
        let config = BrainConfig {
            temperature: 0.0,
            ..BrainConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NotPositive { .. })));

        let config = BrainConfig {
            mutation_rate: 1.5,
            ..BrainConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "`mutation_rate` must lie in [0, 1], got 1.5");
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = BrainConfig {
            seed: Some(42),
            ..BrainConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: BrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
