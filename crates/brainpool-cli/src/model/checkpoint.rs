use anyhow::{Context as _, ensure};
use brainpool_net::{Network, NetworkSizes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved network.
///
/// `weights` is the flat parameter vector in canonical layout order, so any
/// consumer that knows `sizes` can rebuild the network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Checkpoint {
    pub sizes: NetworkSizes,
    pub created_at: DateTime<Utc>,
    /// 0 for networks trained from scratch; children are one past their
    /// newest parent.
    pub generation: u32,
    pub weights: Vec<f32>,
}

impl Checkpoint {
    pub fn from_network(network: &Network, generation: u32) -> Self {
        Self {
            sizes: network.sizes(),
            created_at: Utc::now(),
            generation,
            weights: network.weights(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let NetworkSizes {
            input,
            hidden,
            output,
        } = self.sizes;
        ensure!(
            input > 0 && hidden > 0 && output > 0,
            "network sizes must be non-zero, got {input}/{hidden}/{output}"
        );
        ensure!(
            self.weights.iter().all(|w| w.is_finite()),
            "weights contain non-finite values"
        );
        let expected = self
            .sizes
            .checked_parameter_count()
            .with_context(|| format!("network sizes {input}/{hidden}/{output} are too large"))?;
        ensure!(
            self.weights.len() == expected,
            "expected {expected} weights, found {}",
            self.weights.len()
        );
        Ok(())
    }

    pub fn to_network(&self) -> anyhow::Result<Network> {
        self.validate()?;
        let mut network = Network::zeroed(self.sizes);
        network.try_set_weights(&self.weights)?;
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn network() -> Network {
        Network::with_rng(NetworkSizes::new(3, 4, 2), &mut Pcg32::seed_from_u64(8))
    }

    #[test]
    fn test_checkpoint_restores_network() {
        let network = network();
        let checkpoint = Checkpoint::from_network(&network, 2);
        let json = serde_json::to_string(&checkpoint).unwrap();
        let loaded: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.generation, 2);
        assert_eq!(loaded.to_network().unwrap(), network);
    }

    #[test]
    fn test_truncated_weights_are_rejected() {
        let mut checkpoint = Checkpoint::from_network(&network(), 0);
        checkpoint.weights.pop();
        let err = checkpoint.to_network().unwrap_err();
        assert!(err.to_string().contains("expected"));
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        let mut checkpoint = Checkpoint::from_network(&network(), 0);
        checkpoint.sizes.output = 0;
        assert!(checkpoint.validate().is_err());
    }

    #[test]
    fn test_oversized_network_is_rejected() {
        let json = r#"{
            "sizes": {"input": 1, "hidden": 4294967296, "output": 1},
            "created_at": "2026-01-01T00:00:00Z",
            "generation": 0,
            "weights": [0.0]
        }"#;
        let checkpoint: Checkpoint = serde_json::from_str(json).unwrap();
        let err = checkpoint.validate().unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
        assert!(checkpoint.to_network().is_err());
    }
}
