//! A network shared by a whole population.
//!
//! [`SharedNetwork`] is a cloneable handle to one [`Network`] behind a
//! reader/writer lock. Inference takes the read lock, so many forward passes can
//! run in parallel. Training takes the write lock and must hold it for the whole
//! batch: gradient probing temporarily perturbs individual weights, and a reader
//! observing a weight mid-perturbation would see a network that never existed.
//!
//! The network is plain data, so a poisoned lock is recovered rather than
//! propagated.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    layout::NetworkSizes,
    network::{ForwardOutput, Network},
};

#[derive(Debug, Clone)]
pub struct SharedNetwork {
    inner: Arc<RwLock<Network>>,
}

impl SharedNetwork {
    #[must_use]
    pub fn new(network: Network) -> Self {
        Self {
            inner: Arc::new(RwLock::new(network)),
        }
    }

    /// Acquires shared access for inference.
    pub fn read(&self) -> RwLockReadGuard<'_, Network> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires exclusive access. Hold the guard for the duration of one training batch.
    pub fn write(&self) -> RwLockWriteGuard<'_, Network> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs [`Network::forward`] under the read lock.
    #[must_use]
    pub fn forward(&self, observation: &[f32], hidden: &[f32]) -> ForwardOutput {
        self.read().forward(observation, hidden)
    }

    #[must_use]
    pub fn sizes(&self) -> NetworkSizes {
        self.read().sizes()
    }

    /// Clones the current network.
    #[must_use]
    pub fn snapshot(&self) -> Network {
        self.read().clone()
    }

    /// Replaces the network wholesale, returning the previous one.
    ///
    /// Used when a new generation is bootstrapped. Every handle observes the new
    /// network from its next lock acquisition on.
    ///
    /// # Panics
    ///
    /// Panics if the replacement has different sizes; agents' hidden states and
    /// observation encoders are sized for the current architecture.
    pub fn replace(&self, network: Network) -> Network {
        let mut guard = self.write();
        assert_eq!(
            guard.sizes(),
            network.sizes(),
            "replacement network must keep the architecture"
        );
        std::mem::replace(&mut *guard, network)
    }
}

impl From<Network> for SharedNetwork {
    fn from(network: Network) -> Self {
        Self::new(network)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn network(seed: u64) -> Network {
        Network::with_rng(NetworkSizes::new(4, 6, 3), &mut Pcg32::seed_from_u64(seed))
    }

    #[test]
    fn test_clones_share_one_network() {
        let shared = SharedNetwork::new(network(1));
        let other = shared.clone();
        assert_eq!(Arc::strong_count(&shared.inner), 2);

        other.write().set_parameter(0, 42.0);
        assert_eq!(shared.read().parameter(0), 42.0);
    }

    #[test]
    fn test_replace_swaps_generation() {
        let shared = SharedNetwork::new(network(1));
        let next = network(2);
        let expected = next.weights();
        let previous = shared.replace(next);
        assert_ne!(previous.weights(), expected);
        assert_eq!(shared.snapshot().weights(), expected);
    }

    #[test]
    fn test_parallel_readers_agree() {
        let shared = SharedNetwork::new(network(3));
        let hidden = vec![0.0; 6];
        let expected = shared.forward(&[0.5; 4], &hidden);
        thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| shared.forward(&[0.5; 4], &hidden)))
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }

    #[test]
    #[should_panic(expected = "keep the architecture")]
    fn test_replace_with_other_sizes_panics() {
        let shared = SharedNetwork::new(network(1));
        let _ = shared.replace(Network::zeroed(NetworkSizes::new(5, 6, 3)));
    }
}
