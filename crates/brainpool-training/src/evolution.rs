//! Genetic operators for evolving networks across generations.
//!
//! Evolution runs out-of-band from online training, typically when a new
//! generation of agents is bootstrapped. It never touches a network that is
//! being trained: [`crossover_networks`] builds a fresh network, and [`mutate`]
//! requires exclusive access.
//!
//! # Genetic Operators
//!
//! ## Averaging Crossover
//!
//! The child's parameters are the element-wise mean of both parents plus
//! Gaussian noise of scale `mutation_rate · CROSSOVER_NOISE_FACTOR`. This relies
//! on both parents sharing the canonical parameter layout, which holds for any
//! two networks with equal sizes.
//!
//! ## Point Mutation
//!
//! Each parameter independently, with probability `rate`, receives an additive
//! `N(0, 1) · MUTATION_SIGMA` perturbation. `rate = 0` never changes anything;
//! `rate = 1` perturbs every parameter.
//!
//! # Example
//!
//! ```
//! use brainpool_net::{Network, NetworkSizes};
//! use brainpool_training::evolution;
//!
//! let sizes = NetworkSizes::new(20, 32, 14);
//! let p1 = Network::new(sizes);
//! let p2 = Network::new(sizes);
//!
//! let mut rng = rand::rng();
//! let child = evolution::crossover_networks(&p1, &p2, 0.05, &mut rng);
//! assert_eq!(child.parameter_count(), p1.parameter_count());
//! ```

use brainpool_net::{Network, gaussian, weights};
use rand::{Rng, seq::IndexedRandom as _};

/// Scale of the Gaussian perturbation applied by [`mutate`].
pub const MUTATION_SIGMA: f32 = 0.1;

/// Crossover noise is `mutation_rate` times this factor.
pub const CROSSOVER_NOISE_FACTOR: f32 = 0.1;

/// Produces a child from two parents.
///
/// The child has `parent1`'s sizes; its parameters are
/// `average(parent1, parent2, mutation_rate · 0.1)` followed by
/// [`mutate`]`(child, mutation_rate)`.
///
/// # Panics
///
/// Panics if the parents have different sizes.
pub fn crossover_networks<R>(
    parent1: &Network,
    parent2: &Network,
    mutation_rate: f32,
    rng: &mut R,
) -> Network
where
    R: Rng + ?Sized,
{
    assert_eq!(
        parent1.sizes(),
        parent2.sizes(),
        "parents must share an architecture"
    );
    let child_weights = weights::average(
        parent1.weights_slice(),
        parent2.weights_slice(),
        mutation_rate * CROSSOVER_NOISE_FACTOR,
        rng,
    );
    let mut child = Network::from_weights(parent1.sizes(), &child_weights);
    mutate(&mut child, mutation_rate, rng);
    tracing::debug!(mutation_rate, "crossed over networks");
    child
}

/// Perturbs each parameter of `network` with probability `rate`, in place.
///
/// Returns the number of parameters that were mutated.
pub fn mutate<R>(network: &mut Network, rate: f32, rng: &mut R) -> usize
where
    R: Rng + ?Sized,
{
    let mut mutated = 0;
    for w in network.weights_mut() {
        if rng.random::<f32>() < rate {
            *w += gaussian::gaussian(rng) * MUTATION_SIGMA;
            mutated += 1;
        }
    }
    mutated
}

/// Breeds `count` children from a pool of parents.
///
/// Each child is the crossover of two distinct parents chosen uniformly at
/// random; a pool of one parent is crossed with itself.
///
/// # Panics
///
/// Panics if `parents` is empty or the parents have different sizes.
pub fn breed_population<R>(
    parents: &[Network],
    count: usize,
    mutation_rate: f32,
    rng: &mut R,
) -> Vec<Network>
where
    R: Rng + ?Sized,
{
    assert!(!parents.is_empty(), "at least one parent is required");
    (0..count)
        .map(|_| {
            let pair: Vec<&Network> = parents.choose_multiple(rng, 2).collect();
            let (p1, p2) = match pair.as_slice() {
                [p1, p2] => (*p1, *p2),
                _ => (pair[0], pair[0]),
            };
            crossover_networks(p1, p2, mutation_rate, rng)
        })
        .collect()
}
