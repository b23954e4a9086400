//! Standard-normal sampling via the Box–Muller transform.
//!
//! Used by weight initialization, mutation, and crossover noise. The first
//! uniform draw is floored at [`UNIFORM_FLOOR`] so that `ln(u1)` stays finite
//! even when the generator returns exactly `0.0`.

use std::f32::consts::TAU;

use rand::{Rng, distr::Distribution};

/// Lower bound applied to the first uniform draw before taking its logarithm.
pub const UNIFORM_FLOOR: f32 = 1e-10;

/// Box–Muller standard-normal distribution.
///
/// # Example
///
/// ```
/// use brainpool_net::gaussian::BoxMuller;
/// use rand::Rng as _;
///
/// let mut rng = rand::rng();
/// let x: f32 = rng.sample(BoxMuller);
/// assert!(x.is_finite());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxMuller;

impl Distribution<f32> for BoxMuller {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let u1 = rng.random::<f32>();
        let u2 = rng.random::<f32>();
        transform(u1, u2)
    }
}

/// Draws one standard-normal sample.
pub fn gaussian<R>(rng: &mut R) -> f32
where
    R: Rng + ?Sized,
{
    rng.sample(BoxMuller)
}

fn transform(u1: f32, u2: f32) -> f32 {
    let u1 = u1.max(UNIFORM_FLOOR);
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
