//! Flat parameter-vector operations.
//!
//! A parameter vector is the concatenation of every tensor of a network in the
//! canonical order described in [`layout`](crate::layout). The functions here
//! work on plain `&[f32]` slices so they can be applied to vectors obtained from
//! [`Network::weights`](crate::network::Network::weights), loaded from a
//! checkpoint, or produced by crossover.
//!
//! # Operations
//!
//! - **Construction**: [`from_fn`] builds a vector index by index
//! - **Initialization**: [`xavier`] fills a tensor with scaled Gaussian samples
//! - **Averaging**: [`average`] computes the element-wise mean of two parents with
//!   optional Gaussian noise
//! - **Update**: [`add_scaled`] applies a scaled step in place
//!
//! # Element-wise Semantics
//!
//! All binary operations assume both vectors come from networks with identical
//! [`NetworkSizes`](crate::layout::NetworkSizes). Element `i` of one vector then
//! refers to the same weight as element `i` of the other; mixing vectors of
//! different architectures is a caller bug and panics.

use rand::Rng;

use crate::gaussian;

/// Creates a weight vector by applying a function to each index.
///
/// # Examples
///
/// ```
/// use brainpool_net::weights;
///
/// let weights = weights::from_fn(|i| i as f32 * 0.5, 4);
/// assert_eq!(weights, vec![0.0, 0.5, 1.0, 1.5]);
/// ```
pub fn from_fn<F>(mut f: F, len: usize) -> Vec<f32>
where
    F: FnMut(usize) -> f32,
{
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        values.push(f(i));
    }
    values
}

/// Fills `tensor` with Xavier-style initial values.
///
/// Each element is a standard-normal sample multiplied by `sqrt(2 / fan_in)`.
///
/// # Panics
///
/// Panics if `fan_in` is zero.
#[expect(clippy::cast_precision_loss)]
pub fn xavier<R>(tensor: &mut [f32], fan_in: usize, rng: &mut R)
where
    R: Rng + ?Sized,
{
    assert!(fan_in > 0, "fan-in must be non-zero");
    let std = (2.0 / fan_in as f32).sqrt();
    for w in tensor {
        *w = gaussian::gaussian(rng) * std;
    }
}

/// Element-wise mean of two parameter vectors.
///
/// When `noise > 0`, an independent Gaussian sample scaled by `noise` is added to
/// every element. With `noise == 0` no random numbers are drawn and the result is
/// the exact mean.
///
/// # Panics
///
/// Panics if the vectors have different lengths.
///
/// # Examples
///
/// ```
/// use brainpool_net::weights;
///
/// let avg = weights::average(&[1.0, 2.0, 3.0], &[3.0, 4.0, 5.0], 0.0, &mut rand::rng());
/// assert_eq!(avg, vec![2.0, 3.0, 4.0]);
/// ```
pub fn average<R>(a: &[f32], b: &[f32], noise: f32, rng: &mut R) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    assert_eq!(a.len(), b.len(), "parameter vectors must have equal length");
    from_fn(
        |i| {
            let mean = (a[i] + b[i]) / 2.0;
            if noise > 0.0 {
                mean + gaussian::gaussian(rng) * noise
            } else {
                mean
            }
        },
        a.len(),
    )
}

/// Computes `weights[i] += scale * delta[i]` for every element.
///
/// # Panics
///
/// Panics if the vectors have different lengths.
pub fn add_scaled(weights: &mut [f32], delta: &[f32], scale: f32) {
    assert_eq!(
        weights.len(),
        delta.len(),
        "parameter vectors must have equal length"
    );
    for (w, d) in weights.iter_mut().zip(delta) {
        *w += scale * d;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_average_without_noise_is_exact_mean() {
        let mut rng = Pcg32::seed_from_u64(1);
        let a = [0.25, -1.5, 8.0, 0.0];
        let b = [0.75, 1.5, -2.0, 0.0];
        assert_eq!(average(&a, &b, 0.0, &mut rng), vec![0.5, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_average_with_noise_perturbs_every_element() {
        let mut rng = Pcg32::seed_from_u64(2);
        let a = vec![1.0; 64];
        let avg = average(&a, &a, 0.5, &mut rng);
        assert!(avg.iter().all(|&x| x != 1.0));
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn test_average_length_mismatch_panics() {
        let _ = average(&[1.0], &[1.0, 2.0], 0.0, &mut rand::rng());
    }

    #[test]
    fn test_xavier_scale() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut tensor = vec![0.0; 10_000];
        xavier(&mut tensor, 50, &mut rng);
        #[expect(clippy::cast_precision_loss)]
        let var = tensor.iter().map(|x| x * x).sum::<f32>() / tensor.len() as f32;
        assert!((var - 2.0 / 50.0).abs() < 0.005, "variance = {var}");
    }

    #[test]
    fn test_add_scaled() {
        let mut w = vec![1.0, 2.0];
        add_scaled(&mut w, &[2.0, -4.0], 0.5);
        assert_eq!(w, vec![2.0, 0.0]);
    }
}
