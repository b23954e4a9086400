//! Online advantage actor-critic training with a finite-difference gradient.
//!
//! This module updates a shared [`Network`] from a batch of [`Experience`]s. It
//! performs no backpropagation: the gradient of each objective with respect to a
//! weight is estimated by nudging that single weight and re-running the forward
//! pass.
//!
//! # Algorithm Overview
//!
//! For each experience `(s, a, r, s')`:
//!
//! 1. **Evaluate** - `forward(s, 0)` gives `π(·|s)` and `V(s)`; `forward(s', 0)` gives `V(s')`
//! 2. **Advantage** - `A = r + γ·V(s') − V(s)`
//! 3. **Probe** - for every `stride`-th weight `θᵢ`: set `θᵢ += ε`, re-run
//!    `forward(s, 0)`, restore `θᵢ`, and record
//!    `gᵢ = A·Δlog π(a|s)/ε − 0.5·A·ΔV(s)/ε`
//!
//! The per-experience gradients are summed and applied as gradient ascent:
//! `θᵢ += (α / batch_size)·Σgᵢ`.
//!
//! # Estimator Properties
//!
//! The estimator is biased and incomplete by construction:
//!
//! - **Stride sampling**: only about `probe_budget` weights are probed per
//!   experience (every `stride`-th index, `stride = max(1, total / probe_budget)`).
//!   All other weights receive exactly zero gradient from that experience.
//! - **One-sided differences**: `(f(θ+ε) − f(θ))/ε` carries an `O(ε)` truncation
//!   error.
//! - **No recurrence**: every evaluation starts from a zero hidden state, so the
//!   temporal context an agent had when it acted is not reproduced.
//!
//! Evaluations go through [`Network::evaluate`], which accumulates in `f64`.
//! A nudge of `ε = 1e-4` moves `log π(a|s)` by far less than one `f32` ulp of a
//! typical log-probability, so single-precision differences would be mostly
//! rounding noise. The divisor is the step actually stored in the `f32` weight,
//! not the nominal `ε`.
//!
//! Monotonic loss decrease is therefore not expected. Swapping in analytic
//! gradients would change what agents learn, so the estimator is kept as is;
//! `epsilon`, `probe_budget`, and `probe_stride` are exposed in
//! [`TrainerParams`] instead of being tuned here.
//!
//! # Concurrency
//!
//! Probing temporarily changes weights of the network being trained. The
//! functions here take `&mut Network`; when the network is shared through
//! [`SharedNetwork`](brainpool_net::SharedNetwork), the caller holds the write
//! guard for the whole batch so that no reader observes a perturbed weight.
//!
//! # Loss
//!
//! The returned loss `mean(−A·log π(a|s) + 0.5·A²)` is a diagnostic only; it
//! neither gates nor scales the update.

use brainpool_net::{Evaluation, Network};
use serde::{Deserialize, Serialize};

use crate::experience::{Experience, clamp_action};

/// Hyperparameters for [`train_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerParams {
    /// Step size α of the ascent update.
    pub learning_rate: f32,
    /// Discount γ applied to `V(s')`.
    pub discount_factor: f32,
    /// Perturbation size ε for finite differences.
    pub epsilon: f32,
    /// Approximate number of weights probed per experience.
    pub probe_budget: usize,
    /// Explicit probe stride; overrides `probe_budget` when set.
    pub probe_stride: Option<usize>,
}

impl Default for TrainerParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            discount_factor: 0.99,
            epsilon: 1e-4,
            probe_budget: 200,
            probe_stride: None,
        }
    }
}

impl TrainerParams {
    /// Distance between consecutive probed weight indices.
    ///
    /// ```
    /// use brainpool_training::policy_gradient::TrainerParams;
    ///
    /// let params = TrainerParams::default();
    /// assert_eq!(params.stride(7695), 38);
    /// assert_eq!(params.stride(150), 1);
    /// ```
    #[must_use]
    pub fn stride(&self, parameter_count: usize) -> usize {
        self.probe_stride
            .unwrap_or_else(|| parameter_count / self.probe_budget.max(1))
            .max(1)
    }
}

/// Summary of one [`train_batch_with_report`] call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrainingOutcome {
    /// Number of experiences in the batch.
    pub batch_size: usize,
    /// Mean of `−A·log π(a|s) + 0.5·A²`.
    pub loss: f32,
    /// Mean advantage over the batch.
    pub mean_advantage: f32,
    /// Weights probed per experience.
    pub probed: usize,
}

/// Trains `network` on `experiences` and returns the diagnostic loss.
///
/// An empty batch leaves the network untouched and returns `0.0`.
pub fn train_batch(
    network: &mut Network,
    experiences: &[Experience],
    params: &TrainerParams,
) -> f32 {
    train_batch_with_report(network, experiences, params).loss
}

/// Like [`train_batch`], but returns a full [`TrainingOutcome`].
#[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn train_batch_with_report(
    network: &mut Network,
    experiences: &[Experience],
    params: &TrainerParams,
) -> TrainingOutcome {
    if experiences.is_empty() {
        return TrainingOutcome::default();
    }

    let zero_hidden = network.zero_hidden();
    let action_count = network.sizes().output;
    let discount = f64::from(params.discount_factor);
    let mut grad_sum = vec![0.0; network.parameter_count()];
    let mut total_loss = 0.0;
    let mut total_advantage = 0.0;
    let mut probed = 0;

    for exp in experiences {
        let action = clamp_action(exp.action, action_count);
        let base = network.evaluate(&exp.observation, &zero_hidden);
        let next_value = network.evaluate(&exp.next_observation, &zero_hidden).value;
        let advantage = f64::from(exp.reward) + discount * next_value - base.value;

        probed = accumulate_gradient(
            network,
            &exp.observation,
            action,
            advantage,
            &base,
            params,
            &mut grad_sum,
        );

        total_loss += -advantage * base.log_prob(action) + 0.5 * advantage * advantage;
        total_advantage += advantage;
    }

    let batch_size = experiences.len();
    let n = batch_size as f64;
    let grad_sum: Vec<f32> = grad_sum.into_iter().map(|g| g as f32).collect();
    brainpool_net::weights::add_scaled(
        network.weights_mut(),
        &grad_sum,
        params.learning_rate / batch_size as f32,
    );

    let outcome = TrainingOutcome {
        batch_size,
        loss: (total_loss / n) as f32,
        mean_advantage: (total_advantage / n) as f32,
        probed,
    };
    tracing::debug!(
        batch_size,
        loss = outcome.loss,
        mean_advantage = outcome.mean_advantage,
        probed,
        "trained batch"
    );
    outcome
}

/// Estimates the gradient for a single experience.
///
/// The returned vector has one entry per parameter; unprobed entries are zero.
/// `network` is restored exactly before returning.
///
/// # Panics
///
/// Panics if `action` is not a valid action index.
#[must_use]
#[expect(clippy::cast_possible_truncation)]
pub fn compute_gradient(
    network: &mut Network,
    observation: &[f32],
    action: usize,
    advantage: f32,
    params: &TrainerParams,
) -> Vec<f32> {
    let base = network.evaluate(observation, &network.zero_hidden());
    let mut grad = vec![0.0; network.parameter_count()];
    accumulate_gradient(
        network,
        observation,
        action,
        f64::from(advantage),
        &base,
        params,
        &mut grad,
    );
    grad.into_iter().map(|g| g as f32).collect()
}

/// Adds the probed gradient of one experience into `grad` and returns the number
/// of weights probed.
///
/// A weight too large for `ε` to change in `f32` gets no contribution.
fn accumulate_gradient(
    network: &mut Network,
    observation: &[f32],
    action: usize,
    advantage: f64,
    base: &Evaluation,
    params: &TrainerParams,
    grad: &mut [f64],
) -> usize {
    let stride = params.stride(network.parameter_count());
    let zero_hidden = network.zero_hidden();
    let base_log_prob = base.log_prob(action);

    let mut probed = 0;
    for i in (0..network.parameter_count()).step_by(stride) {
        let original = network.parameter(i);
        let nudged = original + params.epsilon;
        network.set_parameter(i, nudged);
        let perturbed = network.evaluate(observation, &zero_hidden);
        network.set_parameter(i, original);
        probed += 1;

        let step = f64::from(nudged) - f64::from(original);
        if step == 0.0 {
            continue;
        }
        let d_log_prob = (perturbed.log_prob(action) - base_log_prob) / step;
        let d_value = (perturbed.value - base.value) / step;
        grad[i] += advantage * d_log_prob - 0.5 * advantage * d_value;
    }
    probed
}

#[cfg(test)]
mod tests {
    use brainpool_net::NetworkSizes;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn network() -> Network {
        Network::with_rng(NetworkSizes::new(4, 6, 3), &mut Pcg32::seed_from_u64(11))
    }

    fn experience(action: usize, reward: f32) -> Experience {
        Experience::new(vec![0.2, -0.1, 0.5, 0.9], action, reward, vec![0.3, 0.0, 0.4, 1.0])
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut net = network();
        let before = net.weights();
        let loss = train_batch(&mut net, &[], &TrainerParams::default());
        assert_eq!(loss, 0.0);
        let after = net.weights();
        assert!(before.iter().zip(&after).all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    #[test]
    fn test_stride_override() {
        let params = TrainerParams {
            probe_stride: Some(7),
            ..TrainerParams::default()
        };
        assert_eq!(params.stride(10_000), 7);
        let params = TrainerParams {
            probe_stride: Some(0),
            ..TrainerParams::default()
        };
        assert_eq!(params.stride(10_000), 1);
    }

    #[test]
    fn test_gradient_is_zero_off_stride_and_network_restored() {
        let mut net = network();
        let before = net.weights();
        let params = TrainerParams {
            probe_stride: Some(5),
            ..TrainerParams::default()
        };
        let grad = compute_gradient(&mut net, &[0.2, -0.1, 0.5, 0.9], 1, 1.5, &params);
        assert_eq!(grad.len(), net.parameter_count());
        for (i, g) in grad.iter().enumerate() {
            if i % 5 != 0 {
                assert_eq!(*g, 0.0, "index {i}");
            }
        }
        assert!(grad.iter().step_by(5).any(|g| *g != 0.0));
        assert_eq!(net.weights(), before);
    }

    #[test]
    fn test_zero_advantage_gives_zero_gradient() {
        let mut net = network();
        let grad = compute_gradient(&mut net, &[1.0; 4], 0, 0.0, &TrainerParams::default());
        assert!(grad.iter().all(|g| *g == 0.0));
    }

    #[test]
    fn test_training_changes_only_probed_weights() {
        let mut net = network();
        let before = net.weights();
        let params = TrainerParams {
            learning_rate: 0.01,
            probe_stride: Some(3),
            ..TrainerParams::default()
        };
        let outcome = train_batch_with_report(&mut net, &[experience(2, 1.0)], &params);
        assert_eq!(outcome.batch_size, 1);
        assert_eq!(outcome.probed, net.parameter_count().div_ceil(3));
        assert!(outcome.loss.is_finite());

        let after = net.weights();
        for (i, (a, b)) in before.iter().zip(&after).enumerate() {
            if i % 3 != 0 {
                assert_eq!(a.to_bits(), b.to_bits(), "index {i}");
            }
        }
        assert_ne!(before, after);
    }

    #[test]
    fn test_out_of_range_action_falls_back_to_zero() {
        let mut a = network();
        let mut b = network();
        let params = TrainerParams::default();
        let la = train_batch(&mut a, &[experience(99, 0.5)], &params);
        let lb = train_batch(&mut b, &[experience(0, 0.5)], &params);
        assert_eq!(la.to_bits(), lb.to_bits());
        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn test_loss_matches_definition_for_single_experience() {
        let mut net = network();
        let exp = experience(1, 0.75);
        let params = TrainerParams::default();
        let zero = net.zero_hidden();
        let base = net.evaluate(&exp.observation, &zero);
        let next = net.evaluate(&exp.next_observation, &zero);
        let advantage = f64::from(exp.reward)
            + f64::from(params.discount_factor) * next.value
            - base.value;
        let expected = -advantage * base.log_prob(1) + 0.5 * advantage * advantage;

        let loss = train_batch(&mut net, &[exp], &params);
        assert!((f64::from(loss) - expected).abs() < 1e-5);
    }

    /// Central difference of the actor-critic objective at weight `i`, evaluated
    /// on the stored `f32` weights.
    fn central_difference(
        net: &mut Network,
        observation: &[f32],
        action: usize,
        advantage: f64,
        i: usize,
    ) -> f64 {
        let zero = net.zero_hidden();
        let original = net.parameter(i);
        let (up, down) = (original + 1e-3, original - 1e-3);
        net.set_parameter(i, up);
        let plus = net.evaluate(observation, &zero);
        net.set_parameter(i, down);
        let minus = net.evaluate(observation, &zero);
        net.set_parameter(i, original);

        let step = f64::from(up) - f64::from(down);
        let d_log_prob = (plus.log_prob(action) - minus.log_prob(action)) / step;
        let d_value = (plus.value - minus.value) / step;
        advantage * d_log_prob - 0.5 * advantage * d_value
    }

    #[test]
    fn test_gradient_agrees_with_central_difference() {
        let sizes = NetworkSizes::new(20, 32, 14);
        let mut net = Network::with_rng(sizes, &mut Pcg32::seed_from_u64(5));
        #[expect(clippy::cast_precision_loss)]
        let observation: Vec<f32> = (0..20).map(|i| (i as f32 * 0.37).sin()).collect();
        let params = TrainerParams::default();
        let stride = params.stride(net.parameter_count());
        let grad = compute_gradient(&mut net, &observation, 3, 1.0, &params);

        let mut compared = 0;
        let mut relative_errors = Vec::new();
        for i in (0..net.parameter_count()).step_by(stride) {
            let reference = central_difference(&mut net, &observation, 3, 1.0, i);
            let estimate = f64::from(grad[i]);
            if reference.abs() > 1e-3 {
                assert_eq!(
                    estimate.signum(),
                    reference.signum(),
                    "index {i}: estimate {estimate}, reference {reference}"
                );
                compared += 1;
            }
            if reference.abs() > 1e-2 {
                relative_errors.push((estimate - reference).abs() / reference.abs());
            }
        }
        assert!(compared > 10, "only {compared} weights compared");
        #[expect(clippy::cast_precision_loss)]
        let mean_error =
            relative_errors.iter().sum::<f64>() / relative_errors.len().max(1) as f64;
        assert!(mean_error < 0.05, "mean relative error {mean_error}");
    }
}
