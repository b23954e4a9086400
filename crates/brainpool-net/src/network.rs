//! Recurrent policy-value network.
//!
//! A single GRU cell feeds two dense ReLU layers, followed by an actor head
//! (softmax over actions) and a critic head (scalar state value):
//!
//! ```text
//! [h, x] ──► z = σ(Wz·[h,x] + bz)
//!        ──► r = σ(Wr·[h,x] + br)
//! [r⊙h, x] ► ĥ = tanh(Wh·[r⊙h,x] + bh)
//! h' = (1-z)⊙h + z⊙ĥ
//! d1 = relu(W1·h' + b1)
//! d2 = relu(W2·d1 + b2)
//! π  = softmax(Wactor·d2 + bactor)
//! V  = Wcritic·d2 + bcritic
//! ```
//!
//! All tensors are views into one flat parameter vector (see [`layout`](crate::layout)),
//! so reading or replacing the parameters is a plain copy.
//!
//! [`Network::forward`] takes `&self` and keeps no scratch state: any number of
//! readers may run it concurrently, and identical inputs always give identical
//! outputs.
//!
//! Parameters are stored as `f32`, but every dot product, activation and the
//! softmax are evaluated in `f64`. [`Network::evaluate`] exposes that result
//! directly, so that changes far below `f32` resolution in the output (such as
//! the effect of a single nudged weight) remain measurable.

use rand::Rng;

use crate::{
    activation,
    layout::{NetworkSizes, ParameterLayout, Tensor},
    weights,
};

/// Returned by [`Network::try_set_weights`] when a parameter vector has the wrong length.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("parameter vector has {actual} values, expected {expected}")]
pub struct WeightLengthError {
    pub expected: usize,
    pub actual: usize,
}

/// Result of a single [`Network::forward`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardOutput {
    /// Probability of each action; sums to 1.
    pub action_probs: Vec<f32>,
    /// Critic estimate of the state value.
    pub value: f32,
    /// Hidden state to carry into the next call.
    pub new_hidden: Vec<f32>,
}

impl ForwardOutput {
    /// Log-probability of `action`, floored at [`MIN_PROBABILITY`] before the logarithm.
    ///
    /// # Panics
    ///
    /// Panics if `action` is out of range.
    #[must_use]
    pub fn log_prob(&self, action: usize) -> f32 {
        self.action_probs[action].max(MIN_PROBABILITY).ln()
    }
}

/// Probabilities are floored at this value before taking a logarithm.
pub const MIN_PROBABILITY: f32 = 1e-10;

/// Double-precision result of [`Network::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub action_probs: Vec<f64>,
    pub value: f64,
    pub new_hidden: Vec<f64>,
}

impl Evaluation {
    /// Log-probability of `action`, floored at [`MIN_PROBABILITY`] before the logarithm.
    ///
    /// # Panics
    ///
    /// Panics if `action` is out of range.
    #[must_use]
    pub fn log_prob(&self, action: usize) -> f64 {
        self.action_probs[action]
            .max(f64::from(MIN_PROBABILITY))
            .ln()
    }
}

impl From<Evaluation> for ForwardOutput {
    #[expect(clippy::cast_possible_truncation)]
    fn from(eval: Evaluation) -> Self {
        let narrow = |values: Vec<f64>| values.into_iter().map(|v| v as f32).collect();
        Self {
            action_probs: narrow(eval.action_probs),
            value: eval.value as f32,
            new_hidden: narrow(eval.new_hidden),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    layout: ParameterLayout,
    params: Vec<f32>,
}

impl Network {
    /// Creates a randomly initialized network using the thread-local generator.
    ///
    /// For reproducible initialization, use [`Self::with_rng`] instead.
    ///
    /// # Panics
    ///
    /// Panics if any size is zero.
    #[must_use]
    pub fn new(sizes: NetworkSizes) -> Self {
        Self::with_rng(sizes, &mut rand::rng())
    }

    /// Like [`Self::new`], but draws initial weights from `rng`.
    ///
    /// Each weight tensor is initialized independently with standard-normal samples
    /// scaled by `sqrt(2 / fan_in)`; biases start at zero.
    #[must_use]
    pub fn with_rng<R>(sizes: NetworkSizes, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut network = Self::zeroed(sizes);
        for tensor in Tensor::ALL {
            if let Some(fan_in) = tensor.fan_in(sizes) {
                let range = network.layout.range(tensor);
                weights::xavier(&mut network.params[range], fan_in, rng);
            }
        }
        network
    }

    /// Creates a network whose parameters are all zero.
    #[must_use]
    pub fn zeroed(sizes: NetworkSizes) -> Self {
        let layout = ParameterLayout::new(sizes);
        let params = vec![0.0; layout.total()];
        Self { layout, params }
    }

    /// Creates a network from an existing parameter vector.
    ///
    /// # Panics
    ///
    /// Panics if `weights.len()` differs from [`NetworkSizes::parameter_count`].
    #[must_use]
    pub fn from_weights(sizes: NetworkSizes, weights: &[f32]) -> Self {
        let mut network = Self::zeroed(sizes);
        network.set_weights(weights);
        network
    }

    #[must_use]
    pub fn sizes(&self) -> NetworkSizes {
        self.layout.sizes()
    }

    #[must_use]
    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    /// A zero hidden state of the right length.
    #[must_use]
    pub fn zero_hidden(&self) -> Vec<f32> {
        vec![0.0; self.sizes().hidden]
    }

    /// Copies out the full parameter vector in canonical order.
    #[must_use]
    pub fn weights(&self) -> Vec<f32> {
        self.params.clone()
    }

    /// Borrows the parameter vector without copying.
    #[must_use]
    pub fn weights_slice(&self) -> &[f32] {
        &self.params
    }

    /// Mutable access to the parameter vector; its length cannot change.
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    /// Replaces every parameter.
    ///
    /// # Panics
    ///
    /// Panics if `weights` has the wrong length. Use [`Self::try_set_weights`] for
    /// vectors from untrusted sources.
    pub fn set_weights(&mut self, weights: &[f32]) {
        assert_eq!(
            weights.len(),
            self.params.len(),
            "parameter vector length mismatch for {:?}",
            self.sizes()
        );
        self.params.copy_from_slice(weights);
    }

    /// Like [`Self::set_weights`], but reports a length mismatch instead of panicking.
    pub fn try_set_weights(&mut self, weights: &[f32]) -> Result<(), WeightLengthError> {
        if weights.len() != self.params.len() {
            return Err(WeightLengthError {
                expected: self.params.len(),
                actual: weights.len(),
            });
        }
        self.params.copy_from_slice(weights);
        Ok(())
    }

    #[must_use]
    pub fn parameter(&self, index: usize) -> f32 {
        self.params[index]
    }

    pub fn set_parameter(&mut self, index: usize, value: f32) {
        self.params[index] = value;
    }

    /// Parameters of one tensor.
    #[must_use]
    pub fn tensor(&self, tensor: Tensor) -> &[f32] {
        &self.params[self.layout.range(tensor)]
    }

    /// Runs one recurrent step.
    ///
    /// `observation` shorter than the input size is padded with zeros; extra
    /// entries are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `hidden.len()` differs from the hidden size.
    #[must_use]
    pub fn forward(&self, observation: &[f32], hidden: &[f32]) -> ForwardOutput {
        self.evaluate(observation, hidden).into()
    }

    /// Runs one recurrent step and keeps the double-precision result.
    ///
    /// [`Self::forward`] is this call narrowed to `f32`.
    ///
    /// # Panics
    ///
    /// Panics if `hidden.len()` differs from the hidden size.
    #[must_use]
    pub fn evaluate(&self, observation: &[f32], hidden: &[f32]) -> Evaluation {
        let NetworkSizes {
            input: input_size,
            hidden: hs,
            output: os,
        } = self.sizes();
        assert_eq!(hidden.len(), hs, "hidden state length mismatch");

        let hidden: Vec<f64> = hidden.iter().copied().map(f64::from).collect();
        let mut hx = vec![0.0; hs + input_size];
        hx[..hs].copy_from_slice(&hidden);
        for (dst, &src) in hx[hs..].iter_mut().zip(observation) {
            *dst = f64::from(src);
        }

        let mut z = vec![0.0; hs];
        self.affine(
            Tensor::UpdateGateWeights,
            Tensor::UpdateGateBias,
            &hx,
            &mut z,
        );
        z.iter_mut().for_each(|v| *v = activation::sigmoid(*v));

        let mut r = vec![0.0; hs];
        self.affine(Tensor::ResetGateWeights, Tensor::ResetGateBias, &hx, &mut r);
        r.iter_mut().for_each(|v| *v = activation::sigmoid(*v));

        // reuse hx as [r⊙h, x]
        for i in 0..hs {
            hx[i] = r[i] * hidden[i];
        }
        let mut h_hat = r;
        self.affine(
            Tensor::CandidateWeights,
            Tensor::CandidateBias,
            &hx,
            &mut h_hat,
        );
        h_hat.iter_mut().for_each(|v| *v = activation::tanh(*v));

        let new_hidden: Vec<f64> = (0..hs)
            .map(|i| (1.0 - z[i]) * hidden[i] + z[i] * h_hat[i])
            .collect();

        let mut d1 = z;
        self.affine(Tensor::Dense1Weights, Tensor::Dense1Bias, &new_hidden, &mut d1);
        d1.iter_mut().for_each(|v| *v = activation::relu(*v));

        let mut d2 = h_hat;
        self.affine(Tensor::Dense2Weights, Tensor::Dense2Bias, &d1, &mut d2);
        d2.iter_mut().for_each(|v| *v = activation::relu(*v));

        let mut logits = vec![0.0; os];
        self.affine(Tensor::ActorWeights, Tensor::ActorBias, &d2, &mut logits);
        let action_probs = activation::softmax_f64(&logits);

        let mut value = [0.0];
        self.affine(Tensor::CriticWeights, Tensor::CriticBias, &d2, &mut value);

        Evaluation {
            action_probs,
            value: value[0],
            new_hidden,
        }
    }

    /// `out = W·x + b` for a row-major `W`, accumulated in `f64`.
    fn affine(&self, weights: Tensor, bias: Tensor, x: &[f64], out: &mut [f64]) {
        let w = self.tensor(weights);
        let b = self.tensor(bias);
        let cols = x.len();
        debug_assert_eq!(w.len(), out.len() * cols);
        for (i, (o, row)) in out.iter_mut().zip(w.chunks_exact(cols)).enumerate() {
            *o = row
                .iter()
                .zip(x)
                .map(|(&w, &x)| f64::from(w) * x)
                .sum::<f64>()
                + f64::from(b[i]);
        }
    }
}
