//! Element-wise activations with overflow-safe clamping.
//!
//! The network evaluates in `f64`; [`softmax`] keeps an `f32` entry point for
//! callers that work with stored probabilities.

/// Arguments to `sigmoid` and `tanh` are clamped to `[-ACTIVATION_CLAMP, ACTIVATION_CLAMP]`.
pub const ACTIVATION_CLAMP: f64 = 500.0;

#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    let x = x.clamp(-ACTIVATION_CLAMP, ACTIVATION_CLAMP);
    1.0 / (1.0 + (-x).exp())
}

#[must_use]
pub fn tanh(x: f64) -> f64 {
    x.clamp(-ACTIVATION_CLAMP, ACTIVATION_CLAMP).tanh()
}

#[must_use]
pub fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// Numerically stable softmax: the maximum logit is subtracted before exponentiating.
///
/// ```
/// use brainpool_net::activation::softmax_f64;
///
/// let probs = softmax_f64(&[1000.0, 1000.0]);
/// assert_eq!(probs, vec![0.5, 0.5]);
/// ```
#[must_use]
pub fn softmax_f64(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut exps: Vec<f64> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    for e in &mut exps {
        *e /= sum;
    }
    exps
}

/// [`softmax_f64`] for single-precision logits.
///
/// ```
/// use brainpool_net::activation::softmax;
///
/// let probs = softmax(&[1000.0, 1000.0]);
/// assert_eq!(probs, vec![0.5, 0.5]);
/// ```
#[must_use]
#[expect(clippy::cast_possible_truncation)]
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let wide: Vec<f64> = logits.iter().copied().map(f64::from).collect();
    softmax_f64(&wide).into_iter().map(|p| p as f32).collect()
}
