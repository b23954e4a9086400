//! Turning action probabilities into a chosen action.
//!
//! The network only produces a distribution; these helpers sample from it, apply
//! validity masks supplied by the action-decoding collaborator, and compute the
//! diversity statistic consumers use for reward shaping. Action index `0` is the
//! safe fallback everywhere.

use brainpool_net::network::MIN_PROBABILITY;
use rand::Rng;

pub use brainpool_training::experience::clamp_action;

/// Recent-action share above which [`diversity_penalty`] applies.
pub const DIVERSITY_THRESHOLD: f32 = 0.5;

/// Penalty per unit of recent-action share past [`DIVERSITY_THRESHOLD`].
pub const DIVERSITY_PENALTY_SCALE: f32 = 0.1;

/// Samples an action index from `probs`.
///
/// A uniform draw in `[0, 1)` is compared against the cumulative sum of the
/// probabilities. If rounding leaves the draw uncovered, the last index is
/// returned. With `temperature != 1`, log-probabilities (floored at
/// [`MIN_PROBABILITY`]) are divided by the temperature and re-normalized first:
/// lower temperatures sharpen the distribution, higher ones flatten it.
///
/// # Panics
///
/// Panics if `probs` is empty or `temperature` is not positive.
pub fn select_action<R>(probs: &[f32], temperature: f32, rng: &mut R) -> usize
where
    R: Rng + ?Sized,
{
    assert!(!probs.is_empty(), "cannot sample from an empty distribution");
    assert!(temperature > 0.0, "temperature must be positive");

    let scaled;
    let probs = if (temperature - 1.0).abs() > f32::EPSILON {
        scaled = apply_temperature(probs, temperature);
        &scaled
    } else {
        probs
    };

    let draw = rng.random::<f32>();
    let mut cumulative = 0.0;
    for (i, p) in probs.iter().enumerate() {
        cumulative += p;
        if draw < cumulative {
            return i;
        }
    }
    probs.len() - 1
}

fn apply_temperature(probs: &[f32], temperature: f32) -> Vec<f32> {
    let logits: Vec<f32> = probs
        .iter()
        .map(|p| p.max(MIN_PROBABILITY).ln() / temperature)
        .collect();
    brainpool_net::activation::softmax(&logits)
}

/// Zeroes the probability of every invalid action and re-normalizes.
///
/// If no valid action has positive probability, all mass goes to action `0`.
/// Entries of `probs` beyond `valid.len()` are treated as invalid.
///
/// ```
/// use brainpool_agent::action::mask_actions;
///
/// assert_eq!(mask_actions(&[0.5, 0.25, 0.25], &[false, true, true]), vec![0.0, 0.5, 0.5]);
/// assert_eq!(mask_actions(&[0.5, 0.5], &[false, false]), vec![1.0, 0.0]);
/// ```
#[must_use]
pub fn mask_actions(probs: &[f32], valid: &[bool]) -> Vec<f32> {
    let masked: Vec<f32> = probs
        .iter()
        .enumerate()
        .map(|(i, &p)| if valid.get(i).copied().unwrap_or(false) { p } else { 0.0 })
        .collect();
    let sum: f32 = masked.iter().sum();
    if sum <= 0.0 {
        let mut fallback = vec![0.0; probs.len()];
        if let Some(first) = fallback.first_mut() {
            *first = 1.0;
        }
        return fallback;
    }
    masked.into_iter().map(|p| p / sum).collect()
}

/// Reward penalty for repeating `action` too often.
///
/// Returns `DIVERSITY_PENALTY_SCALE · share` when the action's share of recent
/// actions exceeds [`DIVERSITY_THRESHOLD`], and `0` otherwise (including for
/// out-of-range actions).
#[must_use]
pub fn diversity_penalty(distribution: &[f32], action: usize) -> f32 {
    match distribution.get(action) {
        Some(&share) if share > DIVERSITY_THRESHOLD => DIVERSITY_PENALTY_SCALE * share,
        _ => 0.0,
    }
}
