//! Experience tuples consumed by the trainer.

use serde::{Deserialize, Serialize};

/// One observed transition: the agent saw `observation`, took `action`, received
/// `reward`, and then saw `next_observation`.
///
/// Experiences are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub observation: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_observation: Vec<f32>,
}

impl Experience {
    #[must_use]
    pub fn new(
        observation: Vec<f32>,
        action: usize,
        reward: f32,
        next_observation: Vec<f32>,
    ) -> Self {
        Self {
            observation,
            action,
            reward,
            next_observation,
        }
    }
}

/// Maps an out-of-range action index to the safe fallback action `0`.
///
/// ```
/// use brainpool_training::experience::clamp_action;
///
/// assert_eq!(clamp_action(3, 14), 3);
/// assert_eq!(clamp_action(14, 14), 0);
/// ```
#[must_use]
pub fn clamp_action(action: usize, action_count: usize) -> usize {
    if action < action_count { action } else { 0 }
}
