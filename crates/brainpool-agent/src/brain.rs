//! Per-agent learning state.
//!
//! Each agent owns one [`BrainState`]: its recurrent hidden state, a bounded
//! replay buffer of experiences, a short history of recent actions, and the
//! counter that drives its training cadence. The network itself is shared and
//! not owned here.

use std::collections::VecDeque;

use arrayvec::ArrayVec;
use brainpool_training::experience::Experience;
use rand::Rng;

/// Number of actions remembered for diversity statistics.
pub const RECENT_ACTION_CAPACITY: usize = 10;

/// Bounded FIFO queue of experiences.
///
/// Pushing past capacity evicts the oldest experience first.
///
/// # Example
///
/// ```
/// use brainpool_agent::brain::ReplayBuffer;
/// use brainpool_training::experience::Experience;
///
/// let mut buffer = ReplayBuffer::new(2);
/// for i in 0..3 {
///     buffer.push(Experience::new(vec![i as f32], 0, 0.0, vec![]));
/// }
/// assert_eq!(buffer.len(), 2);
/// assert_eq!(buffer.iter().next().unwrap().observation, vec![1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    capacity: usize,
    items: VecDeque<Experience>,
}

impl ReplayBuffer {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be non-zero");
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends an experience, returning the evicted one if the buffer was full.
    pub fn push(&mut self, experience: Experience) -> Option<Experience> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(experience);
        evicted
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Oldest experience first.
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.items.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Experience> {
        self.items.get(index)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Draws `batch_size` experiences uniformly with replacement.
    ///
    /// Returns an empty batch when the buffer is empty.
    pub fn sample<R>(&self, batch_size: usize, rng: &mut R) -> Vec<Experience>
    where
        R: Rng + ?Sized,
    {
        if self.items.is_empty() {
            return vec![];
        }
        (0..batch_size)
            .map(|_| self.items[rng.random_range(0..self.items.len())].clone())
            .collect()
    }
}

/// The last [`RECENT_ACTION_CAPACITY`] actions an agent took.
///
/// Used only for diversity statistics; independent of the replay buffer.
#[derive(Debug, Clone, Default)]
pub struct RecentActions {
    actions: ArrayVec<usize, RECENT_ACTION_CAPACITY>,
}

impl RecentActions {
    pub fn push(&mut self, action: usize) {
        if self.actions.is_full() {
            self.actions.remove(0);
        }
        self.actions.push(action);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.actions.iter().copied()
    }

    /// Fraction of recent actions equal to each index in `0..action_count`.
    ///
    /// Out-of-range actions count toward the total but not toward any index.
    /// With no history every fraction is zero.
    ///
    /// ```
    /// use brainpool_agent::brain::RecentActions;
    ///
    /// let mut recent = RecentActions::default();
    /// for action in [0, 0, 1, 1, 1] {
    ///     recent.push(action);
    /// }
    /// assert_eq!(recent.distribution(3), vec![0.4, 0.6, 0.0]);
    /// ```
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn distribution(&self, action_count: usize) -> Vec<f32> {
        let mut counts = vec![0usize; action_count];
        for &action in &self.actions {
            if let Some(c) = counts.get_mut(action) {
                *c += 1;
            }
        }
        let total = self.actions.len().max(1) as f32;
        counts.into_iter().map(|c| c as f32 / total).collect()
    }
}

/// Learning state of one agent.
#[derive(Debug, Clone)]
pub struct BrainState {
    hidden: Vec<f32>,
    replay: ReplayBuffer,
    recent_actions: RecentActions,
    current_action: usize,
    pending: Option<Vec<f32>>,
    ticks_since_training: u32,
    total_reward: f32,
}

impl BrainState {
    /// Creates a brain with a zero hidden state and empty buffers.
    ///
    /// # Panics
    ///
    /// Panics if `hidden_size` or `replay_capacity` is zero.
    #[must_use]
    pub fn new(hidden_size: usize, replay_capacity: usize) -> Self {
        assert!(hidden_size > 0, "hidden size must be non-zero");
        Self {
            hidden: vec![0.0; hidden_size],
            replay: ReplayBuffer::new(replay_capacity),
            recent_actions: RecentActions::default(),
            current_action: 0,
            pending: None,
            ticks_since_training: 0,
            total_reward: 0.0,
        }
    }

    #[must_use]
    pub fn hidden(&self) -> &[f32] {
        &self.hidden
    }

    /// Overwrites the hidden state with the output of a forward pass.
    ///
    /// # Panics
    ///
    /// Panics if the length changes.
    pub fn set_hidden(&mut self, hidden: Vec<f32>) {
        assert_eq!(hidden.len(), self.hidden.len(), "hidden state length mismatch");
        self.hidden = hidden;
    }

    #[must_use]
    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    #[must_use]
    pub fn recent_actions(&self) -> &RecentActions {
        &self.recent_actions
    }

    /// The action chosen at this agent's most recent decision.
    #[must_use]
    pub fn current_action(&self) -> usize {
        self.current_action
    }

    #[must_use]
    pub fn ticks_since_training(&self) -> u32 {
        self.ticks_since_training
    }

    #[must_use]
    pub fn total_reward(&self) -> f32 {
        self.total_reward
    }

    /// Stores a decision: the chosen action and the observation it was based on.
    pub(crate) fn begin_action(&mut self, observation: Vec<f32>, action: usize) {
        self.current_action = action;
        self.pending = Some(observation);
    }

    /// `true` if a decision is waiting for its outcome.
    #[must_use]
    pub fn has_pending_action(&self) -> bool {
        self.pending.is_some()
    }

    /// Completes the pending decision with its outcome and records the experience.
    ///
    /// Returns `false` (and records nothing) if no decision is pending.
    pub fn complete_action(&mut self, reward: f32, next_observation: Vec<f32>) -> bool {
        let Some(observation) = self.pending.take() else {
            return false;
        };
        let experience = Experience::new(
            observation,
            self.current_action,
            reward,
            next_observation,
        );
        self.record(experience);
        true
    }

    /// Records an experience in the replay buffer and its action in the recent
    /// history, and accumulates its reward.
    pub fn record(&mut self, experience: Experience) {
        self.recent_actions.push(experience.action);
        self.total_reward += experience.reward;
        self.replay.push(experience);
    }

    pub(crate) fn count_tick(&mut self) -> u32 {
        self.ticks_since_training = self.ticks_since_training.saturating_add(1);
        self.ticks_since_training
    }

    pub(crate) fn reset_training_counter(&mut self) {
        self.ticks_since_training = 0;
    }

    /// Zeroes the hidden state and drops any pending decision.
    ///
    /// Experiences are kept.
    pub fn reset_hidden(&mut self) {
        self.hidden.fill(0.0);
        self.pending = None;
    }

    /// Clears all learned memory: hidden state, pending decision, replay buffer,
    /// and recent actions.
    pub fn reset_memory(&mut self) {
        self.reset_hidden();
        self.replay.clear();
        self.recent_actions = RecentActions::default();
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[expect(clippy::cast_precision_loss)]
    fn experience(i: usize) -> Experience {
        Experience::new(vec![i as f32], i % 14, 0.1, vec![(i + 1) as f32])
    }

    #[test]
    fn test_replay_buffer_keeps_last_pushed_in_order() {
        let mut buffer = ReplayBuffer::new(100);
        for i in 0..150 {
            buffer.push(experience(i));
        }
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.get(0), Some(&experience(50)));
        let expected: Vec<Experience> = (50..150).map(experience).collect();
        assert!(buffer.iter().eq(expected.iter()));
    }

    #[test]
    fn test_push_reports_eviction() {
        let mut buffer = ReplayBuffer::new(1);
        assert_eq!(buffer.push(experience(0)), None);
        assert_eq!(buffer.push(experience(1)), Some(experience(0)));
    }

    #[test]
    fn test_sample_with_replacement() {
        let mut rng = Pcg32::seed_from_u64(9);
        let mut buffer = ReplayBuffer::new(4);
        buffer.push(experience(7));
        let batch = buffer.sample(5, &mut rng);
        assert_eq!(batch.len(), 5);
        assert!(batch.iter().all(|e| *e == experience(7)));

        assert!(ReplayBuffer::new(3).sample(5, &mut rng).is_empty());
    }

    #[test]
    fn test_recent_actions_capacity() {
        let mut recent = RecentActions::default();
        for i in 0..15 {
            recent.push(i);
        }
        assert_eq!(recent.len(), RECENT_ACTION_CAPACITY);
        assert!(recent.iter().eq(5..15));
    }

    #[test]
    #[expect(clippy::cast_precision_loss)]
    fn test_recent_action_distribution() {
        let mut brain = BrainState::new(8, 100);
        for i in 0..4 {
            brain.record(Experience::new(vec![i as f32], 0, 0.1, vec![]));
        }
        for i in 0..6 {
            brain.record(Experience::new(vec![i as f32], 1, 0.1, vec![]));
        }
        let dist = brain.recent_actions().distribution(14);
        assert_eq!(dist.len(), 14);
        assert!((dist[0] - 0.4).abs() < 1e-6);
        assert!((dist[1] - 0.6).abs() < 1e-6);
        assert!(dist[2..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_distribution_is_zero() {
        assert_eq!(RecentActions::default().distribution(3), vec![0.0; 3]);
    }

    #[test]
    fn test_new_brain_defaults() {
        let brain = BrainState::new(32, 100);
        assert_eq!(brain.hidden(), &[0.0; 32][..]);
        assert!(brain.replay().is_empty());
        assert!(brain.recent_actions().is_empty());
        assert_eq!(brain.current_action(), 0);
        assert_eq!(brain.ticks_since_training(), 0);
        assert_eq!(brain.total_reward(), 0.0);
    }

    #[test]
    fn test_complete_action_records_experience() {
        let mut brain = BrainState::new(4, 10);
        assert!(!brain.complete_action(1.0, vec![0.0]));

        brain.begin_action(vec![0.5, 0.5], 3);
        assert!(brain.has_pending_action());
        assert!(brain.complete_action(2.0, vec![0.6, 0.4]));
        assert!(!brain.has_pending_action());

        assert_eq!(
            brain.replay().get(0),
            Some(&Experience::new(vec![0.5, 0.5], 3, 2.0, vec![0.6, 0.4]))
        );
        assert_eq!(brain.total_reward(), 2.0);
        assert!(brain.recent_actions().iter().eq([3]));
    }

    #[test]
    fn test_reset_memory() {
        let mut brain = BrainState::new(4, 10);
        brain.set_hidden(vec![1.0; 4]);
        brain.record(experience(1));
        brain.reset_memory();
        assert_eq!(brain.hidden(), &[0.0; 4][..]);
        assert!(brain.replay().is_empty());
        assert!(brain.recent_actions().is_empty());
    }
}
