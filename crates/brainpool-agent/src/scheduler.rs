//! Tick-driven scheduling of decisions and training over a population.
//!
//! The [`Scheduler`] owns the handle to the one shared network and drives every
//! agent's [`BrainState`] through discrete ticks. Each tick has two phases.
//!
//! # Decision Phase
//!
//! Only a rotating window of `K = decisions_per_tick` agents run a forward pass.
//! The window for tick `t` over a population of `N` agents starts at
//! `t·K mod N` and wraps around, so inference costs `O(K)` per tick regardless
//! of `N`, and every agent decides at least once every `⌈N/K⌉` ticks while the
//! population is stable. The start is recomputed from the current `N` every
//! tick; when agents join or leave, the rotation stays bounded but may skip or
//! repeat an agent once.
//!
//! For each selected agent the observation comes from a [`FeatureEncoder`], the
//! hidden state is replaced by the network's new hidden state, and an action is
//! sampled (after the encoder's optional validity mask) and stored as the
//! agent's pending decision. The caller executes it
//! and reports the outcome with [`BrainState::complete_action`].
//!
//! Forward passes of one window run under a single read lock, optionally split
//! across `inference_threads` scoped threads.
//!
//! # Learning Phase
//!
//! Every agent's counter advances by one. An agent whose counter has reached
//! `training_interval` and whose replay buffer holds at least `batch_size`
//! experiences samples a batch (uniformly, with replacement) and trains the
//! shared network under the write lock. Its counter then restarts from zero.
//! Agents train one after another, so training batches never overlap each other
//! or any forward pass.
//!
//! # Example
//!
//! ```
//! use brainpool_agent::{BrainConfig, BrainState, Scheduler};
//!
//! let config = BrainConfig {
//!     seed: Some(7),
//!     ..BrainConfig::default()
//! };
//! let mut scheduler = Scheduler::with_new_network(config).unwrap();
//! let mut brains: Vec<BrainState> = (0..25).map(|_| scheduler.new_brain()).collect();
//!
//! let encoder = |_agent: usize, _brain: &BrainState| vec![0.5; 20];
//! let summary = scheduler.step(&mut brains, &encoder);
//! assert_eq!(summary.decisions.len(), 10);
//! assert_eq!(scheduler.tick(), 1);
//! ```

use std::thread;

use brainpool_net::{ForwardOutput, Network, SharedNetwork};
use brainpool_training::policy_gradient::{TrainingOutcome, train_batch_with_report};
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use crate::{
    action::{mask_actions, select_action},
    brain::BrainState,
    config::{BrainConfig, ConfigError},
};

/// Builds the observation vector of one agent.
///
/// Implemented for every `Fn(usize, &BrainState) -> Vec<f32>`.
pub trait FeatureEncoder {
    fn encode(&self, agent: usize, brain: &BrainState) -> Vec<f32>;

    /// Which actions `agent` may take right now, or `None` if all are allowed.
    ///
    /// A mask is applied with [`mask_actions`] before sampling.
    fn action_mask(&self, agent: usize, brain: &BrainState) -> Option<Vec<bool>> {
        let _ = (agent, brain);
        None
    }
}

impl<F> FeatureEncoder for F
where
    F: Fn(usize, &BrainState) -> Vec<f32>,
{
    fn encode(&self, agent: usize, brain: &BrainState) -> Vec<f32> {
        self(agent, brain)
    }
}

/// A decision taken during [`Scheduler::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub agent: usize,
    pub action: usize,
    /// Probability the policy assigned to `action`.
    pub probability: f32,
    /// Critic estimate for the observation.
    pub value: f32,
}

/// A training batch run during [`Scheduler::learn`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingReport {
    pub agent: usize,
    pub tick: u64,
    pub outcome: TrainingOutcome,
}

/// Everything that happened during one [`Scheduler::step`].
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    pub tick: u64,
    pub decisions: Vec<Decision>,
    pub trainings: Vec<TrainingReport>,
}

#[derive(Debug)]
struct Inference {
    agent: usize,
    observation: Vec<f32>,
    output: Option<ForwardOutput>,
}

#[derive(Debug)]
pub struct Scheduler {
    config: BrainConfig,
    network: SharedNetwork,
    tick: u64,
    rng: Pcg32,
}

impl Scheduler {
    /// Creates a scheduler driving `network`.
    ///
    /// # Panics
    ///
    /// Panics if the network's sizes differ from `config.sizes`.
    pub fn new(config: BrainConfig, network: SharedNetwork) -> Result<Self, ConfigError> {
        config.validate()?;
        assert_eq!(
            network.sizes(),
            config.sizes,
            "network sizes must match the configuration"
        );
        let rng = match config.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        Ok(Self {
            config,
            network,
            tick: 0,
            rng,
        })
    }

    /// Creates a scheduler with a freshly initialized network.
    ///
    /// With a configured seed, the initial weights are reproducible too.
    pub fn with_new_network(config: BrainConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let network = match config.seed {
            Some(seed) => {
                let mut rng = Pcg32::seed_from_u64(seed ^ 1);
                Network::with_rng(config.sizes, &mut rng)
            }
            None => Network::new(config.sizes),
        };
        Self::new(config, SharedNetwork::new(network))
    }

    #[must_use]
    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    /// Handle to the shared network. Clones refer to the same network.
    #[must_use]
    pub fn network(&self) -> &SharedNetwork {
        &self.network
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Creates a brain sized for this scheduler's configuration.
    #[must_use]
    pub fn new_brain(&self) -> BrainState {
        BrainState::new(self.config.sizes.hidden, self.config.replay_capacity)
    }

    /// Agents that decide at the current tick, for a population of `population`.
    ///
    /// ```
    /// use brainpool_agent::{BrainConfig, Scheduler};
    ///
    /// let config = BrainConfig { decisions_per_tick: 3, ..BrainConfig::default() };
    /// let mut scheduler = Scheduler::with_new_network(config).unwrap();
    /// scheduler.advance();
    /// assert_eq!(scheduler.decision_window(5), vec![3, 4, 0]);
    /// assert_eq!(scheduler.decision_window(2), vec![1, 0]);
    /// assert!(scheduler.decision_window(0).is_empty());
    /// ```
    #[must_use]
    pub fn decision_window(&self, population: usize) -> Vec<usize> {
        if population == 0 {
            return vec![];
        }
        let k = self.config.decisions_per_tick;
        let n = population as u64;
        let start = (self.tick % n) * (k as u64 % n) % n;
        let Ok(start) = usize::try_from(start) else {
            return vec![];
        };
        (0..k.min(population))
            .map(|i| (start + i) % population)
            .collect()
    }

    /// Runs the decision phase for the current tick.
    pub fn decide<E>(&mut self, brains: &mut [BrainState], encoder: &E) -> Vec<Decision>
    where
        E: FeatureEncoder + ?Sized,
    {
        let window = self.decision_window(brains.len());
        if window.is_empty() {
            return vec![];
        }

        let mut jobs: Vec<Inference> = window
            .into_iter()
            .map(|agent| Inference {
                agent,
                observation: encoder.encode(agent, &brains[agent]),
                output: None,
            })
            .collect();
        self.run_inference(brains, &mut jobs);

        let mut decisions = Vec::with_capacity(jobs.len());
        for job in jobs {
            let Some(ForwardOutput {
                action_probs,
                value,
                new_hidden,
            }) = job.output
            else {
                continue;
            };
            let probs = match encoder.action_mask(job.agent, &brains[job.agent]) {
                Some(valid) => mask_actions(&action_probs, &valid),
                None => action_probs,
            };
            let action = select_action(&probs, self.config.temperature, &mut self.rng);
            let brain = &mut brains[job.agent];
            brain.set_hidden(new_hidden);
            brain.begin_action(job.observation, action);
            decisions.push(Decision {
                agent: job.agent,
                action,
                probability: probs[action],
                value,
            });
        }
        tracing::trace!(tick = self.tick, decisions = decisions.len(), "decision window");
        decisions
    }

    fn run_inference(&self, brains: &[BrainState], jobs: &mut [Inference]) {
        let guard = self.network.read();
        let network: &Network = &guard;
        let infer = |job: &mut Inference| {
            job.output = Some(network.forward(&job.observation, brains[job.agent].hidden()));
        };

        let threads = self.config.inference_threads.min(jobs.len());
        if threads <= 1 {
            jobs.iter_mut().for_each(infer);
            return;
        }
        let chunk_size = jobs.len().div_ceil(threads);
        thread::scope(|s| {
            for chunk in jobs.chunks_mut(chunk_size) {
                s.spawn(move || chunk.iter_mut().for_each(infer));
            }
        });
    }

    /// Runs the learning phase for the current tick.
    pub fn learn(&mut self, brains: &mut [BrainState]) -> Vec<TrainingReport> {
        let mut reports = vec![];
        for (agent, brain) in brains.iter_mut().enumerate() {
            let ticks = brain.count_tick();
            if ticks < self.config.training_interval
                || brain.replay().len() < self.config.batch_size
            {
                continue;
            }
            let batch = brain.replay().sample(self.config.batch_size, &mut self.rng);
            let outcome = {
                let mut network = self.network.write();
                train_batch_with_report(&mut network, &batch, &self.config.trainer)
            };
            brain.reset_training_counter();
            tracing::debug!(agent, tick = self.tick, loss = outcome.loss, "agent trained");
            reports.push(TrainingReport {
                agent,
                tick: self.tick,
                outcome,
            });
        }
        reports
    }

    /// Moves to the next tick.
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Runs the decision phase, then the learning phase, then advances the tick.
    pub fn step<E>(&mut self, brains: &mut [BrainState], encoder: &E) -> TickSummary
    where
        E: FeatureEncoder + ?Sized,
    {
        let tick = self.tick;
        let decisions = self.decide(brains, encoder);
        let trainings = self.learn(brains);
        self.advance();
        TickSummary {
            tick,
            decisions,
            trainings,
        }
    }

    /// Swaps in a new generation's network and resets every agent's hidden state.
    ///
    /// Returns the previous network. Replay buffers are kept.
    ///
    /// # Panics
    ///
    /// Panics if the replacement has different sizes.
    pub fn replace_network(&mut self, network: Network, brains: &mut [BrainState]) -> Network {
        let previous = self.network.replace(network);
        for brain in brains {
            brain.reset_hidden();
        }
        tracing::info!(tick = self.tick, "replaced shared network");
        previous
    }
}

#[cfg(test)]
mod tests {
    use brainpool_training::experience::Experience;

    use super::*;

    fn config() -> BrainConfig {
        BrainConfig {
            sizes: brainpool_net::NetworkSizes::new(4, 6, 3),
            replay_capacity: 8,
            batch_size: 2,
            training_interval: 3,
            decisions_per_tick: 2,
            seed: Some(3),
            ..BrainConfig::default()
        }
    }

    fn encoder(agent: usize, _brain: &BrainState) -> Vec<f32> {
        #[expect(clippy::cast_precision_loss)]
        let x = agent as f32 * 0.1;
        vec![x, 1.0 - x, 0.5, -0.5]
    }

    #[test]
    fn test_window_rotates_and_wraps() {
        let mut scheduler = Scheduler::with_new_network(config()).unwrap();
        let mut windows = vec![];
        for _ in 0..4 {
            windows.push(scheduler.decision_window(5));
            scheduler.advance();
        }
        assert_eq!(windows, vec![vec![0, 1], vec![2, 3], vec![4, 0], vec![1, 2]]);
    }

    #[test]
    fn test_empty_population_is_noop() {
        let mut scheduler = Scheduler::with_new_network(config()).unwrap();
        let summary = scheduler.step(&mut [], &encoder);
        assert!(summary.decisions.is_empty());
        assert!(summary.trainings.is_empty());
    }

    #[test]
    fn test_decide_updates_hidden_and_pending_action() {
        let mut scheduler = Scheduler::with_new_network(config()).unwrap();
        let mut brains: Vec<_> = (0..3).map(|_| scheduler.new_brain()).collect();
        let decisions = scheduler.decide(&mut brains, &encoder);
        assert_eq!(decisions.len(), 2);
        for d in &decisions {
            assert!(d.action < 3);
            assert!((0.0..=1.0).contains(&d.probability));
            let brain = &brains[d.agent];
            assert!(brain.has_pending_action());
            assert_eq!(brain.current_action(), d.action);
            assert!(brain.hidden().iter().any(|h| *h != 0.0));
        }
        assert!(!brains[2].has_pending_action());
        assert!(brains[2].hidden().iter().all(|h| *h == 0.0));
    }

    #[test]
    fn test_threaded_inference_matches_sequential() {
        let run = |threads| {
            let config = BrainConfig {
                decisions_per_tick: 6,
                inference_threads: threads,
                ..config()
            };
            let mut scheduler = Scheduler::with_new_network(config).unwrap();
            let mut brains: Vec<_> = (0..6).map(|_| scheduler.new_brain()).collect();
            let decisions = scheduler.decide(&mut brains, &encoder);
            let hidden: Vec<Vec<f32>> = brains.iter().map(|b| b.hidden().to_vec()).collect();
            (decisions, hidden)
        };
        assert_eq!(run(1), run(4));
    }

    struct OnlyAction(usize);

    impl FeatureEncoder for OnlyAction {
        fn encode(&self, agent: usize, brain: &BrainState) -> Vec<f32> {
            encoder(agent, brain)
        }

        fn action_mask(&self, _agent: usize, _brain: &BrainState) -> Option<Vec<bool>> {
            Some((0..3).map(|a| a == self.0).collect())
        }
    }

    #[test]
    fn test_action_mask_restricts_sampling() {
        let mut scheduler = Scheduler::with_new_network(config()).unwrap();
        let mut brains: Vec<_> = (0..4).map(|_| scheduler.new_brain()).collect();
        for _ in 0..5 {
            let summary = scheduler.step(&mut brains, &OnlyAction(2));
            assert!(summary.decisions.iter().all(|d| d.action == 2));
            assert!(summary.decisions.iter().all(|d| d.probability == 1.0));
        }
    }

    #[test]
    fn test_training_fires_at_interval_with_enough_experience() {
        let mut scheduler = Scheduler::with_new_network(config()).unwrap();
        let mut brains = vec![scheduler.new_brain(), scheduler.new_brain()];
        for _ in 0..2 {
            brains[0].record(Experience::new(vec![0.1; 4], 1, 1.0, vec![0.2; 4]));
        }

        assert!(scheduler.learn(&mut brains).is_empty());
        assert!(scheduler.learn(&mut brains).is_empty());
        let reports = scheduler.learn(&mut brains);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].agent, 0);
        assert_eq!(reports[0].outcome.batch_size, 2);
        assert_eq!(brains[0].ticks_since_training(), 0);
        // not enough experience: the counter keeps growing
        assert_eq!(brains[1].ticks_since_training(), 3);
    }

    #[test]
    fn test_replace_network_resets_hidden_state() {
        let mut scheduler = Scheduler::with_new_network(config()).unwrap();
        let mut brains: Vec<_> = (0..2).map(|_| scheduler.new_brain()).collect();
        scheduler.decide(&mut brains, &encoder);
        let next = Network::zeroed(scheduler.config().sizes);
        let previous = scheduler.replace_network(next.clone(), &mut brains);
        assert_ne!(previous, next);
        assert_eq!(scheduler.network().snapshot(), next);
        assert!(brains.iter().all(|b| b.hidden().iter().all(|h| *h == 0.0)));
        assert!(brains.iter().all(|b| !b.has_pending_action()));
    }

    #[test]
    #[should_panic(expected = "must match the configuration")]
    fn test_mismatched_network_panics() {
        let network = Network::new(brainpool_net::NetworkSizes::new(2, 2, 2));
        let _ = Scheduler::new(config(), SharedNetwork::new(network));
    }
}
