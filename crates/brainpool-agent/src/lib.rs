//! Per-agent learning state and the scheduler that drives a population.
//!
//! A population of agents shares one [`SharedNetwork`](brainpool_net::SharedNetwork).
//! Each agent owns a [`BrainState`]; the [`Scheduler`] decides which agents
//! run inference on a given tick and when each agent trains the shared network
//! from its own replay buffer.
//!
//! - [`brain`] - hidden state, replay buffer, recent-action history
//! - [`action`] - sampling, masking, and diversity helpers for action indices
//! - [`scheduler`] - the rotating decision window and the training cadence
//! - [`config`] - [`BrainConfig`] and its validation
//!
//! # Lifecycle of a Decision
//!
//! 1. The scheduler selects the agent and encodes its observation
//! 2. `forward(observation, hidden)` updates the hidden state and yields action probabilities
//! 3. An action is sampled and stored as pending on the brain
//! 4. The caller executes it and calls [`BrainState::complete_action`] with the
//!    reward and the next observation, which records an experience
//! 5. Once the agent's training counter fires, experiences are sampled into a batch

pub mod action;
pub mod brain;
pub mod config;
pub mod scheduler;

pub use self::{
    brain::BrainState,
    config::{BrainConfig, ConfigError},
    scheduler::{Decision, FeatureEncoder, Scheduler, TickSummary, TrainingReport},
};
