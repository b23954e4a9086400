//! Recurrent actor-critic network shared by a population of agents.
//!
//! This crate owns the neural architecture and everything that depends on its
//! parameter layout:
//!
//! - [`gaussian`] - Box–Muller standard-normal sampling
//! - [`layout`] - architecture sizes and the canonical flat parameter order
//! - [`activation`] - overflow-safe sigmoid/tanh, ReLU, stable softmax
//! - [`network`] - the GRU policy-value network and its forward pass
//! - [`weights`] - operations on flat parameter vectors (init, averaging, updates)
//! - [`shared`] - a lock-guarded handle for sharing one network between agents
//!
//! # Architecture
//!
//! ```text
//! observation (I) ─┐
//!                  ├─► GRU cell ─► hidden' (H) ─► dense+ReLU ─► dense+ReLU ─┬─► actor  ─► softmax (O)
//! hidden (H) ──────┘                                                        └─► critic ─► value
//! ```
//!
//! # Example
//!
//! ```
//! use brainpool_net::{layout::NetworkSizes, network::Network};
//!
//! let network = Network::new(NetworkSizes::new(20, 32, 14));
//! let hidden = network.zero_hidden();
//! let out = network.forward(&[0.5; 20], &hidden);
//! assert_eq!(out.action_probs.len(), 14);
//!
//! // carry the hidden state into the next step
//! let next = network.forward(&[0.5; 20], &out.new_hidden);
//! assert_ne!(next.new_hidden, out.new_hidden);
//! ```
//!
//! # Numeric Behavior
//!
//! The network is a closed numeric system: activation arguments are clamped and
//! probabilities are floored before logarithms, so finite inputs always produce
//! finite outputs. Structural misuse (zero sizes, parameter vectors of the wrong
//! length, hidden states of the wrong length) panics.
//!
//! # Current Limitations
//!
//! - **CPU only**: parameters are stored as `f32` and evaluated in plain `f64`
//!   loops
//! - **No analytic gradients**: training estimates gradients by perturbation
//!   (see `brainpool-training`)

pub mod activation;
pub mod gaussian;
pub mod layout;
pub mod network;
pub mod shared;
pub mod weights;

pub use self::{
    layout::NetworkSizes,
    network::{Evaluation, ForwardOutput, Network},
    shared::SharedNetwork,
};
