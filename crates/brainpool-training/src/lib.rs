//! Learning for the shared agent network.
//!
//! Two independent mechanisms change a network's parameters:
//!
//! 1. **Online training** ([`policy_gradient`]) - many small advantage actor-critic
//!    updates applied to the one network the whole population shares, driven by
//!    each agent's own [`experience`] buffer.
//! 2. **Evolution** ([`evolution`]) - out-of-band crossover and mutation that
//!    produce whole new networks, used when a new generation is bootstrapped.
//!
//! # Architecture
//!
//! ```text
//! agent experiences ─► policy_gradient::train_batch ─► shared Network (in place)
//!
//! parent networks ───► evolution::crossover_networks ─► new Network
//!                      evolution::mutate ──────────────► Network (in place)
//! ```
//!
//! # Example
//!
//! ```
//! use brainpool_net::{Network, NetworkSizes};
//! use brainpool_training::{
//!     experience::Experience,
//!     policy_gradient::{self, TrainerParams},
//! };
//!
//! let mut network = Network::new(NetworkSizes::new(4, 8, 3));
//! let batch = vec![Experience::new(vec![0.1; 4], 1, 1.0, vec![0.2; 4])];
//! let loss = policy_gradient::train_batch(&mut network, &batch, &TrainerParams::default());
//! assert!(loss.is_finite());
//! ```
//!
//! # Design Principles
//!
//! ## Separation from Inference
//!
//! Training and evolution only need a `&mut Network` or `&Network`; they know
//! nothing about agents, ticks, or scheduling. The scheduler in `brainpool-agent`
//! decides when to train and holds the shared network's write lock while it does.
//!
//! # Current Limitations
//!
//! - **Biased gradient**: stride-sampled one-sided finite differences (see
//!   [`policy_gradient`]); many weights receive no update from a given batch
//! - **No recurrent credit assignment**: training evaluations start from a zero
//!   hidden state
//! - **Cost**: each experience costs roughly `2 + probe_budget` forward passes
//! - **No fitness-driven selection**: [`evolution::breed_population`] picks parents
//!   uniformly; selection by fitness is left to the caller

pub mod evolution;
pub mod experience;
pub mod policy_gradient;
