use std::path::PathBuf;

use anyhow::{Context as _, ensure};
use brainpool_net::Network;
use brainpool_training::evolution;
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use crate::{
    model::checkpoint::Checkpoint,
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvolveArg {
    /// Parent checkpoint; give at least two
    #[arg(long = "parent", required = true)]
    parents: Vec<PathBuf>,
    /// Per-parameter mutation probability
    #[arg(long, default_value_t = 0.05)]
    mutation_rate: f32,
    /// Seed for crossover noise and mutation
    #[arg(long)]
    seed: Option<u64>,
    /// Child checkpoint output path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &EvolveArg) -> anyhow::Result<()> {
    let EvolveArg {
        parents,
        mutation_rate,
        seed,
        output,
    } = arg;
    ensure!(parents.len() >= 2, "at least two parents are required");
    ensure!(
        (0.0..=1.0).contains(mutation_rate),
        "mutation rate must lie in [0, 1], got {mutation_rate}"
    );

    let checkpoints = parents
        .iter()
        .map(util::read_checkpoint_file)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let sizes = checkpoints[0].sizes;
    for (path, checkpoint) in parents.iter().zip(&checkpoints) {
        ensure!(
            checkpoint.sizes == sizes,
            "{} has sizes {:?}, expected {sizes:?}",
            path.display(),
            checkpoint.sizes
        );
    }
    let networks = checkpoints
        .iter()
        .map(Checkpoint::to_network)
        .collect::<anyhow::Result<Vec<Network>>>()?;

    let mut rng = match seed {
        Some(seed) => Pcg32::seed_from_u64(*seed),
        None => Pcg32::from_rng(&mut rand::rng()),
    };
    let child = if let [p1, p2] = networks.as_slice() {
        evolution::crossover_networks(p1, p2, *mutation_rate, &mut rng)
    } else {
        evolution::breed_population(&networks, 1, *mutation_rate, &mut rng)
            .pop()
            .context("no child was bred")?
    };

    let generation = checkpoints
        .iter()
        .map(|c| c.generation)
        .max()
        .unwrap_or(0)
        .saturating_add(1);
    let checkpoint = Checkpoint::from_network(&child, generation);
    Output::save_json(&checkpoint, output.clone())?;

    eprintln!("Bred generation {generation} from {} parents", parents.len());
    if let Some(path) = output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Mutation rate: {mutation_rate}");
    eprintln!("  Parameters: {}", checkpoint.weights.len());

    Ok(())
}
