use std::path::PathBuf;

use anyhow::ensure;
use brainpool_agent::{BrainState, Scheduler, action::diversity_penalty};
use brainpool_net::SharedNetwork;
use brainpool_stats::descriptive::RunningStats;
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use self::world::World;
use crate::{
    model::checkpoint::Checkpoint,
    util::{self, Output},
};

mod world;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Engine configuration (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Continue training from a checkpoint instead of a fresh network
    #[arg(long)]
    resume: Option<PathBuf>,
    /// Number of ticks to run
    #[arg(long, default_value_t = 2000)]
    ticks: u64,
    /// Number of agents sharing the network
    #[arg(long, default_value_t = 40)]
    agents: usize,
    /// Standard deviation of the Gaussian noise added to every reward
    #[arg(long, default_value_t = 0.05)]
    reward_noise: f32,
    /// Print progress every this many ticks
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u64).range(1..))]
    report_every: u64,
    /// Seed for the engine and the world; overrides the configured seed
    #[arg(long)]
    seed: Option<u64>,
    /// Checkpoint output path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Progress {
    rewards: RunningStats,
    losses: RunningStats,
    decisions: usize,
    starvations: usize,
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let mut config = util::read_config_file(arg.config.as_deref())?;
    if arg.seed.is_some() {
        config.seed = arg.seed;
    }
    let mut rng = match config.seed {
        Some(seed) => Pcg32::seed_from_u64(seed.wrapping_add(1)),
        None => Pcg32::from_rng(&mut rand::rng()),
    };

    let (mut scheduler, generation) = match &arg.resume {
        Some(path) => {
            let checkpoint = util::read_checkpoint_file(path)?;
            config.sizes = checkpoint.sizes;
            let network = SharedNetwork::new(checkpoint.to_network()?);
            (Scheduler::new(config, network)?, checkpoint.generation)
        }
        None => (Scheduler::with_new_network(config)?, 0),
    };
    let action_count = scheduler.config().sizes.output;
    ensure!(
        action_count >= world::Action::COUNT,
        "the sandbox needs at least {} actions, the network has {action_count}",
        world::Action::COUNT
    );

    let mut world = World::new(arg.agents, arg.reward_noise, &mut rng)?;
    let mut brains: Vec<BrainState> = (0..world.population())
        .map(|_| scheduler.new_brain())
        .collect();

    eprintln!(
        "Simulating {} agents for {} ticks ({} parameters)",
        arg.agents,
        arg.ticks,
        scheduler.config().sizes.parameter_count()
    );

    let mut progress = Progress::default();
    let mut total_trainings = 0;
    for tick in 0..arg.ticks {
        let summary = scheduler.step(&mut brains, &world.view(action_count));
        let mut decided = vec![false; brains.len()];
        for d in &summary.decisions {
            decided[d.agent] = true;
        }

        for (agent, brain) in brains.iter_mut().enumerate() {
            let action = brain.current_action();
            let outcome = world.apply(agent, action, &mut rng);
            let habit = brain.recent_actions().distribution(action_count);
            let reward = outcome.reward - diversity_penalty(&habit, action);
            progress.rewards.push(reward);
            if decided[agent] {
                let next_observation = world.observe(agent, brain);
                brain.complete_action(reward, next_observation);
            }
            if outcome.starved {
                brain.reset_hidden();
                progress.starvations += 1;
            }
        }
        world.regrow(&mut rng);

        progress.decisions += summary.decisions.len();
        progress
            .losses
            .extend(summary.trainings.iter().map(|t| t.outcome.loss));
        total_trainings += summary.trainings.len();

        if (tick + 1) % arg.report_every == 0 {
            report(tick + 1, &progress, world.total_food());
            progress = Progress::default();
        }
    }

    let network = scheduler.network().snapshot();
    let checkpoint = Checkpoint::from_network(&network, generation);
    Output::save_json(&checkpoint, arg.output.clone())?;

    eprintln!();
    eprintln!("Simulation completed");
    if let Some(path) = &arg.output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Created at: {}", checkpoint.created_at);
    eprintln!("  Generation: {}", checkpoint.generation);
    eprintln!("  Training batches: {total_trainings}");
    eprintln!(
        "  Mean total reward per agent: {:.3}",
        mean(brains.iter().map(BrainState::total_reward))
    );

    Ok(())
}

fn report(tick: u64, progress: &Progress, food: f32) {
    let fmt = |v: Option<f32>| v.map_or_else(|| "-".to_owned(), |v| format!("{v:.4}"));
    eprintln!("Tick #{tick}:");
    eprintln!("  Decisions:   {}", progress.decisions);
    eprintln!("  Starvations: {}", progress.starvations);
    eprintln!("  Food left:   {food:.2}");
    eprintln!(
        "  Reward:      mean {} / std {}",
        fmt(progress.rewards.mean()),
        fmt(progress.rewards.std_dev())
    );
    eprintln!(
        "  Loss:        mean {} / min {} / max {} ({} batches)",
        fmt(progress.losses.mean()),
        fmt(progress.losses.min()),
        fmt(progress.losses.max()),
        progress.losses.count()
    );
}

fn mean<I>(values: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let mut stats = RunningStats::default();
    stats.extend(values);
    stats.mean().unwrap_or(0.0)
}
