use clap::{Parser, Subcommand};

use self::{evolve::EvolveArg, inspect::InspectArg, simulate::SimulateArg};

mod evolve;
mod inspect;
mod simulate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train a shared network by running agents in the sandbox world
    Simulate(#[clap(flatten)] SimulateArg),
    /// Cross over checkpoints into a new generation
    Evolve(#[clap(flatten)] EvolveArg),
    /// Print a summary of a checkpoint
    Inspect(#[clap(flatten)] InspectArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Simulate(arg) => simulate::run(&arg)?,
        Mode::Evolve(arg) => evolve::run(&arg)?,
        Mode::Inspect(arg) => inspect::run(&arg)?,
    }
    Ok(())
}
