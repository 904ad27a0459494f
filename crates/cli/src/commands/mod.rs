//! CLI commands module.

use anyhow::Result;
use clap::Subcommand;

mod genesis;
mod simulate;
mod tamper;

#[derive(Subcommand)]
pub enum Commands {
    /// Print the genesis block and opening balances
    Genesis(genesis::GenesisArgs),
    /// Run a multi-node proof-of-stake simulation
    Simulate(simulate::SimulateArgs),
    /// Tamper with a copy of a chain and show that validation catches it
    Tamper(tamper::TamperArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Genesis(args) => genesis::run(args),
        Commands::Simulate(args) => simulate::run(args),
        Commands::Tamper(args) => tamper::run(args),
    }
}
