//! Genesis block command.

use crate::config::ConfigArgs;
use crate::display;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use stakechain_chain::Blockchain;

#[derive(Args)]
pub struct GenesisArgs {
    #[command(flatten)]
    config: ConfigArgs,
}

pub fn run(args: GenesisArgs) -> Result<()> {
    let config = args.config.load()?;
    let chain = Blockchain::new(config.chain.clone())
        .with_context(|| "Failed to create genesis block")?;

    println!("{}", "Genesis block:".bold().cyan());
    display::print_block(chain.genesis());
    println!();
    println!(
        "  Issuer: {} (supply {})",
        config.chain.issuer.bright_yellow(),
        config.chain.initial_supply
    );
    println!();
    display::print_balances(&chain.balances());

    Ok(())
}
