//! Multi-node simulation command.

use crate::config::{ConfigArgs, SimulationConfig};
use crate::display;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use stakechain_chain::ChainSnapshot;
use stakechain_core::{Keypair, Transaction};
use stakechain_network::NodeNetwork;

#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Number of nodes in the network
    #[arg(short, long, default_value = "3")]
    nodes: usize,

    /// Number of proposal rounds
    #[arg(short, long, default_value = "5")]
    rounds: usize,

    /// Seed for validator draws, keys and transfers
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Print the final chain snapshot as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct SimulationReport {
    converged: bool,
    snapshot: ChainSnapshot,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    if args.nodes == 0 {
        bail!("A network needs at least one node");
    }

    let config = args.config.load()?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let network = NodeNetwork::with_nodes(args.nodes, &config.chain)
        .with_context(|| "Failed to build network")?;

    let accounts = config.accounts();
    let keys: Vec<(String, Keypair)> = accounts
        .iter()
        .map(|account| (account.clone(), Keypair::from_private_key(&rng.gen())))
        .collect();
    for (account, keypair) in &keys {
        network.register_public_key_everywhere(account, &keypair.public_key);
    }

    for stake in &config.stakes {
        network
            .stake_everywhere(&stake.account, stake.amount)
            .with_context(|| format!("Failed to stake {} for {}", stake.amount, stake.account))?;
    }

    if !args.json {
        println!(
            "{}",
            format!(
                "Simulating {} rounds on {} nodes (seed {})",
                args.rounds, args.nodes, args.seed
            )
            .bold()
            .cyan()
        );
        println!();
    }

    for round in 1..=args.rounds {
        let origin = rng.gen_range(0..args.nodes);
        submit_transfers(&network, origin, &keys, &config, &mut rng)?;

        let (proposal, report) = network
            .propose(origin, &mut rng)
            .with_context(|| format!("Round {} failed on node {}", round, origin))?;

        if !args.json {
            println!(
                "  {} node {} -> validator {}, block {} ({} txs, {} rejected), {} nodes updated",
                format!("Round {}:", round).bold(),
                origin,
                proposal.validator.bright_yellow(),
                format!("#{} {}", proposal.block.height(), proposal.block.hash.short()).bright_cyan(),
                proposal.block.tx_count(),
                proposal.rejected.len(),
                report.replaced.len()
            );
        }
    }

    let converged = network.is_converged();
    let snapshot = network.snapshot(0)?;

    if args.json {
        let report = SimulationReport {
            converged,
            snapshot,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    display::print_snapshot(&snapshot);
    display::print_status("Nodes converged", converged);

    Ok(())
}

/// Queue random signed transfers between configured accounts on `origin`.
fn submit_transfers(
    network: &NodeNetwork,
    origin: usize,
    keys: &[(String, Keypair)],
    config: &SimulationConfig,
    rng: &mut StdRng,
) -> Result<()> {
    if keys.len() < 2 || config.max_transfer == 0 {
        return Ok(());
    }

    for _ in 0..config.transfers_per_round {
        let from = rng.gen_range(0..keys.len());
        let to = (from + rng.gen_range(1..keys.len())) % keys.len();
        let amount = rng.gen_range(1..=config.max_transfer);

        let (sender, keypair) = &keys[from];
        let tx = Transaction::new(sender.as_str(), keys[to].0.as_str(), amount).signed(keypair);
        // Identical transfers in the same second share a digest; skip repeats.
        if let Err(e) = network.submit_to(origin, tx) {
            tracing::debug!(error = %e, "Transfer not queued");
        }
    }

    Ok(())
}
