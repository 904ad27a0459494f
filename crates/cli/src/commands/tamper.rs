//! Tamper-detection demonstration.

use crate::config::ConfigArgs;
use crate::display;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use stakechain_chain::Blockchain;
use stakechain_consensus::ChainValidator;
use stakechain_core::{Block, Hash, Keypair, Transaction};

#[derive(Args)]
pub struct TamperArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Number of blocks to build before tampering
    #[arg(short, long, default_value = "3")]
    blocks: usize,
}

pub fn run(args: TamperArgs) -> Result<()> {
    if args.blocks == 0 {
        bail!("Build at least one block to tamper with");
    }

    let config = args.config.load()?;
    let accounts = config.accounts();
    let (Some(sender), Some(receiver)) = (accounts.first(), accounts.get(1)) else {
        bail!("Tampering needs at least two funded accounts");
    };

    let mut chain = Blockchain::new(config.chain.clone())
        .with_context(|| "Failed to create genesis block")?;
    let keypair = Keypair::generate();
    chain.register_public_key(sender.as_str(), keypair.public_key.clone());
    chain
        .stake(sender, 1)
        .with_context(|| format!("Failed to stake for {}", sender))?;

    let mut rng = StdRng::seed_from_u64(0);
    for i in 0..args.blocks as u64 {
        chain.submit_transaction(
            Transaction::new(sender.as_str(), receiver.as_str(), i + 1).signed(&keypair),
        )?;
        chain.propose_block(&mut rng)?;
    }

    chain
        .validate()
        .with_context(|| "Freshly built chain failed validation")?;

    println!("{}", "Untouched chain:".bold().cyan());
    for block in chain.blocks() {
        display::print_block(block);
    }
    println!();
    report("Untouched copy", chain.blocks());

    let mut edited = chain.blocks().to_vec();
    let tx = edited[1]
        .transactions
        .last_mut()
        .context("Block 1 has no transactions")?;
    tx.amount += 100;
    println!(
        "{}",
        format!("Raised block 1 transfer {} -> {} to {}", tx.sender, tx.receiver, tx.amount).yellow()
    );
    report("Edited amount", &edited);

    let mut relinked = chain.blocks().to_vec();
    let last = relinked.len() - 1;
    relinked[last].header.prev_hash = Hash::ZERO;
    println!(
        "{}",
        format!("Pointed block {} at the zero digest", last).yellow()
    );
    report("Broken link", &relinked);

    let mut rehashed = chain.blocks().to_vec();
    rehashed[1].transactions[0].amount += 100;
    rehashed[1].transactions[0].hash = rehashed[1].transactions[0].compute_hash();
    rehashed[1].header.merkle_root = rehashed[1].compute_merkle_root()?;
    rehashed[1].hash = rehashed[1].compute_hash()?;
    println!(
        "{}",
        "Raised block 1 reward and recomputed its digests".yellow()
    );
    report("Rehashed block", &rehashed);

    Ok(())
}

fn report(label: &str, blocks: &[Block]) {
    match ChainValidator::validate(blocks) {
        Ok(()) => display::print_status(label, true),
        Err(err) => {
            display::print_status(label, false);
            println!("   {}", err.to_string().red());
        }
    }
}
