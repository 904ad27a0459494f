//! Terminal rendering of chain state.

use colored::Colorize;
use stakechain_chain::ChainSnapshot;
use stakechain_consensus::StakeEntry;
use stakechain_core::Block;
use std::collections::BTreeMap;

pub fn print_block(block: &Block) {
    println!(
        "  {} {}",
        format!("#{}", block.height()).bright_cyan().bold(),
        format!("produced by {}", block.header.producer).bright_black()
    );
    println!("    Hash:        {}", block.hash.to_hex().bright_yellow());
    println!("    Previous:    {}", block.prev_hash().to_hex().bright_black());
    println!("    Merkle root: {}", block.header.merkle_root.to_hex().bright_black());
    println!("    Timestamp:   {}", block.header.timestamp);
    println!("    Transactions:");
    for tx in &block.transactions {
        println!(
            "      {} -> {}: {} {}",
            tx.sender,
            tx.receiver,
            tx.amount.to_string().bright_green(),
            format!("({})", tx.hash.short()).bright_black()
        );
    }
}

pub fn print_balances(balances: &BTreeMap<String, i64>) {
    println!("{}", "Balances:".bold().cyan());
    for (account, balance) in balances {
        println!("  {:<12} {}", account, balance.to_string().bright_green());
    }
}

pub fn print_stakes(stakes: &[StakeEntry]) {
    println!("{}", "Stakes:".bold().cyan());
    if stakes.is_empty() {
        println!("  {}", "(none)".bright_black());
    }
    for entry in stakes {
        println!("  {:<12} {}", entry.account, entry.amount.to_string().bright_magenta());
    }
}

pub fn print_snapshot(snapshot: &ChainSnapshot) {
    println!("{}", "Chain:".bold().cyan());
    for block in &snapshot.blocks {
        print_block(block);
    }
    println!();
    print_balances(&snapshot.balances);
    println!();
    print_stakes(&snapshot.stakes);
    println!();
    print_status("Chain valid", snapshot.valid);
}

pub fn print_status(label: &str, ok: bool) {
    let mark = if ok { "✓".green().bold() } else { "✗".red().bold() };
    let value = if ok { "yes".green() } else { "no".red() };
    println!("{}  {}: {}", mark, label, value);
}
