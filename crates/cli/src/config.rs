//! Simulation settings, loaded from JSON.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use stakechain_chain::{Allocation, ChainConfig};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub chain: ChainConfig,
    /// Stakes locked on every node before the first round, in this order.
    pub stakes: Vec<Allocation>,
    /// Random transfers submitted before each proposal.
    pub transfers_per_round: usize,
    /// Upper bound for a random transfer amount.
    pub max_transfer: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            stakes: vec![Allocation::new("Alice", 60), Allocation::new("Bob", 40)],
            transfers_per_round: 2,
            max_transfer: 15,
        }
    }
}

impl SimulationConfig {
    /// Accounts that receive an opening allocation, in genesis order.
    pub fn accounts(&self) -> Vec<String> {
        let mut accounts: Vec<String> = Vec::new();
        for allocation in &self.chain.allocations {
            if !accounts.contains(&allocation.account) {
                accounts.push(allocation.account.clone());
            }
        }
        accounts
    }
}

#[derive(Args)]
pub struct ConfigArgs {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<SimulationConfig> {
        let Some(path) = &self.config else {
            return Ok(SimulationConfig::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
