//! Chain configuration.

use crate::mempool::MempoolConfig;
use serde::{Deserialize, Serialize};

/// Opening balance handed out by the genesis block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub account: String,
    pub amount: u64,
}

impl Allocation {
    pub fn new(account: impl Into<String>, amount: u64) -> Self {
        Self {
            account: account.into(),
            amount,
        }
    }
}

/// Blockchain configuration.
///
/// Every replica in a network must use the same genesis settings
/// (`issuer`, `initial_supply`, `allocations`, `genesis_timestamp`), or their
/// genesis digests differ and they will never accept each other's chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Reserved issuing account. Never debited during replay.
    pub issuer: String,
    /// Amount credited to the issuer before genesis is applied.
    pub initial_supply: u64,
    /// Opening transactions from the issuer, in genesis order.
    pub allocations: Vec<Allocation>,
    /// Timestamp of the genesis block and its transactions.
    pub genesis_timestamp: u64,
    /// Paid by the issuer to the selected validator in every block.
    pub block_reward: u64,
    /// Exclude transactions whose sender has no registered key or whose
    /// signature does not verify.
    pub require_signatures: bool,
    pub mempool: MempoolConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            issuer: "System".to_string(),
            initial_supply: 1000,
            allocations: vec![Allocation::new("Alice", 100), Allocation::new("Bob", 100)],
            genesis_timestamp: 0,
            block_reward: 10,
            require_signatures: true,
            mempool: MempoolConfig::default(),
        }
    }
}
