//! Pool of submitted transactions waiting for the next block.
//!
//! Transactions leave the pool in submission order. There are no fees, so
//! there is nothing to prioritise on.

use serde::{Deserialize, Serialize};
use stakechain_core::{Hash, Transaction};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction already in mempool")]
    DuplicateTransaction,

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),

    #[error("sender {sender} already has {limit} pending transactions")]
    SenderLimit { sender: String, limit: usize },

    #[error("transaction not found in mempool")]
    TransactionNotFound,
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Configuration for the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum number of transactions in the mempool.
    pub max_transactions: usize,
    /// Maximum pending transactions per sender.
    pub max_per_account: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
            max_per_account: 100,
        }
    }
}

pub struct Mempool {
    config: MempoolConfig,
    transactions: HashMap<Hash, Transaction>,
    /// Submission order.
    queue: VecDeque<Hash>,
    per_sender: HashMap<String, usize>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: HashMap::new(),
            queue: VecDeque::new(),
            per_sender: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.transactions.contains_key(tx_hash)
    }

    pub fn get(&self, tx_hash: &Hash) -> Option<&Transaction> {
        self.transactions.get(tx_hash)
    }

    /// Add a transaction to the back of the queue.
    pub fn add(&mut self, tx: Transaction) -> Result<()> {
        if self.contains(&tx.hash) {
            return Err(MempoolError::DuplicateTransaction);
        }

        if self.transactions.len() >= self.config.max_transactions {
            return Err(MempoolError::MempoolFull(self.config.max_transactions));
        }

        let pending = self.per_sender.get(&tx.sender).copied().unwrap_or(0);
        if pending >= self.config.max_per_account {
            return Err(MempoolError::SenderLimit {
                sender: tx.sender.clone(),
                limit: self.config.max_per_account,
            });
        }

        *self.per_sender.entry(tx.sender.clone()).or_default() += 1;
        self.queue.push_back(tx.hash);
        self.transactions.insert(tx.hash, tx);
        Ok(())
    }

    pub fn remove(&mut self, tx_hash: &Hash) -> Result<Transaction> {
        let tx = self
            .transactions
            .remove(tx_hash)
            .ok_or(MempoolError::TransactionNotFound)?;

        self.queue.retain(|h| h != tx_hash);
        if let Some(count) = self.per_sender.get_mut(&tx.sender) {
            *count -= 1;
            if *count == 0 {
                self.per_sender.remove(&tx.sender);
            }
        }

        Ok(tx)
    }

    /// Remove every listed transaction that is still pending.
    pub fn remove_batch<'a>(&mut self, tx_hashes: impl IntoIterator<Item = &'a Hash>) {
        for hash in tx_hashes {
            let _ = self.remove(hash);
        }
    }

    /// Up to `limit` transactions in submission order.
    pub fn get_pending(&self, limit: usize) -> Vec<Transaction> {
        self.queue
            .iter()
            .take(limit)
            .filter_map(|h| self.transactions.get(h).cloned())
            .collect()
    }

    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            total_transactions: self.len(),
            unique_senders: self.per_sender.len(),
            capacity: self.config.max_transactions,
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

/// Mempool statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolStats {
    pub total_transactions: usize,
    pub unique_senders: usize,
    pub capacity: usize,
}
