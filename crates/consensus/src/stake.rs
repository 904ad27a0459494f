//! Stake table: funds locked by accounts for validator eligibility.
//!
//! Entries keep first-stake (insertion) order. Selection walks the table in
//! that order, so a seeded draw always picks the same validator on every node
//! that applied the same stakes in the same order.

use crate::pos::{ConsensusError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub account: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StakeTable {
    entries: Vec<StakeEntry>,
    index: HashMap<String, usize>,
    /// Sum of all entries. Deposits that would overflow it are refused, so
    /// every running sum over the entries fits in a `u64`.
    total: u64,
}

impl StakeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stake `account` would hold after depositing `amount`.
    ///
    /// Fails if either that stake or the table total would overflow.
    pub fn check_deposit(&self, account: &str, amount: u64) -> Result<u64> {
        let overflow = || ConsensusError::StakeOverflow {
            account: account.to_string(),
            amount,
        };
        self.total.checked_add(amount).ok_or_else(overflow)?;
        self.stake_of(account).checked_add(amount).ok_or_else(overflow)
    }

    /// Lock `amount` more for `account`, returning its new stake.
    ///
    /// The caller is responsible for debiting the ledger. On error the
    /// table is unchanged.
    pub fn deposit(&mut self, account: &str, amount: u64) -> Result<u64> {
        let staked = self.check_deposit(account, amount)?;
        match self.index.get(account) {
            Some(&i) => self.entries[i].amount = staked,
            None => {
                self.index.insert(account.to_string(), self.entries.len());
                self.entries.push(StakeEntry {
                    account: account.to_string(),
                    amount: staked,
                });
            }
        }
        self.total += amount;
        Ok(staked)
    }

    /// Current stake of `account` (zero if it never staked).
    pub fn stake_of(&self, account: &str) -> u64 {
        self.index
            .get(account)
            .map(|&i| self.entries[i].amount)
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Entries in selection order.
    pub fn iter(&self) -> impl Iterator<Item = &StakeEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[StakeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
