//! Account balances derived by replaying transactions.
//!
//! The ledger is never authoritative: it can always be rebuilt from the chain.
//! After any successful operation no account except the issuer is negative.

use crate::config::Allocation;
use stakechain_core::{Block, Transaction};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient funds: {account} has {balance}, needs {amount}")]
    InsufficientFunds {
        account: String,
        balance: i64,
        amount: u64,
    },

    #[error("amount {0} does not fit in a balance")]
    AmountOverflow(u64),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

fn to_signed(amount: u64) -> Result<i64> {
    i64::try_from(amount).map_err(|_| LedgerError::AmountOverflow(amount))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    issuer: String,
    initial_supply: u64,
    balances: HashMap<String, i64>,
}

impl Ledger {
    /// An empty ledger. Call [`Ledger::apply_genesis`] or [`Ledger::rebuild`]
    /// before use.
    pub fn new(issuer: impl Into<String>, initial_supply: u64) -> Self {
        Self {
            issuer: issuer.into(),
            initial_supply,
            balances: HashMap::new(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn is_issuer(&self, account: &str) -> bool {
        account == self.issuer
    }

    /// Clear every balance and credit the issuer its initial supply.
    fn reset(&mut self) -> Result<()> {
        self.balances.clear();
        let supply = to_signed(self.initial_supply)?;
        self.balances.insert(self.issuer.clone(), supply);
        Ok(())
    }

    /// Reset, then pay each allocation from the issuer.
    ///
    /// Returns the opening transactions, to be recorded as the genesis
    /// block's transaction set.
    pub fn apply_genesis(
        &mut self,
        allocations: &[Allocation],
        timestamp: u64,
    ) -> Result<Vec<Transaction>> {
        self.reset()?;
        let txs: Vec<Transaction> = allocations
            .iter()
            .map(|a| Transaction::create(self.issuer.clone(), a.account.clone(), a.amount, timestamp))
            .collect();
        self.apply_block(&txs)?;
        Ok(txs)
    }

    /// Apply a block's transactions in order.
    ///
    /// Each transaction credits the receiver and, unless the sender is the
    /// issuer, debits the sender. A later transaction may spend funds
    /// credited earlier in the same list. On error nothing is applied.
    pub fn apply_block(&mut self, transactions: &[Transaction]) -> Result<()> {
        let mut staged: HashMap<&str, i64> = HashMap::new();

        for tx in transactions {
            let amount = to_signed(tx.amount)?;

            let receiver = self.staged_balance(&staged, &tx.receiver);
            let credited = receiver
                .checked_add(amount)
                .ok_or(LedgerError::AmountOverflow(tx.amount))?;
            staged.insert(&tx.receiver, credited);

            if self.is_issuer(&tx.sender) {
                continue;
            }

            let sender = self.staged_balance(&staged, &tx.sender);
            let debited = sender - amount;
            if debited < 0 {
                return Err(LedgerError::InsufficientFunds {
                    account: tx.sender.clone(),
                    balance: sender,
                    amount: tx.amount,
                });
            }
            staged.insert(&tx.sender, debited);
        }

        for (account, balance) in staged {
            self.balances.insert(account.to_string(), balance);
        }
        Ok(())
    }

    fn staged_balance(&self, staged: &HashMap<&str, i64>, account: &str) -> i64 {
        staged
            .get(account)
            .copied()
            .unwrap_or_else(|| self.balance(account))
    }

    /// Replace all state with a replay of `chain`, genesis first.
    ///
    /// On error the ledger keeps its previous balances.
    pub fn rebuild(&mut self, chain: &[Block]) -> Result<()> {
        let mut fresh = Ledger::new(self.issuer.clone(), self.initial_supply);
        fresh.reset()?;
        for block in chain {
            fresh.apply_block(&block.transactions)?;
        }
        *self = fresh;
        Ok(())
    }

    /// Take `amount` out of `account` outside of any transaction, as staking
    /// does. Fails without effect if the balance would go negative.
    pub fn debit(&mut self, account: &str, amount: u64) -> Result<()> {
        let balance = self.balance(account);
        let debited = balance - to_signed(amount)?;
        if debited < 0 {
            return Err(LedgerError::InsufficientFunds {
                account: account.to_string(),
                balance,
                amount,
            });
        }
        self.balances.insert(account.to_string(), debited);
        Ok(())
    }

    /// Balance of `account`; unknown accounts hold zero.
    pub fn balance(&self, account: &str) -> i64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// All balances, sorted by account.
    pub fn balances(&self) -> BTreeMap<String, i64> {
        self.balances
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// The non-negativity invariant: every non-issuer balance is `>= 0`.
    pub fn is_solvent(&self) -> bool {
        self.balances
            .iter()
            .all(|(account, balance)| *balance >= 0 || self.is_issuer(account))
    }
}
