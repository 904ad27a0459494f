//! Main blockchain orchestration.
//!
//! One replica's view of the chain: the blocks themselves, the ledger replayed
//! from them, the local stake table, and the pool of pending transactions.

use crate::config::ChainConfig;
use crate::ledger::{Ledger, LedgerError};
use crate::mempool::Mempool;
use rand::Rng;
use serde::Serialize;
use stakechain_consensus::{pos, ChainValidator, StakeEntry, StakeTable};
use stakechain_core::{current_timestamp, Block, Hash, MerkleProof, PublicKey, Transaction};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("consensus error: {0}")]
    Consensus(#[from] stakechain_consensus::ConsensusError),

    #[error("validation error: {0}")]
    Validation(#[from] stakechain_consensus::ValidationError),

    #[error("block error: {0}")]
    Block(#[from] stakechain_core::BlockError),

    #[error("mempool error: {0}")]
    Mempool(#[from] crate::mempool::MempoolError),

    #[error("insufficient balance: {account} has {available}, needs {required}")]
    InsufficientBalance {
        account: String,
        required: u64,
        available: i64,
    },

    #[error("stake amount must be positive")]
    ZeroStake,

    #[error("{0} is the issuing account and cannot send or stake")]
    ReservedSender(String),

    #[error("transaction {0} does not match its digest")]
    InvalidTransaction(Hash),

    #[error("transaction {0} is already on chain")]
    AlreadyConfirmed(Hash),

    #[error("candidate chain starts from a different genesis block")]
    GenesisMismatch,

    #[error("stake of {staked} by {account} not covered by candidate balance {available}")]
    StakeNotCovered {
        account: String,
        staked: u64,
        available: i64,
    },
}

pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Why a pending transaction was left out of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// Missing signature, or one that does not verify against the sender's key.
    InvalidSignature,
    /// No public key registered for the sender.
    UnknownSender,
    InsufficientFunds { balance: i64, amount: u64 },
    AmountOverflow(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedTransaction {
    pub tx: Transaction,
    pub reason: RejectReason,
}

/// A freshly produced block together with what was left out of it.
#[derive(Debug, Clone)]
pub struct BlockProposal {
    pub block: Block,
    pub validator: String,
    pub rejected: Vec<RejectedTransaction>,
}

/// Result of offering a chain to [`Blockchain::try_replace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// `orphaned` counts user transactions that were only in the dropped
    /// local blocks. They are not requeued.
    Replaced {
        previous_len: usize,
        new_len: usize,
        orphaned: usize,
    },
    Ignored { local_len: usize, candidate_len: usize },
}

impl ReplaceOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, ReplaceOutcome::Replaced { .. })
    }
}

/// Read-only copy of a replica's state, for display and export.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSnapshot {
    pub blocks: Vec<Block>,
    pub balances: BTreeMap<String, i64>,
    pub stakes: Vec<StakeEntry>,
    pub valid: bool,
}

impl ChainSnapshot {
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockchainStats {
    pub height: u64,
    pub blocks: usize,
    pub transactions: usize,
    pub pending: usize,
    pub stakers: usize,
    pub total_stake: u64,
}

pub struct Blockchain {
    config: ChainConfig,
    /// Never empty: index 0 is genesis.
    chain: Vec<Block>,
    ledger: Ledger,
    stakes: StakeTable,
    mempool: Mempool,
    public_keys: HashMap<String, PublicKey>,
}

impl Blockchain {
    /// Create a chain holding only the genesis block built from `config`.
    pub fn new(config: ChainConfig) -> Result<Self> {
        let mut ledger = Ledger::new(config.issuer.clone(), config.initial_supply);
        let opening = ledger.apply_genesis(&config.allocations, config.genesis_timestamp)?;
        let genesis = Block::genesis(opening, config.genesis_timestamp)?;

        info!(hash = %genesis.hash.short(), allocations = genesis.tx_count(), "Genesis block created");

        Ok(Self {
            mempool: Mempool::with_config(config.mempool.clone()),
            config,
            chain: vec![genesis],
            ledger,
            stakes: StakeTable::new(),
            public_keys: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Height of the tip block.
    pub fn height(&self) -> u64 {
        self.latest_block().height()
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn block(&self, height: u64) -> Option<&Block> {
        usize::try_from(height).ok().and_then(|h| self.chain.get(h))
    }

    pub fn genesis(&self) -> &Block {
        &self.chain[0]
    }

    pub fn latest_block(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn balance(&self, account: &str) -> i64 {
        self.ledger.balance(account)
    }

    pub fn balances(&self) -> BTreeMap<String, i64> {
        self.ledger.balances()
    }

    pub fn stakes(&self) -> &StakeTable {
        &self.stakes
    }

    pub fn stake_of(&self, account: &str) -> u64 {
        self.stakes.stake_of(account)
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Register the key used to check `account`'s signatures.
    pub fn register_public_key(&mut self, account: impl Into<String>, public_key: PublicKey) {
        self.public_keys.insert(account.into(), public_key);
    }

    pub fn public_key(&self, account: &str) -> Option<&PublicKey> {
        self.public_keys.get(account)
    }

    fn contains_transaction(&self, tx_hash: &Hash) -> bool {
        self.chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .any(|tx| &tx.hash == tx_hash)
    }

    /// Queue a transaction for the next block.
    ///
    /// Only structural checks happen here. Signatures and funds are checked
    /// when a block is built, against the state at that time.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<Hash> {
        if self.ledger.is_issuer(&tx.sender) {
            return Err(BlockchainError::ReservedSender(tx.sender));
        }
        if !tx.verify_hash() {
            return Err(BlockchainError::InvalidTransaction(tx.hash));
        }
        if self.contains_transaction(&tx.hash) {
            return Err(BlockchainError::AlreadyConfirmed(tx.hash));
        }

        let hash = tx.hash;
        debug!(tx = %tx, "Transaction queued");
        self.mempool.add(tx)?;
        Ok(hash)
    }

    /// Lock `amount` of `account`'s balance as stake, returning its total stake.
    ///
    /// Staking cannot be undone. Fails without any effect when the balance
    /// does not cover the amount or the stake table total would overflow.
    pub fn stake(&mut self, account: &str, amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(BlockchainError::ZeroStake);
        }
        if self.ledger.is_issuer(account) {
            return Err(BlockchainError::ReservedSender(account.to_string()));
        }

        let available = self.ledger.balance(account);
        let covered = i64::try_from(amount).map_or(false, |a| available >= a);
        if !covered {
            return Err(BlockchainError::InsufficientBalance {
                account: account.to_string(),
                required: amount,
                available,
            });
        }

        self.stakes.check_deposit(account, amount)?;
        self.ledger.debit(account, amount)?;
        let total = self.stakes.deposit(account, amount)?;
        info!(account, amount, total, "Stake locked");
        Ok(total)
    }

    /// Draw the next block producer from the stake table.
    pub fn select_validator<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
        Ok(pos::select_validator(&self.stakes, rng)?)
    }

    /// Select a validator, build a block on the tip and append it.
    ///
    /// Included and rejected transactions both leave the pending pool.
    pub fn propose_block<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<BlockProposal> {
        let validator = self.select_validator(rng)?;
        let proposal = self.build_block(&validator)?;
        self.append_block(proposal.block.clone())?;

        let included = proposal.block.transactions.iter().map(|tx| &tx.hash);
        let rejected = proposal.rejected.iter().map(|r| &r.tx.hash);
        self.mempool.remove_batch(included.chain(rejected));

        Ok(proposal)
    }

    /// Build, but do not append, a block produced by `validator`.
    ///
    /// The reward transaction comes first. Pending transactions follow in
    /// submission order, each screened against the ledger as it will stand
    /// after everything before it; those that fail are reported instead.
    pub fn build_block(&self, validator: &str) -> Result<BlockProposal> {
        let tip = self.latest_block();
        let timestamp = current_timestamp();

        let reward = Transaction::reward(
            self.ledger.issuer(),
            validator,
            self.config.block_reward,
            timestamp,
        );
        let mut scratch = self.ledger.clone();
        scratch.apply_block(std::slice::from_ref(&reward))?;

        let mut transactions = vec![reward];
        let mut rejected = Vec::new();

        for tx in self.mempool.get_pending(self.mempool.len()) {
            match self.screen(&tx, &mut scratch) {
                Ok(()) => transactions.push(tx),
                Err(reason) => {
                    warn!(tx = %tx, ?reason, "Transaction rejected");
                    rejected.push(RejectedTransaction { tx, reason });
                }
            }
        }

        let block = Block::assemble_at(transactions, tip.hash, validator, tip.height() + 1, timestamp)?;

        Ok(BlockProposal {
            block,
            validator: validator.to_string(),
            rejected,
        })
    }

    fn screen(&self, tx: &Transaction, scratch: &mut Ledger) -> std::result::Result<(), RejectReason> {
        if self.config.require_signatures {
            let key = self
                .public_keys
                .get(&tx.sender)
                .ok_or(RejectReason::UnknownSender)?;
            if !tx.verify(key) {
                return Err(RejectReason::InvalidSignature);
            }
        }

        scratch
            .apply_block(std::slice::from_ref(tx))
            .map_err(|err| match err {
                LedgerError::InsufficientFunds { balance, amount, .. } => {
                    RejectReason::InsufficientFunds { balance, amount }
                }
                LedgerError::AmountOverflow(amount) => RejectReason::AmountOverflow(amount),
            })
    }

    /// Append a block that extends the tip.
    ///
    /// The block must link to the tip, recompute to its own digest, and
    /// replay against the ledger. On error nothing changes.
    pub fn append_block(&mut self, block: Block) -> Result<()> {
        ChainValidator::validate_block_extends_parent(&block, self.latest_block())?;
        ChainValidator::validate_block_integrity(&block)?;
        self.ledger.apply_block(&block.transactions)?;
        debug_assert!(self.ledger.is_solvent(), "ledger negative after successful apply");

        info!(
            height = block.height(),
            hash = %block.hash.short(),
            producer = %block.header.producer,
            txs = block.tx_count(),
            "Block appended"
        );
        self.chain.push(block);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Ok(ChainValidator::validate(&self.chain)?)
    }

    pub fn is_valid(&self) -> bool {
        ChainValidator::is_valid(&self.chain)
    }

    /// Replay `chain` into a fresh ledger, then take this replica's stake
    /// locks out of it.
    fn replay(&self, chain: &[Block]) -> Result<Ledger> {
        let mut ledger = Ledger::new(self.config.issuer.clone(), self.config.initial_supply);
        ledger.rebuild(chain)?;

        for entry in self.stakes.iter() {
            let available = ledger.balance(&entry.account);
            if ledger.debit(&entry.account, entry.amount).is_err() {
                return Err(BlockchainError::StakeNotCovered {
                    account: entry.account.clone(),
                    staked: entry.amount,
                    available,
                });
            }
        }

        Ok(ledger)
    }

    /// Recompute the ledger from the local chain.
    pub fn rebuild_ledger(&mut self) -> Result<()> {
        self.ledger = self.replay(&self.chain)?;
        Ok(())
    }

    /// Adopt `candidate` if it is valid, shares our genesis and is strictly
    /// longer than the local chain.
    ///
    /// Invalid or foreign candidates are errors. A valid candidate that is
    /// not longer is ignored. The chain and ledger are swapped together only
    /// after the candidate has replayed cleanly.
    pub fn try_replace(&mut self, candidate: Vec<Block>) -> Result<ReplaceOutcome> {
        ChainValidator::validate(&candidate)?;
        if candidate[0].hash != self.genesis().hash {
            return Err(BlockchainError::GenesisMismatch);
        }

        let local_len = self.chain.len();
        if candidate.len() <= local_len {
            debug!(local_len, candidate_len = candidate.len(), "Candidate chain not longer, ignored");
            return Ok(ReplaceOutcome::Ignored {
                local_len,
                candidate_len: candidate.len(),
            });
        }

        let ledger = self.replay(&candidate)?;
        let orphaned = self.orphaned_by(&candidate);
        for tx in &orphaned {
            warn!(tx = %tx, "Transaction dropped with replaced block");
        }
        self.chain = candidate;
        self.ledger = ledger;

        let confirmed: Vec<Hash> = self
            .mempool
            .get_pending(self.mempool.len())
            .into_iter()
            .map(|tx| tx.hash)
            .filter(|h| self.contains_transaction(h))
            .collect();
        self.mempool.remove_batch(&confirmed);

        info!(
            previous_len = local_len,
            new_len = self.chain.len(),
            orphaned = orphaned.len(),
            tip = %self.latest_block().hash.short(),
            "Chain replaced"
        );
        Ok(ReplaceOutcome::Replaced {
            previous_len: local_len,
            new_len: self.chain.len(),
            orphaned: orphaned.len(),
        })
    }

    /// User transactions in local blocks that `candidate` does not carry.
    /// Rewards are left out; the candidate pays its own.
    fn orphaned_by(&self, candidate: &[Block]) -> Vec<Transaction> {
        let kept: HashSet<Hash> = candidate
            .iter()
            .flat_map(|b| b.transactions.iter().map(|tx| tx.hash))
            .collect();
        self.chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .filter(|tx| !self.ledger.is_issuer(&tx.sender) && !kept.contains(&tx.hash))
            .cloned()
            .collect()
    }

    /// Inclusion proof for transaction `index` of block `height`.
    pub fn prove_transaction(&self, height: u64, index: usize) -> Option<MerkleProof> {
        self.block(height)?.merkle_tree().ok()?.proof(index)
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            blocks: self.chain.clone(),
            balances: self.balances(),
            stakes: self.stakes.entries().to_vec(),
            valid: self.is_valid(),
        }
    }

    pub fn stats(&self) -> BlockchainStats {
        BlockchainStats {
            height: self.height(),
            blocks: self.chain.len(),
            transactions: self.chain.iter().map(|b| b.tx_count()).sum(),
            pending: self.mempool.len(),
            stakers: self.stakes.len(),
            total_stake: self.stakes.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Allocation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use stakechain_consensus::{ConsensusError, ValidationError};
    use stakechain_core::{verify_proof, Keypair};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn unsigned_config() -> ChainConfig {
        ChainConfig {
            require_signatures: false,
            ..ChainConfig::default()
        }
    }

    fn staked_chain(config: ChainConfig) -> Blockchain {
        let mut chain = Blockchain::new(config).unwrap();
        chain.stake("Alice", 60).unwrap();
        chain
    }

    #[test]
    fn test_genesis() {
        let chain = Blockchain::new(ChainConfig::default()).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.height(), 0);
        assert!(chain.genesis().is_genesis());
        assert_eq!(chain.genesis().header.producer, "system");
        assert_eq!(chain.genesis().tx_count(), 2);
        assert_eq!(chain.balance("Alice"), 100);
        assert_eq!(chain.balance("Bob"), 100);
        assert_eq!(chain.balance("System"), 1000);
        assert!(chain.is_valid());
    }

    #[test]
    fn test_genesis_is_shared_by_replicas() {
        let a = Blockchain::new(ChainConfig::default()).unwrap();
        let b = Blockchain::new(ChainConfig::default()).unwrap();
        assert_eq!(a.genesis().hash, b.genesis().hash);
    }

    #[test]
    fn test_genesis_without_allocations_fails() {
        let config = ChainConfig {
            allocations: vec![],
            ..ChainConfig::default()
        };
        assert!(matches!(
            Blockchain::new(config),
            Err(BlockchainError::Block(_))
        ));
    }

    #[test]
    fn test_stake_debits_balance() {
        let mut chain = Blockchain::new(ChainConfig::default()).unwrap();
        assert_eq!(chain.stake("Alice", 60).unwrap(), 60);
        assert_eq!(chain.balance("Alice"), 40);
        assert_eq!(chain.stake("Alice", 10).unwrap(), 70);
        assert_eq!(chain.balance("Alice"), 30);
        assert_eq!(chain.stake_of("Alice"), 70);
    }

    #[test]
    fn test_stake_overflowing_total_has_no_effect() {
        let whale = i64::MAX as u64;
        let config = ChainConfig {
            allocations: vec![
                Allocation::new("A", whale),
                Allocation::new("B", whale),
                Allocation::new("C", whale),
            ],
            ..unsigned_config()
        };
        let mut chain = Blockchain::new(config).unwrap();

        chain.stake("A", whale).unwrap();
        chain.stake("B", whale).unwrap();
        let err = chain.stake("C", whale).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::Consensus(ConsensusError::StakeOverflow { ref account, amount })
                if account == "C" && amount == whale
        ));
        assert_eq!(chain.balance("C"), i64::MAX);
        assert_eq!(chain.stake_of("C"), 0);
        assert_eq!(chain.stakes().total(), 2 * whale);

        let proposal = chain.propose_block(&mut StdRng::seed_from_u64(1)).unwrap();
        assert!(proposal.validator == "A" || proposal.validator == "B");
        assert_eq!(chain.stats().total_stake, 2 * whale);
    }

    #[test]
    fn test_stake_beyond_balance_has_no_effect() {
        let config = ChainConfig {
            allocations: vec![Allocation::new("Alice", 100), Allocation::new("Carol", 30)],
            ..ChainConfig::default()
        };
        let mut chain = Blockchain::new(config).unwrap();

        let err = chain.stake("Carol", 50).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::InsufficientBalance { ref account, required: 50, available: 30 }
                if account == "Carol"
        ));
        assert_eq!(chain.balance("Carol"), 30);
        assert_eq!(chain.stake_of("Carol"), 0);
        assert!(chain.stakes().is_empty());
    }

    #[test]
    fn test_stake_rejects_zero_and_issuer() {
        let mut chain = Blockchain::new(ChainConfig::default()).unwrap();
        assert!(matches!(chain.stake("Alice", 0), Err(BlockchainError::ZeroStake)));
        assert!(matches!(
            chain.stake("System", 10),
            Err(BlockchainError::ReservedSender(_))
        ));
    }

    #[test]
    fn test_propose_without_stake() {
        let mut chain = Blockchain::new(ChainConfig::default()).unwrap();
        let err = chain.propose_block(&mut rng()).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::Consensus(ConsensusError::NoEligibleValidator)
        ));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_end_to_end_signed_transfer() {
        let mut chain = Blockchain::new(ChainConfig::default()).unwrap();
        let alice = Keypair::generate();
        chain.register_public_key("Alice", alice.public_key.clone());

        chain.stake("Alice", 60).unwrap();
        chain
            .submit_transaction(Transaction::new("Alice", "Bob", 20).signed(&alice))
            .unwrap();

        let proposal = chain.propose_block(&mut rng()).unwrap();
        assert_eq!(proposal.validator, "Alice");
        assert!(proposal.rejected.is_empty());

        let block = chain.latest_block();
        assert_eq!(block.height(), 1);
        assert_eq!(block.header.producer, "Alice");
        assert_eq!(block.tx_count(), 2);
        assert_eq!(block.transactions[0].sender, "System");
        assert_eq!(block.transactions[0].receiver, "Alice");
        assert_eq!(block.transactions[0].amount, 10);

        // 100 - 60 staked - 20 sent + 10 reward
        assert_eq!(chain.balance("Alice"), 30);
        assert_eq!(chain.balance("Bob"), 120);
        assert!(chain.mempool().is_empty());
        assert!(chain.is_valid());
    }

    #[test]
    fn test_unsigned_transaction_rejected_block_still_built() {
        let mut chain = staked_chain(ChainConfig::default());
        chain.register_public_key("Alice", Keypair::generate().public_key);
        chain
            .submit_transaction(Transaction::new("Alice", "Bob", 20))
            .unwrap();

        let proposal = chain.propose_block(&mut rng()).unwrap();
        assert_eq!(proposal.rejected.len(), 1);
        assert_eq!(proposal.rejected[0].reason, RejectReason::InvalidSignature);
        assert_eq!(proposal.block.tx_count(), 1);
        assert_eq!(chain.balance("Bob"), 100);
        assert!(chain.mempool().is_empty());
    }

    #[test]
    fn test_signature_from_other_key_rejected() {
        let mut chain = staked_chain(ChainConfig::default());
        chain.register_public_key("Alice", Keypair::generate().public_key);
        let mallory = Keypair::generate();
        chain
            .submit_transaction(Transaction::new("Alice", "Bob", 20).signed(&mallory))
            .unwrap();

        let proposal = chain.propose_block(&mut rng()).unwrap();
        assert_eq!(proposal.rejected[0].reason, RejectReason::InvalidSignature);
    }

    #[test]
    fn test_unknown_sender_rejected() {
        let mut chain = staked_chain(ChainConfig::default());
        let bob = Keypair::generate();
        chain
            .submit_transaction(Transaction::new("Bob", "Alice", 5).signed(&bob))
            .unwrap();

        let proposal = chain.propose_block(&mut rng()).unwrap();
        assert_eq!(proposal.rejected[0].reason, RejectReason::UnknownSender);
        assert_eq!(chain.balance("Bob"), 100);
    }

    #[test]
    fn test_overdraft_rejected() {
        let mut chain = staked_chain(unsigned_config());
        chain
            .submit_transaction(Transaction::new("Bob", "Carol", 150))
            .unwrap();

        let proposal = chain.propose_block(&mut rng()).unwrap();
        assert_eq!(
            proposal.rejected[0].reason,
            RejectReason::InsufficientFunds {
                balance: 100,
                amount: 150
            }
        );
        assert_eq!(chain.balance("Carol"), 0);
        assert!(chain.ledger().is_solvent());
    }

    #[test]
    fn test_credit_spent_in_same_block() {
        let mut chain = staked_chain(unsigned_config());
        chain
            .submit_transaction(Transaction::new("Bob", "Carol", 50))
            .unwrap();
        chain
            .submit_transaction(Transaction::new("Carol", "Dave", 30))
            .unwrap();

        let proposal = chain.propose_block(&mut rng()).unwrap();
        assert!(proposal.rejected.is_empty());
        assert_eq!(proposal.block.tx_count(), 3);
        assert_eq!(chain.balance("Carol"), 20);
        assert_eq!(chain.balance("Dave"), 30);
    }

    #[test]
    fn test_empty_proposal_carries_reward_only() {
        let mut chain = staked_chain(ChainConfig::default());
        let proposal = chain.propose_block(&mut rng()).unwrap();
        assert_eq!(proposal.block.tx_count(), 1);
        assert_eq!(chain.balance("Alice"), 50);
    }

    #[test]
    fn test_submit_checks() {
        let mut chain = Blockchain::new(unsigned_config()).unwrap();
        assert!(matches!(
            chain.submit_transaction(Transaction::new("System", "Bob", 5)),
            Err(BlockchainError::ReservedSender(_))
        ));

        let mut forged = Transaction::new("Alice", "Bob", 5);
        forged.amount = 50;
        assert!(matches!(
            chain.submit_transaction(forged),
            Err(BlockchainError::InvalidTransaction(_))
        ));

        let tx = Transaction::new("Alice", "Bob", 5);
        chain.submit_transaction(tx.clone()).unwrap();
        assert!(matches!(
            chain.submit_transaction(tx),
            Err(BlockchainError::Mempool(_))
        ));
    }

    #[test]
    fn test_confirmed_transaction_cannot_be_resubmitted() {
        let mut chain = staked_chain(unsigned_config());
        let tx = Transaction::new("Bob", "Carol", 5);
        chain.submit_transaction(tx.clone()).unwrap();
        chain.propose_block(&mut rng()).unwrap();
        assert!(matches!(
            chain.submit_transaction(tx),
            Err(BlockchainError::AlreadyConfirmed(_))
        ));
    }

    #[test]
    fn test_append_rejects_foreign_block() {
        let mut chain = staked_chain(unsigned_config());
        let stale = Block::assemble_at(
            vec![Transaction::create("System", "Alice", 10, 1)],
            Hash::ZERO,
            "Alice",
            1,
            1,
        )
        .unwrap();
        assert!(matches!(
            chain.append_block(stale),
            Err(BlockchainError::Validation(ValidationError::InvalidPrevHash { height: 1 }))
        ));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_tampered_copy_is_invalid() {
        let mut chain = staked_chain(unsigned_config());
        chain
            .submit_transaction(Transaction::new("Bob", "Carol", 10))
            .unwrap();
        chain.propose_block(&mut rng()).unwrap();
        chain.propose_block(&mut rng()).unwrap();

        let mut blocks = chain.blocks().to_vec();
        blocks[1].transactions[1].amount = 99;
        assert!(!ChainValidator::is_valid(&blocks));
        assert!(chain.is_valid());
    }

    #[test]
    fn test_validate_reports_tampering_in_place() {
        let mut chain = staked_chain(unsigned_config());
        chain
            .submit_transaction(Transaction::new("Bob", "Carol", 10))
            .unwrap();
        chain.propose_block(&mut rng()).unwrap();
        assert!(chain.validate().is_ok());

        chain.chain[1].transactions[1].amount = 99;
        assert!(matches!(
            chain.validate(),
            Err(BlockchainError::Validation(_))
        ));
        assert!(!chain.is_valid());
    }

    #[test]
    fn test_equal_length_candidate_ignored() {
        let mut a = staked_chain(unsigned_config());
        let mut b = staked_chain(unsigned_config());
        a.propose_block(&mut rng()).unwrap();
        b.propose_block(&mut rng()).unwrap();
        let tip = b.latest_block().hash;

        let outcome = b.try_replace(a.blocks().to_vec()).unwrap();
        assert_eq!(
            outcome,
            ReplaceOutcome::Ignored {
                local_len: 2,
                candidate_len: 2
            }
        );
        assert_eq!(b.latest_block().hash, tip);
    }

    #[test]
    fn test_longer_candidate_replaces_and_replays() {
        let mut a = staked_chain(unsigned_config());
        let mut b = staked_chain(unsigned_config());
        a.submit_transaction(Transaction::new("Bob", "Carol", 25))
            .unwrap();
        a.propose_block(&mut rng()).unwrap();
        a.propose_block(&mut rng()).unwrap();
        b.propose_block(&mut rng()).unwrap();

        let outcome = b.try_replace(a.blocks().to_vec()).unwrap();
        assert_eq!(
            outcome,
            ReplaceOutcome::Replaced {
                previous_len: 2,
                new_len: 3,
                orphaned: 0
            }
        );
        assert_eq!(b.blocks(), a.blocks());
        assert_eq!(b.balances(), a.balances());

        let mut fresh = Ledger::new("System", 1000);
        fresh.rebuild(a.blocks()).unwrap();
        fresh.debit("Alice", 60).unwrap();
        assert_eq!(b.balances(), fresh.balances());
    }

    #[test]
    fn test_replacement_counts_orphaned_transfers() {
        let mut a = staked_chain(unsigned_config());
        let mut b = staked_chain(unsigned_config());
        b.submit_transaction(Transaction::new("Bob", "Dave", 7))
            .unwrap();
        b.propose_block(&mut rng()).unwrap();
        a.propose_block(&mut rng()).unwrap();
        a.propose_block(&mut rng()).unwrap();

        let outcome = b.try_replace(a.blocks().to_vec()).unwrap();
        assert_eq!(
            outcome,
            ReplaceOutcome::Replaced {
                previous_len: 2,
                new_len: 3,
                orphaned: 1
            }
        );
        assert_eq!(b.balance("Dave"), 0);
        assert!(b.mempool().is_empty());
    }

    #[test]
    fn test_invalid_longer_candidate_rejected() {
        let mut a = staked_chain(unsigned_config());
        let mut b = staked_chain(unsigned_config());
        a.propose_block(&mut rng()).unwrap();
        a.propose_block(&mut rng()).unwrap();

        let mut candidate = a.blocks().to_vec();
        candidate[1].transactions[0].amount = 1_000;
        assert!(matches!(
            b.try_replace(candidate),
            Err(BlockchainError::Validation(_))
        ));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_foreign_genesis_rejected() {
        let mut a = staked_chain(ChainConfig {
            genesis_timestamp: 42,
            ..unsigned_config()
        });
        let mut b = staked_chain(unsigned_config());
        a.propose_block(&mut rng()).unwrap();

        assert!(matches!(
            b.try_replace(a.blocks().to_vec()),
            Err(BlockchainError::GenesisMismatch)
        ));
    }

    #[test]
    fn test_candidate_must_cover_local_stakes() {
        let mut a = staked_chain(unsigned_config());
        let mut b = Blockchain::new(unsigned_config()).unwrap();
        b.stake("Bob", 100).unwrap();

        a.submit_transaction(Transaction::new("Bob", "Carol", 50))
            .unwrap();
        a.propose_block(&mut rng()).unwrap();

        let before = b.balances();
        assert!(matches!(
            b.try_replace(a.blocks().to_vec()),
            Err(BlockchainError::StakeNotCovered { staked: 100, available: 50, .. })
        ));
        assert_eq!(b.len(), 1);
        assert_eq!(b.balances(), before);
    }

    #[test]
    fn test_replacement_prunes_confirmed_pending() {
        let mut a = staked_chain(unsigned_config());
        let mut b = staked_chain(unsigned_config());
        let tx = Transaction::new("Bob", "Carol", 5);
        a.submit_transaction(tx.clone()).unwrap();
        b.submit_transaction(tx).unwrap();
        b.submit_transaction(Transaction::new("Bob", "Dave", 1))
            .unwrap();

        a.propose_block(&mut rng()).unwrap();
        b.try_replace(a.blocks().to_vec()).unwrap();
        assert_eq!(b.mempool().len(), 1);
    }

    #[test]
    fn test_rebuild_ledger_is_idempotent() {
        let mut chain = staked_chain(unsigned_config());
        chain
            .submit_transaction(Transaction::new("Bob", "Carol", 30))
            .unwrap();
        chain.propose_block(&mut rng()).unwrap();

        let before = chain.balances();
        chain.rebuild_ledger().unwrap();
        assert_eq!(chain.balances(), before);
        chain.rebuild_ledger().unwrap();
        assert_eq!(chain.balances(), before);
    }

    #[test]
    fn test_transaction_proofs() {
        let mut chain = staked_chain(unsigned_config());
        chain
            .submit_transaction(Transaction::new("Bob", "Carol", 1))
            .unwrap();
        chain
            .submit_transaction(Transaction::new("Bob", "Dave", 2))
            .unwrap();
        chain.propose_block(&mut rng()).unwrap();

        let block = chain.latest_block();
        for index in 0..block.tx_count() {
            let proof = chain.prove_transaction(1, index).unwrap();
            assert_eq!(proof.leaf, block.transactions[index].hash);
            assert!(verify_proof(&block.header.merkle_root, &proof));
        }
        assert!(chain.prove_transaction(1, 3).is_none());
        assert!(chain.prove_transaction(9, 0).is_none());
    }

    #[test]
    fn test_snapshot_and_stats() {
        let mut chain = staked_chain(unsigned_config());
        chain.propose_block(&mut rng()).unwrap();

        let snapshot = chain.snapshot();
        assert!(snapshot.valid);
        assert_eq!(snapshot.blocks.len(), 2);
        assert_eq!(snapshot.tip().unwrap().hash, chain.latest_block().hash);
        assert_eq!(snapshot.stakes[0].account, "Alice");
        assert_eq!(snapshot.balances["Alice"], 50);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["stakes"][0]["amount"], 60);

        let stats = chain.stats();
        assert_eq!(stats.height, 1);
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.transactions, 3);
        assert_eq!(stats.total_stake, 60);
    }
}
