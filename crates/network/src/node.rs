//! A single replica.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rand::Rng;
use stakechain_chain::blockchain::Result;
use stakechain_chain::{BlockProposal, Blockchain, ChainConfig, ChainSnapshot, ReplaceOutcome};
use stakechain_core::{Block, Hash, PublicKey, Transaction};

pub type NodeId = usize;

/// One replica holding its own chain behind a lock.
///
/// Every mutation takes the write lock for its whole duration, so a proposal
/// always builds on the tip it read and no two proposals share a parent.
pub struct Node {
    id: NodeId,
    chain: RwLock<Blockchain>,
}

impl Node {
    pub fn new(id: NodeId, config: ChainConfig) -> Result<Self> {
        Ok(Self {
            id,
            chain: RwLock::new(Blockchain::new(config)?),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Blockchain> {
        self.chain.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Blockchain> {
        self.chain.write()
    }

    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    pub fn tip_hash(&self) -> Hash {
        self.chain.read().latest_block().hash
    }

    /// Copy of the full chain.
    pub fn blocks(&self) -> Vec<Block> {
        self.chain.read().blocks().to_vec()
    }

    /// Select, assemble and append under one write lock.
    pub fn propose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<BlockProposal> {
        self.chain.write().propose_block(rng)
    }

    pub fn receive_chain(&self, candidate: Vec<Block>) -> Result<ReplaceOutcome> {
        self.chain.write().try_replace(candidate)
    }

    pub fn submit_transaction(&self, tx: Transaction) -> Result<Hash> {
        self.chain.write().submit_transaction(tx)
    }

    pub fn stake(&self, account: &str, amount: u64) -> Result<u64> {
        self.chain.write().stake(account, amount)
    }

    pub fn register_public_key(&self, account: &str, public_key: PublicKey) {
        self.chain.write().register_public_key(account, public_key);
    }

    pub fn balance(&self, account: &str) -> i64 {
        self.chain.read().balance(account)
    }

    pub fn is_valid(&self) -> bool {
        self.chain.read().is_valid()
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        self.chain.read().snapshot()
    }
}
