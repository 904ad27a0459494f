//! Blocks: ordered transaction batches bound to their parent by digest.

use crate::hash::{hash_encoded, Hash};
use crate::merkle::{merkle_root, MerkleError, MerkleTree};
use crate::transaction::{current_timestamp, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Producer identity recorded on the genesis block.
pub const SYSTEM_PRODUCER: &str = "system";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("a block must carry at least one transaction")]
    Empty,
}

impl From<MerkleError> for BlockError {
    fn from(err: MerkleError) -> Self {
        match err {
            MerkleError::NoLeaves => BlockError::Empty,
        }
    }
}

/// Header fields of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position in the chain (0 for genesis). Not covered by the digest.
    pub height: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    /// Selected validator, or [`SYSTEM_PRODUCER`] for genesis.
    pub producer: String,
}

#[derive(Serialize)]
struct DigestFields<'a> {
    timestamp: u64,
    merkle_root: &'a Hash,
    prev_hash: &'a Hash,
    producer: &'a str,
}

impl BlockHeader {
    /// Digest over timestamp, merkle root, previous digest and producer.
    pub fn digest(&self) -> Hash {
        self.digest_with_root(&self.merkle_root)
    }

    fn digest_with_root(&self, merkle_root: &Hash) -> Hash {
        hash_encoded(&DigestFields {
            timestamp: self.timestamp,
            merkle_root,
            prev_hash: &self.prev_hash,
            producer: &self.producer,
        })
    }
}

/// A block: header, its digest, and the transactions it commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub hash: Hash,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Assemble a block stamped with the current time.
    pub fn assemble(
        transactions: Vec<Transaction>,
        prev_hash: Hash,
        producer: impl Into<String>,
        height: u64,
    ) -> Result<Self, BlockError> {
        Self::assemble_at(transactions, prev_hash, producer, height, current_timestamp())
    }

    /// Assemble a block with an explicit timestamp.
    pub fn assemble_at(
        transactions: Vec<Transaction>,
        prev_hash: Hash,
        producer: impl Into<String>,
        height: u64,
        timestamp: u64,
    ) -> Result<Self, BlockError> {
        let tx_hashes: Vec<Hash> = transactions.iter().map(|tx| tx.hash).collect();
        let merkle_root = merkle_root(&tx_hashes)?;

        let header = BlockHeader {
            height,
            timestamp,
            prev_hash,
            merkle_root,
            producer: producer.into(),
        };
        let hash = header.digest();

        Ok(Self {
            header,
            hash,
            transactions,
        })
    }

    /// The genesis block: height 0, zero previous digest, produced by `system`.
    pub fn genesis(transactions: Vec<Transaction>, timestamp: u64) -> Result<Self, BlockError> {
        Self::assemble_at(transactions, Hash::ZERO, SYSTEM_PRODUCER, 0, timestamp)
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn prev_hash(&self) -> Hash {
        self.header.prev_hash
    }

    pub fn is_genesis(&self) -> bool {
        self.header.height == 0 && self.header.prev_hash == Hash::ZERO
    }

    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Merkle root over digests recomputed from each transaction's fields.
    pub fn compute_merkle_root(&self) -> Result<Hash, BlockError> {
        let tx_hashes: Vec<Hash> = self.transactions.iter().map(|tx| tx.compute_hash()).collect();
        Ok(merkle_root(&tx_hashes)?)
    }

    /// Recompute the block digest from scratch.
    ///
    /// Transaction digests and the merkle root are derived again from the
    /// transaction fields, so tampering with any transaction changes the
    /// result. Pure; yields the assembly-time digest for an untouched block.
    pub fn compute_hash(&self) -> Result<Hash, BlockError> {
        let root = self.compute_merkle_root()?;
        Ok(self.header.digest_with_root(&root))
    }

    pub fn verify_merkle_root(&self) -> bool {
        matches!(self.compute_merkle_root(), Ok(root) if root == self.header.merkle_root)
    }

    pub fn verify_hash(&self) -> bool {
        matches!(self.compute_hash(), Ok(h) if h == self.hash)
    }

    /// Merkle tree over the stored transaction digests.
    pub fn merkle_tree(&self) -> Result<MerkleTree, BlockError> {
        let tx_hashes: Vec<Hash> = self.transactions.iter().map(|tx| tx.hash).collect();
        Ok(MerkleTree::new(&tx_hashes)?)
    }

    /// Sum of all transferred amounts.
    pub fn total_amount(&self) -> u64 {
        self.transactions.iter().map(|tx| tx.amount).sum()
    }
}
