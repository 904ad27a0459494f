//! Chain validity rules.
//!
//! A chain is valid when every block's digest can be recomputed from its
//! fields and every block points at its parent's digest. The chain is never
//! repaired here; violations are reported to the caller.

use stakechain_core::{Block, Hash};
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("chain has no blocks")]
    EmptyChain,

    #[error("first block is not a genesis block")]
    InvalidGenesis,

    #[error("block {height} carries no transactions")]
    EmptyBlock { height: u64 },

    #[error("block height mismatch (expected {expected}, got {got})")]
    InvalidHeight { expected: u64, got: u64 },

    #[error("block {height} prev_hash does not match parent digest")]
    InvalidPrevHash { height: u64 },

    #[error("block {height} transaction {index} digest mismatch")]
    TransactionHashMismatch { height: u64, index: usize },

    #[error("block {height} merkle root does not match its transactions")]
    MerkleRootMismatch { height: u64 },

    #[error("block {height} digest does not match its fields")]
    HashMismatch { height: u64 },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Chain validator.
pub struct ChainValidator;

impl ChainValidator {
    /// Check that a block's own digests are consistent with its contents.
    pub fn validate_block_integrity(block: &Block) -> Result<()> {
        let height = block.height();

        if block.transactions.is_empty() {
            return Err(ValidationError::EmptyBlock { height });
        }

        for (index, tx) in block.transactions.iter().enumerate() {
            if !tx.verify_hash() {
                return Err(ValidationError::TransactionHashMismatch { height, index });
            }
        }

        if !block.verify_merkle_root() {
            return Err(ValidationError::MerkleRootMismatch { height });
        }

        if !block.verify_hash() {
            return Err(ValidationError::HashMismatch { height });
        }

        Ok(())
    }

    /// Check that `block` directly extends `parent`.
    pub fn validate_block_extends_parent(block: &Block, parent: &Block) -> Result<()> {
        let expected = parent.height() + 1;
        if block.height() != expected {
            return Err(ValidationError::InvalidHeight {
                expected,
                got: block.height(),
            });
        }

        if block.prev_hash() != parent.hash {
            return Err(ValidationError::InvalidPrevHash {
                height: block.height(),
            });
        }

        Ok(())
    }

    /// Validate a whole chain, reporting the first violation.
    ///
    /// The genesis block must carry the zero sentinel and a recomputable
    /// digest; every later block must extend its predecessor.
    pub fn validate(chain: &[Block]) -> Result<()> {
        let genesis = chain.first().ok_or(ValidationError::EmptyChain)?;
        if genesis.prev_hash() != Hash::ZERO || genesis.height() != 0 {
            return Err(ValidationError::InvalidGenesis);
        }
        Self::validate_block_integrity(genesis)?;

        for pair in chain.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            Self::validate_block_extends_parent(cur, prev)?;
            Self::validate_block_integrity(cur)?;
        }

        Ok(())
    }

    pub fn is_valid(chain: &[Block]) -> bool {
        Self::validate(chain).is_ok()
    }
}
