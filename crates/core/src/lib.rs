//! Core ledger primitives for stakechain.
//!
//! This crate provides the fundamental types used throughout the chain:
//! - Hashing (Blake3 digests)
//! - Ed25519 signing and verification
//! - Merkle aggregation and inclusion proofs
//! - Transactions
//! - Blocks

pub mod block;
pub mod crypto;
pub mod hash;
pub mod merkle;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{Block, BlockError, SYSTEM_PRODUCER};
pub use crypto::{CryptoError, Keypair, PublicKey, Signature};
pub use hash::{hash, hash_concat, Hash, H256};
pub use merkle::{merkle_root, verify_proof, MerkleError, MerkleProof, MerkleTree};
pub use transaction::{current_timestamp, Transaction};
