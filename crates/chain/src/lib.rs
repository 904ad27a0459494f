//! Blockchain orchestration for stakechain.
//!
//! This crate brings the pieces together into one replica's chain state:
//! - **Ledger**: balances derived by replaying every block
//! - **Mempool**: transactions waiting for the next block
//! - **Blockchain**: staking, validator selection, block proposal, validity
//!   checks and longest-chain replacement
//!
//! # Example
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use stakechain_chain::{Blockchain, ChainConfig};
//! use stakechain_core::{Keypair, Transaction};
//!
//! let mut chain = Blockchain::new(ChainConfig::default()).unwrap();
//! let alice = Keypair::generate();
//! chain.register_public_key("Alice", alice.public_key.clone());
//!
//! chain.stake("Alice", 60).unwrap();
//! chain
//!     .submit_transaction(Transaction::new("Alice", "Bob", 20).signed(&alice))
//!     .unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(1);
//! let proposal = chain.propose_block(&mut rng).unwrap();
//! assert_eq!(proposal.validator, "Alice");
//! assert_eq!(chain.balance("Bob"), 120);
//! assert!(chain.is_valid());
//! ```

pub mod blockchain;
pub mod config;
pub mod ledger;
pub mod mempool;

// Re-export commonly used types
pub use blockchain::{
    BlockProposal, Blockchain, BlockchainError, BlockchainStats, ChainSnapshot, RejectReason,
    RejectedTransaction, ReplaceOutcome,
};
pub use config::{Allocation, ChainConfig};
pub use ledger::{Ledger, LedgerError};
pub use mempool::{Mempool, MempoolConfig, MempoolError, MempoolStats};
