//! Proof of Stake consensus for stakechain.
//!
//! This crate provides:
//! - The stake table (accounts locking funds for validator eligibility)
//! - Stake-weighted random validator selection
//! - Chain validity checking (linkage and digest recomputation)
//!
//! # Example
//!
//! ```rust
//! use stakechain_consensus::{select_with_draw, select_with_ticket, StakeTable};
//!
//! let mut stakes = StakeTable::new();
//! stakes.deposit("A", 10).unwrap();
//! stakes.deposit("B", 30).unwrap();
//!
//! // cumulative: A = 10 < 15, A + B = 40 >= 15
//! assert_eq!(select_with_draw(&stakes, 15.0).unwrap(), "B");
//! // A holds tickets 0..10, B holds 10..40
//! assert_eq!(select_with_ticket(&stakes, 10).unwrap(), "B");
//! ```

pub mod pos;
pub mod stake;
pub mod validator;

// Re-export commonly used types
pub use pos::{select_validator, select_with_draw, select_with_ticket, ConsensusError};
pub use stake::{StakeEntry, StakeTable};
pub use validator::{ChainValidator, ValidationError};
