//! In-process replication for stakechain.
//!
//! Each [`Node`] owns one [`stakechain_chain::Blockchain`] behind a
//! `parking_lot::RwLock`. A [`NodeNetwork`] holds the nodes and applies the
//! longest-chain rule when a node announces a new block. There is no
//! transport: chains are handed over by value.
//!
//! # Example
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use stakechain_chain::ChainConfig;
//! use stakechain_network::NodeNetwork;
//!
//! let network = NodeNetwork::with_nodes(3, &ChainConfig::default()).unwrap();
//! network.stake_everywhere("Alice", 50).unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! network.propose(0, &mut rng).unwrap();
//! assert!(network.is_converged());
//! ```

pub mod network;
pub mod node;

pub use network::{BroadcastReport, NetworkError, NodeNetwork};
pub use node::{Node, NodeId};
