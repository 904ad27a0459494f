//! A set of replicas and the longest-chain replication rule.
//!
//! Nodes exchange whole chains. A node adopts an offered chain only when it
//! is valid, shares its genesis and is strictly longer than its own, so the
//! state every node ends up in does not depend on delivery order.

use crate::node::{Node, NodeId};
use rand::Rng;
use serde::Serialize;
use stakechain_chain::{BlockProposal, BlockchainError, ChainConfig, ChainSnapshot, ReplaceOutcome};
use stakechain_core::{Block, Hash, PublicKey, Transaction};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {node}: {source}")]
    Node {
        node: NodeId,
        #[source]
        source: BlockchainError,
    },
}

pub type Result<T> = std::result::Result<T, NetworkError>;

trait NodeResultExt<T> {
    fn on_node(self, node: NodeId) -> Result<T>;
}

impl<T> NodeResultExt<T> for std::result::Result<T, BlockchainError> {
    fn on_node(self, node: NodeId) -> Result<T> {
        self.map_err(|source| NetworkError::Node { node, source })
    }
}

/// What happened when a chain was offered to the other nodes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BroadcastReport {
    pub origin: NodeId,
    pub chain_len: usize,
    pub replaced: Vec<NodeId>,
    pub ignored: Vec<NodeId>,
    pub rejected: Vec<(NodeId, String)>,
}

pub struct NodeNetwork {
    nodes: Vec<Arc<Node>>,
}

impl NodeNetwork {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// `count` nodes sharing one configuration, and so one genesis block.
    pub fn with_nodes(count: usize, config: &ChainConfig) -> Result<Self> {
        let mut network = Self::new();
        for _ in 0..count {
            network.add_node(config.clone())?;
        }
        Ok(network)
    }

    pub fn add_node(&mut self, config: ChainConfig) -> Result<NodeId> {
        let id = self.nodes.len();
        let node = Node::new(id, config).on_node(id)?;
        self.nodes.push(Arc::new(node));
        debug!(node = id, "Node added");
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Arc<Node>> {
        self.nodes.get(id).ok_or(NetworkError::UnknownNode(id))
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Announce `block`, newly appended on `origin`, by offering the origin's
    /// full chain to every node whose chain is shorter.
    pub fn broadcast(&self, block: &Block, origin: NodeId) -> Result<BroadcastReport> {
        debug!(origin, height = block.height(), hash = %block.hash.short(), "Broadcasting block");
        self.sync_from(origin)
    }

    /// Offer `origin`'s current chain to every other node.
    pub fn sync_from(&self, origin: NodeId) -> Result<BroadcastReport> {
        let candidate = self.node(origin)?.blocks();
        let mut report = BroadcastReport {
            origin,
            chain_len: candidate.len(),
            ..BroadcastReport::default()
        };

        for node in self.nodes.iter().filter(|n| n.id() != origin) {
            if node.len() >= candidate.len() {
                report.ignored.push(node.id());
                continue;
            }

            match node.receive_chain(candidate.clone()) {
                Ok(ReplaceOutcome::Replaced { .. }) => report.replaced.push(node.id()),
                Ok(ReplaceOutcome::Ignored { .. }) => report.ignored.push(node.id()),
                Err(err) => {
                    warn!(origin, node = node.id(), error = %err, "Chain rejected");
                    report.rejected.push((node.id(), err.to_string()));
                }
            }
        }

        info!(
            origin,
            len = report.chain_len,
            replaced = report.replaced.len(),
            ignored = report.ignored.len(),
            rejected = report.rejected.len(),
            "Chain broadcast"
        );
        Ok(report)
    }

    /// Propose a block on `origin` and broadcast it.
    pub fn propose<R: Rng + ?Sized>(
        &self,
        origin: NodeId,
        rng: &mut R,
    ) -> Result<(BlockProposal, BroadcastReport)> {
        let proposal = self.node(origin)?.propose(rng).on_node(origin)?;
        let report = self.broadcast(&proposal.block, origin)?;
        Ok((proposal, report))
    }

    pub fn submit_to(&self, node: NodeId, tx: Transaction) -> Result<Hash> {
        self.node(node)?.submit_transaction(tx).on_node(node)
    }

    /// Apply the same stake on every node.
    ///
    /// Stake is local to each node, so it is replicated here rather than
    /// through the chain. All nodes are checked before any is changed.
    pub fn stake_everywhere(&self, account: &str, amount: u64) -> Result<()> {
        for node in &self.nodes {
            let available = node.balance(account);
            let covered = i64::try_from(amount).map_or(false, |a| available >= a);
            if !covered {
                return Err(NetworkError::Node {
                    node: node.id(),
                    source: BlockchainError::InsufficientBalance {
                        account: account.to_string(),
                        required: amount,
                        available,
                    },
                });
            }
            if let Err(e) = node.read().stakes().check_deposit(account, amount) {
                return Err(NetworkError::Node {
                    node: node.id(),
                    source: e.into(),
                });
            }
        }

        for node in &self.nodes {
            node.stake(account, amount).on_node(node.id())?;
        }
        Ok(())
    }

    pub fn register_public_key_everywhere(&self, account: &str, public_key: &PublicKey) {
        for node in &self.nodes {
            node.register_public_key(account, public_key.clone());
        }
    }

    /// Each node's tip digest and chain length.
    pub fn tips(&self) -> Vec<(NodeId, Hash, usize)> {
        self.nodes
            .iter()
            .map(|n| {
                let chain = n.read();
                (n.id(), chain.latest_block().hash, chain.len())
            })
            .collect()
    }

    /// Whether every node has the same tip.
    pub fn is_converged(&self) -> bool {
        let tips = self.tips();
        tips.windows(2).all(|w| w[0].1 == w[1].1)
    }

    /// Id of the node holding the longest chain; the lowest id wins ties.
    pub fn longest(&self) -> Option<NodeId> {
        self.tips()
            .into_iter()
            .max_by(|a, b| a.2.cmp(&b.2).then(b.0.cmp(&a.0)))
            .map(|(id, _, _)| id)
    }

    pub fn snapshot(&self, node: NodeId) -> Result<ChainSnapshot> {
        Ok(self.node(node)?.snapshot())
    }
}

impl Default for NodeNetwork {
    fn default() -> Self {
        Self::new()
    }
}
