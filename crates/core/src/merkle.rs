//! Merkle aggregation of transaction digests.
//!
//! The tree is structural, not sorted: leaves keep their block order, and an
//! odd level is padded by duplicating its last digest before pairing.

use crate::hash::{hash_concat, Hash};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a merkle root over zero leaves")]
    NoLeaves,
}

/// Reduce one level: pad odd levels with a copy of the last digest, then
/// hash each adjacent pair.
fn next_level(level: &[Hash]) -> Vec<Hash> {
    let mut padded = level.to_vec();
    if padded.len() % 2 == 1 {
        let last = padded[padded.len() - 1];
        padded.push(last);
    }
    padded
        .chunks(2)
        .map(|pair| hash_concat(&[pair[0].as_ref(), pair[1].as_ref()]))
        .collect()
}

/// Compute the merkle root of an ordered list of digests.
///
/// A single leaf is its own root.
pub fn merkle_root(leaves: &[Hash]) -> Result<Hash, MerkleError> {
    if leaves.is_empty() {
        return Err(MerkleError::NoLeaves);
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    Ok(level[0])
}

/// A merkle tree that keeps every level, for inclusion proofs.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// Levels from leaves (index 0) to root.
    levels: Vec<Vec<Hash>>,
}

/// Proof that a leaf is included under some root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf: Hash,
    /// Sibling digests from leaf to root.
    pub siblings: Vec<Hash>,
    /// For each sibling, whether the proven node sits on the left of the pair.
    pub on_left: Vec<bool>,
}

impl MerkleTree {
    pub fn new(leaves: &[Hash]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::NoLeaves);
        }

        let mut levels = vec![leaves.to_vec()];
        while levels[levels.len() - 1].len() > 1 {
            let next = next_level(&levels[levels.len() - 1]);
            levels.push(next);
        }
        Ok(Self { levels })
    }

    pub fn root(&self) -> Hash {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Build the inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.levels.len() - 1);
        let mut on_left = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let left = idx % 2 == 0;
            let sibling_idx = if left { idx + 1 } else { idx - 1 };
            // Padded position: the last node was paired with itself.
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            siblings.push(sibling);
            on_left.push(left);
            idx /= 2;
        }

        Some(MerkleProof {
            leaf: self.levels[0][index],
            siblings,
            on_left,
        })
    }
}

/// Verify a merkle proof against a given root.
pub fn verify_proof(root: &Hash, proof: &MerkleProof) -> bool {
    if proof.siblings.len() != proof.on_left.len() {
        return false;
    }

    let computed = proof
        .siblings
        .iter()
        .zip(&proof.on_left)
        .fold(proof.leaf, |node, (sibling, left)| {
            if *left {
                hash_concat(&[node.as_ref(), sibling.as_ref()])
            } else {
                hash_concat(&[sibling.as_ref(), node.as_ref()])
            }
        });

    computed == *root
}
