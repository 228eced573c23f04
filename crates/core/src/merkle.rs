//! Binary Merkle tree over metadata and operation leaves.
//!
//! Leaves are ordered bytewise and pairs are hashed in sorted order, so a
//! proof is just the list of sibling hashes. A layer with an odd number of
//! nodes duplicates its last node.

use alloy_primitives::{B256, keccak256};

use crate::error::{Error, Result};

/// `keccak256(min(a, b) ‖ max(a, b))`.
pub fn hash_pair(a: B256, b: B256) -> B256 {
    let (left, right) = if a <= b { (a, b) } else { (b, a) };
    keccak256([left.as_slice(), right.as_slice()].concat())
}

/// A fully materialized tree, leaves first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<B256>>,
}

impl MerkleTree {
    pub fn new(mut leaves: Vec<B256>) -> Self {
        leaves.sort();

        let mut layers = Vec::new();
        let mut current = leaves;
        while current.len() > 1 {
            if current.len() % 2 == 1 {
                // Odd number of nodes, duplicate the last one.
                let last = current[current.len() - 1];
                current.push(last);
            }
            let next = current.chunks_exact(2).map(|pair| hash_pair(pair[0], pair[1])).collect();
            layers.push(current);
            current = next;
        }
        layers.push(current);

        Self { layers }
    }

    /// The root, or the zero hash for an empty tree.
    pub fn root(&self) -> B256 {
        self.layers.last().and_then(|top| top.first()).copied().unwrap_or_default()
    }

    pub fn leaves(&self) -> &[B256] {
        &self.layers[0]
    }

    /// Sibling hashes from `leaf` up to the root.
    pub fn proof(&self, leaf: B256) -> Result<Vec<B256>> {
        let mut proof = Vec::with_capacity(self.layers.len().saturating_sub(1));
        let mut target = leaf;

        for layer in &self.layers[..self.layers.len() - 1] {
            let index = layer
                .iter()
                .position(|node| *node == target)
                .ok_or_else(|| Error::InvalidProposal(format!("leaf {leaf} is not part of the tree")))?;
            let sibling = layer[index ^ 1];
            proof.push(sibling);
            target = hash_pair(target, sibling);
        }

        if self.layers.len() == 1 && !self.layers[0].contains(&leaf) {
            return Err(Error::InvalidProposal(format!("leaf {leaf} is not part of the tree")));
        }
        Ok(proof)
    }

    /// Whether `proof` connects `leaf` to `root`.
    pub fn verify(root: B256, leaf: B256, proof: &[B256]) -> bool {
        proof.iter().fold(leaf, |acc, sibling| hash_pair(acc, *sibling)) == root
    }
}
