//! Hierarchical quorum configuration and its flat on-chain encoding.
//!
//! Every multisig contract stores its signer tree as four arrays: signer
//! addresses, the group of each signer, and 32-slot `group_quorums` /
//! `group_parents` tables where slot 0 is the root group. [`QuorumConfig`] is
//! the recursive form callers build and inspect; [`FlatConfig`] is the array
//! form sent to and read back from chains.

use std::collections::BTreeSet;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of group slots in the on-chain config arrays.
pub const MAX_GROUPS: usize = 32;

/// A node of the signer tree.
///
/// A node is satisfied once `quorum` of its direct signers and satisfied
/// child groups have voted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuorumConfig {
    pub quorum: u8,
    pub signers: Vec<Address>,
    #[serde(default)]
    pub group_signers: Vec<QuorumConfig>,
}

impl QuorumConfig {
    /// Builds a validated node with signers in canonical (ascending) order.
    pub fn new(quorum: u8, mut signers: Vec<Address>, group_signers: Vec<Self>) -> Result<Self> {
        signers.sort();
        let config = Self { quorum, signers, group_signers };
        config.validate()?;
        Ok(config)
    }

    /// Number of groups this tree flattens to, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.group_signers.iter().map(Self::node_count).sum::<usize>()
    }

    /// Every signer of the tree in depth-first order.
    pub fn all_signers(&self) -> Vec<Address> {
        let mut out = self.signers.clone();
        for group in &self.group_signers {
            out.extend(group.all_signers());
        }
        out
    }

    /// Checks the structural invariants of the whole tree.
    pub fn validate(&self) -> Result<()> {
        let nodes = self.node_count();
        if nodes > MAX_GROUPS {
            return Err(Error::ConfigTooLarge { nodes });
        }
        self.validate_nodes()?;

        let mut seen = BTreeSet::new();
        for signer in self.all_signers() {
            if !seen.insert(signer) {
                return Err(Error::InvalidConfig(format!("signer {signer} appears more than once")));
            }
        }
        Ok(())
    }

    fn validate_nodes(&self) -> Result<()> {
        if let Some(pair) = self.signers.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(Error::InvalidConfig(format!(
                "signers must be in ascending order, {} precedes {}",
                pair[0], pair[1]
            )));
        }
        if self.quorum == 0 {
            return Err(Error::InvalidConfig("quorum must be greater than 0".into()));
        }
        let voters = self.signers.len() + self.group_signers.len();
        if usize::from(self.quorum) > voters {
            return Err(Error::InvalidConfig(format!(
                "quorum {} exceeds the {voters} signers and groups that can vote",
                self.quorum
            )));
        }
        self.group_signers.iter().try_for_each(Self::validate_nodes)
    }

    /// Whether `signers` jointly satisfy the root quorum.
    pub fn can_set_root(&self, signers: &[Address]) -> bool {
        let direct = self.signers.iter().filter(|signer| signers.contains(signer)).count();
        let groups = self.group_signers.iter().filter(|group| group.can_set_root(signers)).count();
        direct + groups >= usize::from(self.quorum)
    }

    /// Converts the tree into the flat array layout.
    ///
    /// Groups are numbered in depth-first pre-order, so a group's index is
    /// always assigned before any of its children's. Signers are returned in
    /// ascending address order, each paired with its owning group.
    pub fn flatten(&self) -> Result<FlatConfig> {
        self.validate()?;

        let mut quorums = Vec::with_capacity(MAX_GROUPS);
        let mut parents = Vec::with_capacity(MAX_GROUPS);
        let mut signers = Vec::new();
        self.flatten_into(0, &mut quorums, &mut parents, &mut signers);

        let mut group_quorums = [0u8; MAX_GROUPS];
        let mut group_parents = [0u8; MAX_GROUPS];
        group_quorums[..quorums.len()].copy_from_slice(&quorums);
        group_parents[..parents.len()].copy_from_slice(&parents);

        signers.sort_by_key(|(address, _)| *address);
        let (signer_addresses, signer_groups) = signers.into_iter().unzip();

        Ok(FlatConfig { signer_addresses, signer_groups, group_quorums, group_parents })
    }

    fn flatten_into(
        &self,
        parent: u8,
        quorums: &mut Vec<u8>,
        parents: &mut Vec<u8>,
        signers: &mut Vec<(Address, u8)>,
    ) {
        // `validate` bounds the tree to MAX_GROUPS nodes, so indices fit in a u8.
        let index = quorums.len() as u8;
        quorums.push(self.quorum);
        parents.push(parent);
        signers.extend(self.signers.iter().map(|signer| (*signer, index)));
        for group in &self.group_signers {
            group.flatten_into(index, quorums, parents, signers);
        }
    }
}

/// The array form of a [`QuorumConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatConfig {
    pub signer_addresses: Vec<Address>,
    /// Group index of each signer, aligned with `signer_addresses`.
    pub signer_groups: Vec<u8>,
    pub group_quorums: [u8; MAX_GROUPS],
    pub group_parents: [u8; MAX_GROUPS],
}

impl FlatConfig {
    /// Rejects configs with more signers than a chain accepts.
    pub fn ensure_signer_limit(&self, max: usize) -> Result<()> {
        let count = self.signer_addresses.len();
        if count > max {
            return Err(Error::TooManySigners { count, max });
        }
        Ok(())
    }

    /// Rebuilds the signer tree.
    ///
    /// Groups with quorum 0 are unused slots and are dropped. Groups are
    /// attached to their parents from the highest index down, prepending, so
    /// children come back in their original order.
    pub fn unflatten(&self) -> Result<QuorumConfig> {
        if self.signer_addresses.len() != self.signer_groups.len() {
            return Err(Error::InvalidConfig(format!(
                "{} signers but {} signer groups",
                self.signer_addresses.len(),
                self.signer_groups.len()
            )));
        }

        let mut nodes: Vec<QuorumConfig> = self
            .group_quorums
            .iter()
            .map(|quorum| QuorumConfig { quorum: *quorum, ..Default::default() })
            .collect();

        for (signer, group) in self.signer_addresses.iter().zip(&self.signer_groups) {
            let node = nodes
                .get_mut(usize::from(*group))
                .ok_or(Error::GroupIndexOutOfRange { index: *group })?;
            node.signers.push(*signer);
        }
        for node in &mut nodes {
            node.signers.sort();
        }

        if self.group_parents[0] != 0 {
            return Err(Error::InvalidConfig("root group must be its own parent".into()));
        }

        for index in (1..MAX_GROUPS).rev() {
            if nodes[index].quorum == 0 {
                if !nodes[index].signers.is_empty() || !nodes[index].group_signers.is_empty() {
                    return Err(Error::InvalidConfig(format!("group {index} has members but a quorum of 0")));
                }
                continue;
            }

            let parent = usize::from(self.group_parents[index]);
            if parent >= index {
                return Err(Error::InvalidConfig(format!(
                    "group {index} has parent {parent}, parents must precede their children"
                )));
            }
            let node = std::mem::take(&mut nodes[index]);
            nodes[parent].group_signers.insert(0, node);
        }

        let root = std::mem::take(&mut nodes[0]);
        root.validate()?;
        Ok(root)
    }
}

impl TryFrom<&QuorumConfig> for FlatConfig {
    type Error = Error;

    fn try_from(config: &QuorumConfig) -> Result<Self> {
        config.flatten()
    }
}

impl TryFrom<&FlatConfig> for QuorumConfig {
    type Error = Error;

    fn try_from(flat: &FlatConfig) -> Result<Self> {
        flat.unflatten()
    }
}
