//! Proposals: the signed unit that authorizes operations across chains.

mod timelock;

pub use timelock::{ConvertedProposal, DEFAULT_VALID_UNTIL, TimelockProposal};

use std::{
    collections::{BTreeMap, BTreeSet},
    io::Read,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    chain::ChainSelector,
    error::{Error, Result},
    merkle::MerkleTree,
    operation::{ChainMetadata, Operation},
    sdk::Encoder,
    signature::Signature,
};

/// Most signatures one root can carry; chains count them in a `u8`.
pub const MAX_SIGNATURES: usize = u8::MAX as usize;

/// Encoders for every chain of a proposal, keyed by selector.
pub type Encoders = BTreeMap<ChainSelector, Box<dyn Encoder>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalKind {
    Proposal,
    TimelockProposal,
}

/// Inputs an encoder needs beyond the operation itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderParams {
    /// Number of operations the proposal carries for the chain.
    pub tx_count: u64,
    pub override_previous_root: bool,
}

/// Fields shared by plain and timelock proposals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseProposal {
    pub version: String,
    pub kind: ProposalKind,
    /// Unix seconds after which the root can no longer be set.
    pub valid_until: u32,
    #[serde(default)]
    pub signatures: Vec<Signature>,
    #[serde(default)]
    pub override_previous_root: bool,
    pub chain_metadata: BTreeMap<ChainSelector, ChainMetadata>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl BaseProposal {
    fn validate(&self, kind: ProposalKind) -> Result<()> {
        if self.kind != kind {
            return Err(Error::InvalidProposal(format!("expected kind {kind:?}, got {:?}", self.kind)));
        }
        if self.version.is_empty() {
            return Err(Error::InvalidProposal("version is required".into()));
        }
        if self.chain_metadata.is_empty() {
            return Err(Error::InvalidProposal("chain metadata is required".into()));
        }
        if u64::from(self.valid_until) <= unix_now()? {
            return Err(Error::InvalidProposal(format!("proposal expired at {}", self.valid_until)));
        }
        if self.signatures.len() > MAX_SIGNATURES {
            return Err(Error::InvalidProposal(format!(
                "{} signatures, at most {MAX_SIGNATURES} fit one root",
                self.signatures.len()
            )));
        }
        Ok(())
    }

    pub fn metadata_for(&self, selector: ChainSelector) -> Result<&ChainMetadata> {
        self.chain_metadata
            .get(&selector)
            .ok_or_else(|| Error::InvalidProposal(format!("missing chain metadata for chain {selector}")))
    }
}

/// A batch of multisig operations across chains, authorized by one root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    #[serde(flatten)]
    pub base: BaseProposal,
    pub operations: Vec<Operation>,
}

impl Proposal {
    /// Reads and validates a proposal from JSON.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let proposal: Self = read_json(reader)?;
        proposal.validate()?;
        Ok(proposal)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| Error::InvalidProposal(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.base.validate(ProposalKind::Proposal)?;
        if self.operations.is_empty() {
            return Err(Error::InvalidProposal("at least one operation is required".into()));
        }
        for op in &self.operations {
            self.base.metadata_for(op.chain_selector)?;
        }
        Ok(())
    }

    pub fn chain_selectors(&self) -> Vec<ChainSelector> {
        self.base.chain_metadata.keys().copied().collect()
    }

    /// Number of operations per chain. Chains without operations count 0.
    pub fn transaction_counts(&self) -> BTreeMap<ChainSelector, u64> {
        let mut counts: BTreeMap<_, _> = self.base.chain_metadata.keys().map(|sel| (*sel, 0)).collect();
        for op in &self.operations {
            *counts.entry(op.chain_selector).or_default() += 1;
        }
        counts
    }

    /// Encoder inputs per chain.
    pub fn encoder_params(&self) -> BTreeMap<ChainSelector, EncoderParams> {
        self.transaction_counts()
            .into_iter()
            .map(|(selector, tx_count)| {
                (selector, EncoderParams { tx_count, override_previous_root: self.base.override_previous_root })
            })
            .collect()
    }

    /// The contract nonce each operation executes at: its position among
    /// the proposal's operations on the same chain plus the chain's
    /// starting op count.
    pub fn transaction_nonces(&self) -> Result<Vec<u64>> {
        let mut next: BTreeMap<ChainSelector, u64> = BTreeMap::new();
        self.operations
            .iter()
            .map(|op| {
                let metadata = self.base.metadata_for(op.chain_selector)?;
                let local = next.entry(op.chain_selector).or_default();
                let nonce = metadata.op_count_after(*local)?;
                *local += 1;
                Ok(nonce)
            })
            .collect()
    }

    fn metadata_leaf(&self, encoders: &Encoders, selector: ChainSelector) -> Result<B256> {
        encoder_for(encoders, selector)?.hash_metadata(self.base.metadata_for(selector)?)
    }

    fn operation_leaf(&self, encoders: &Encoders, index: usize, nonce: u64) -> Result<B256> {
        let op = self
            .operations
            .get(index)
            .ok_or_else(|| Error::InvalidProposal(format!("operation {index} out of range")))?;
        let metadata = self.base.metadata_for(op.chain_selector)?;
        let nonce = u32::try_from(nonce).map_err(|_| Error::InvalidProposal(format!("nonce {nonce} exceeds u32")))?;
        encoder_for(encoders, op.chain_selector)?.hash_operation(nonce, metadata, op)
    }

    /// Builds the tree over every metadata leaf and operation leaf.
    pub fn merkle_tree(&self, encoders: &Encoders) -> Result<MerkleTree> {
        let mut leaves = Vec::with_capacity(self.base.chain_metadata.len() + self.operations.len());
        for selector in self.base.chain_metadata.keys() {
            leaves.push(self.metadata_leaf(encoders, *selector)?);
        }
        for (index, nonce) in self.transaction_nonces()?.into_iter().enumerate() {
            leaves.push(self.operation_leaf(encoders, index, nonce)?);
        }

        let tree = MerkleTree::new(leaves);
        debug!(root = %tree.root(), leaves = tree.leaves().len(), "Built proposal merkle tree");
        Ok(tree)
    }

    /// The hash every signer of this proposal signs.
    ///
    /// Fails when the chains of the proposal disagree on the signing scheme.
    pub fn signing_hash(&self, encoders: &Encoders) -> Result<B256> {
        let root = self.merkle_tree(encoders)?.root();
        let hashes: BTreeSet<B256> = self
            .base
            .chain_metadata
            .keys()
            .map(|selector| Ok(encoder_for(encoders, *selector)?.signing_hash(root, self.base.valid_until)))
            .collect::<Result<_>>()?;

        let mut hashes = hashes.into_iter();
        match (hashes.next(), hashes.next()) {
            (Some(hash), None) => Ok(hash),
            (None, _) => Err(Error::InvalidProposal("proposal has no chains".into())),
            (Some(_), Some(_)) => {
                Err(Error::InvalidProposal("chains in this proposal sign different hashes".into()))
            }
        }
    }

    pub fn operation_proof(&self, tree: &MerkleTree, encoders: &Encoders, index: usize) -> Result<Vec<B256>> {
        let nonce = *self
            .transaction_nonces()?
            .get(index)
            .ok_or_else(|| Error::InvalidProposal(format!("operation {index} out of range")))?;
        tree.proof(self.operation_leaf(encoders, index, nonce)?)
    }

    pub fn metadata_proof(&self, tree: &MerkleTree, encoders: &Encoders, selector: ChainSelector) -> Result<Vec<B256>> {
        tree.proof(self.metadata_leaf(encoders, selector)?)
    }

    pub fn append_signature(&mut self, signature: Signature) {
        self.base.signatures.push(signature);
    }
}

pub(crate) fn encoder_for(encoders: &Encoders, selector: ChainSelector) -> Result<&dyn Encoder> {
    encoders
        .get(&selector)
        .map(|encoder| encoder.as_ref())
        .ok_or_else(|| Error::InvalidProposal(format!("no encoder for chain {selector}")))
}

pub(crate) fn read_json<T: DeserializeOwned>(reader: impl Read) -> Result<T> {
    serde_json::from_reader(reader).map_err(|err| Error::InvalidProposal(err.to_string()))
}

pub(crate) fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|err| Error::InvalidProposal(err.to_string()))
}
