use std::{collections::BTreeMap, io::Read, time::Duration};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BaseProposal, Proposal, ProposalKind, read_json, unix_now};
use crate::{
    chain::ChainSelector,
    error::{Error, Result},
    operation::{BatchOperation, ChainMetadata},
    sdk::TimelockConverter,
    timelock::TimelockAction,
};

/// Validity window of a proposal derived from a timelock proposal.
pub const DEFAULT_VALID_UNTIL: Duration = Duration::from_secs(72 * 60 * 60);

/// A proposal whose batches go through a timelock contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelockProposal {
    #[serde(flatten)]
    pub base: BaseProposal,
    pub action: TimelockAction,
    #[serde(default, with = "humantime_serde")]
    pub delay: Duration,
    pub timelock_addresses: BTreeMap<ChainSelector, String>,
    pub operations: Vec<BatchOperation>,
    #[serde(default, rename = "salt", skip_serializing_if = "Option::is_none")]
    pub salt_override: Option<B256>,
}

/// A timelock proposal lowered to multisig operations.
#[derive(Clone, Debug)]
pub struct ConvertedProposal {
    pub proposal: Proposal,
    /// Predecessor of each batch, in batch order.
    pub predecessors: Vec<B256>,
    /// Timelock operation id of each batch, in batch order.
    pub operation_ids: Vec<B256>,
}

impl TimelockProposal {
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let proposal: Self = read_json(reader)?;
        proposal.validate()?;
        Ok(proposal)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| Error::InvalidProposal(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.base.validate(ProposalKind::TimelockProposal)?;
        if self.operations.is_empty() {
            return Err(Error::InvalidProposal("at least one batch is required".into()));
        }
        for batch in &self.operations {
            self.base.metadata_for(batch.chain_selector)?;
            self.timelock_address(batch.chain_selector)?;
            if batch.transactions.is_empty() {
                return Err(Error::InvalidProposal(format!("empty batch for chain {}", batch.chain_selector)));
            }
        }
        Ok(())
    }

    pub fn timelock_address(&self, selector: ChainSelector) -> Result<&str> {
        self.timelock_addresses
            .get(&selector)
            .map(String::as_str)
            .ok_or_else(|| Error::InvalidProposal(format!("missing timelock address for chain {selector}")))
    }

    /// The explicit salt, or `valid_until` big-endian in the first four bytes.
    pub fn salt(&self) -> B256 {
        self.salt_override.unwrap_or_else(|| {
            let mut salt = B256::ZERO;
            salt[..4].copy_from_slice(&self.base.valid_until.to_be_bytes());
            salt
        })
    }

    /// Number of calls per chain across all batches.
    pub fn transaction_counts(&self) -> BTreeMap<ChainSelector, u64> {
        let mut counts: BTreeMap<_, _> = self.base.chain_metadata.keys().map(|sel| (*sel, 0)).collect();
        for batch in &self.operations {
            *counts.entry(batch.chain_selector).or_default() += batch.transactions.len() as u64;
        }
        counts
    }

    /// Lowers every batch through its chain's converter.
    ///
    /// Batches on the same chain are chained: each batch's predecessor is the
    /// operation id of the previous batch on that chain, zero for the first.
    pub fn convert(&self, converters: &BTreeMap<ChainSelector, &dyn TimelockConverter>) -> Result<ConvertedProposal> {
        let salt = self.salt();
        let mut last_id: BTreeMap<ChainSelector, B256> = BTreeMap::new();
        let mut operations = Vec::new();
        let mut predecessors = Vec::with_capacity(self.operations.len());
        let mut operation_ids = Vec::with_capacity(self.operations.len());

        for batch in &self.operations {
            let selector = batch.chain_selector;
            let converter = converters
                .get(&selector)
                .ok_or_else(|| Error::InvalidProposal(format!("no timelock converter for chain {selector}")))?;
            let metadata = self.base.metadata_for(selector)?;
            let predecessor = last_id.get(&selector).copied().unwrap_or_default();

            let (ops, id) = converter.convert_batch_to_chain_operations(
                metadata,
                batch,
                self.timelock_address(selector)?,
                &metadata.mcm_address,
                self.delay,
                self.action,
                predecessor,
                salt,
            )?;
            debug!(%selector, %id, %predecessor, operations = ops.len(), "Converted timelock batch");

            operations.extend(ops);
            predecessors.push(predecessor);
            operation_ids.push(id);
            last_id.insert(selector, id);
        }

        let mut base = self.base.clone();
        base.kind = ProposalKind::Proposal;
        Ok(ConvertedProposal { proposal: Proposal { base, operations }, predecessors, operation_ids })
    }

    /// A proposal that cancels the batches this proposal schedules.
    ///
    /// `metadata` supplies the current state of every chain, since op counts
    /// and, on some chains, contract identities change after execution.
    pub fn derive_cancellation_proposal(&self, metadata: &BTreeMap<ChainSelector, ChainMetadata>) -> Result<Self> {
        self.derive(TimelockAction::Cancel, metadata)
    }

    /// A proposal that runs the batches of this proposal without delay.
    pub fn derive_bypass_proposal(&self, metadata: &BTreeMap<ChainSelector, ChainMetadata>) -> Result<Self> {
        self.derive(TimelockAction::Bypass, metadata)
    }

    fn derive(&self, action: TimelockAction, metadata: &BTreeMap<ChainSelector, ChainMetadata>) -> Result<Self> {
        if self.action != TimelockAction::Schedule {
            return Err(Error::InvalidProposal(format!("cannot derive a {action} proposal from a {} proposal", self.action)));
        }

        let valid_until = unix_now()? + DEFAULT_VALID_UNTIL.as_secs();
        let valid_until = u32::try_from(valid_until)
            .map_err(|_| Error::InvalidProposal(format!("valid until {valid_until} exceeds u32")))?;

        let mut derived = self.clone();
        derived.base.signatures.clear();
        derived.base.valid_until = valid_until;
        derived.salt_override = Some(self.salt());
        derived.action = action;
        for (selector, slot) in &mut derived.base.chain_metadata {
            *slot = metadata
                .get(selector)
                .cloned()
                .ok_or_else(|| Error::InvalidProposal(format!("missing chain metadata for chain {selector}")))?;
        }

        info!(%action, valid_until, "Derived timelock proposal");
        Ok(derived)
    }
}
