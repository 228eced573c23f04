use std::collections::BTreeMap;

use alloy_primitives::B256;
use mcms_core::{
    ChainSelector, Error, OperationState, Result, TimelockConverter, TimelockExecutor, TimelockInspector,
    TimelockProposal, TransactionResult,
};
use tracing::{debug, info};

use crate::adapters::Chains;

/// Executes the batches of a scheduled timelock proposal once their delay
/// has passed.
pub struct TimelockExecutable<'a> {
    proposal: TimelockProposal,
    salt: B256,
    predecessors: Vec<B256>,
    operation_ids: Vec<B256>,
    inspectors: BTreeMap<ChainSelector, &'a dyn TimelockInspector>,
    executors: BTreeMap<ChainSelector, &'a dyn TimelockExecutor>,
}

impl<'a> TimelockExecutable<'a> {
    /// Derives each batch's predecessor and operation id with `converters`.
    pub fn new(
        proposal: TimelockProposal,
        converters: &BTreeMap<ChainSelector, &dyn TimelockConverter>,
        inspectors: BTreeMap<ChainSelector, &'a dyn TimelockInspector>,
        executors: BTreeMap<ChainSelector, &'a dyn TimelockExecutor>,
    ) -> Result<Self> {
        let converted = proposal.convert(converters)?;
        Ok(Self {
            salt: proposal.salt(),
            predecessors: converted.predecessors,
            operation_ids: converted.operation_ids,
            proposal,
            inspectors,
            executors,
        })
    }

    pub fn from_chains(proposal: TimelockProposal, chains: &'a Chains) -> Result<Self> {
        Self::new(proposal, &chains.timelock_converters(), chains.timelock_inspectors(), chains.timelock_executors())
    }

    /// The proposal, with timelock addresses as of the last execution.
    pub fn proposal(&self) -> &TimelockProposal {
        &self.proposal
    }

    pub fn operation_id(&self, index: usize) -> Result<B256> {
        self.operation_ids.get(index).copied().ok_or_else(|| out_of_range(index))
    }

    pub fn predecessor(&self, index: usize) -> Result<B256> {
        self.predecessors.get(index).copied().ok_or_else(|| out_of_range(index))
    }

    /// Fails unless every batch on `selector` can be executed now.
    pub async fn is_ready(&self, selector: ChainSelector) -> Result<()> {
        let inspector = self.inspectors.get(&selector).ok_or(Error::UnknownChainSelector(selector))?;
        let address = self.proposal.timelock_address(selector)?;
        let ids = self.proposal.operations.iter().zip(&self.operation_ids);
        for (_, id) in ids.filter(|(batch, _)| batch.chain_selector == selector) {
            let state = OperationState::fetch(*inspector, address, *id).await?;
            debug!(chain_selector = %selector, %id, ?state, "Timelock operation state");
            state.ensure_executable(*id)?;
        }
        Ok(())
    }

    /// Executes batch `index` with its predecessor and the proposal's salt.
    pub async fn execute(&mut self, index: usize) -> Result<TransactionResult> {
        let batch = self.proposal.operations.get(index).ok_or_else(|| out_of_range(index))?;
        let selector = batch.chain_selector;
        let executor = self.executors.get(&selector).ok_or(Error::UnknownChainSelector(selector))?;
        let address = self.proposal.timelock_address(selector)?;
        let predecessor = self.predecessor(index)?;
        let result = executor.execute(batch, address, predecessor, self.salt).await?;

        info!(chain_selector = %selector, tx_hash = %result.hash, index, %predecessor, "Timelock batch executed");
        self.follow(selector, &result)?;
        Ok(result)
    }

    /// Moves the chain onto the successor contract. A multisig that is also
    /// the timelock moves with it.
    fn follow(&mut self, selector: ChainSelector, result: &TransactionResult) -> Result<()> {
        let Some(address) = self.proposal.timelock_addresses.get_mut(&selector) else { return Ok(()) };
        let Some(next) = result.successor(address.as_str())? else { return Ok(()) };
        info!(chain_selector = %selector, previous = %address, next = %next.contract_id, "Timelock re-created");

        if let Some(metadata) = self.proposal.base.chain_metadata.get_mut(&selector)
            && metadata.mcm_address == *address
        {
            metadata.mcm_address.clone_from(&next.contract_id);
        }
        address.clone_from(&next.contract_id);
        Ok(())
    }
}

fn out_of_range(index: usize) -> Error {
    Error::InvalidProposal(format!("batch {index} out of range"))
}
