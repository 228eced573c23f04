use std::collections::BTreeMap;

use alloy_primitives::B256;
use mcms_core::{ChainSelector, Encoders, Error, Executor, Proposal, Result, Signature, TransactionResult};
use tracing::info;

use crate::adapters::Chains;

/// A signed proposal being carried out chain by chain.
///
/// Proofs are computed once up front. When a call re-creates the multisig
/// contract, later calls on that chain address the successor.
pub struct Executable {
    proposal: Proposal,
    root: B256,
    sorted_signatures: Vec<Signature>,
    nonces: Vec<u64>,
    operation_proofs: Vec<Vec<B256>>,
    metadata_proofs: BTreeMap<ChainSelector, Vec<B256>>,
    executors: BTreeMap<ChainSelector, Box<dyn Executor>>,
}

impl Executable {
    pub fn new(
        proposal: Proposal,
        encoders: &Encoders,
        executors: BTreeMap<ChainSelector, Box<dyn Executor>>,
    ) -> Result<Self> {
        let tree = proposal.merkle_tree(encoders)?;
        let hash = proposal.signing_hash(encoders)?;

        let mut signed = proposal
            .base
            .signatures
            .iter()
            .map(|signature| Ok((signature.recover_signer(hash)?, *signature)))
            .collect::<Result<Vec<_>>>()?;
        signed.sort_by_key(|(signer, _)| *signer);

        let operation_proofs = (0..proposal.operations.len())
            .map(|index| proposal.operation_proof(&tree, encoders, index))
            .collect::<Result<_>>()?;
        let metadata_proofs = proposal
            .chain_selectors()
            .into_iter()
            .map(|selector| Ok((selector, proposal.metadata_proof(&tree, encoders, selector)?)))
            .collect::<Result<_>>()?;

        Ok(Self {
            root: tree.root(),
            sorted_signatures: signed.into_iter().map(|(_, signature)| signature).collect(),
            nonces: proposal.transaction_nonces()?,
            operation_proofs,
            metadata_proofs,
            executors,
            proposal,
        })
    }

    pub fn from_chains(proposal: Proposal, chains: &Chains) -> Result<Self> {
        let params = proposal.encoder_params();
        let encoders = chains.encoders(&params)?;
        let executors = chains.executors(&params)?;
        Self::new(proposal, &encoders, executors)
    }

    /// The proposal, with multisig addresses as of the last call.
    pub fn proposal(&self) -> &Proposal {
        &self.proposal
    }

    pub const fn root(&self) -> B256 {
        self.root
    }

    /// The contract nonce operation `index` executes at.
    pub fn nonce(&self, index: usize) -> Result<u64> {
        self.nonces.get(index).copied().ok_or_else(|| out_of_range(index))
    }

    fn executor(&self, selector: ChainSelector) -> Result<&dyn Executor> {
        self.executors.get(&selector).map(|executor| executor.as_ref()).ok_or(Error::UnknownChainSelector(selector))
    }

    /// Sets the proposal's root on `selector`'s multisig.
    pub async fn set_root(&mut self, selector: ChainSelector) -> Result<TransactionResult> {
        let metadata = self.proposal.base.metadata_for(selector)?;
        let proof = self.metadata_proofs.get(&selector).ok_or(Error::UnknownChainSelector(selector))?;
        let result = self
            .executor(selector)?
            .set_root(metadata, proof, self.root, self.proposal.base.valid_until, &self.sorted_signatures)
            .await?;

        info!(chain_selector = %selector, tx_hash = %result.hash, root = %self.root, "Root set");
        self.follow(selector, &result)?;
        Ok(result)
    }

    /// Executes operation `index` at its nonce.
    pub async fn execute(&mut self, index: usize) -> Result<TransactionResult> {
        let op = self.proposal.operations.get(index).ok_or_else(|| out_of_range(index))?;
        let selector = op.chain_selector;
        let metadata = self.proposal.base.metadata_for(selector)?;
        let nonce = self.nonce(index)?;
        let nonce = u32::try_from(nonce).map_err(|_| Error::InvalidProposal(format!("nonce {nonce} exceeds u32")))?;
        let result =
            self.executor(selector)?.execute_operation(metadata, nonce, &self.operation_proofs[index], op).await?;

        info!(chain_selector = %selector, tx_hash = %result.hash, index, nonce, "Operation executed");
        self.follow(selector, &result)?;
        Ok(result)
    }

    fn follow(&mut self, selector: ChainSelector, result: &TransactionResult) -> Result<()> {
        let Some(metadata) = self.proposal.base.chain_metadata.get_mut(&selector) else { return Ok(()) };
        let Some(next) = result.successor(&metadata.mcm_address)? else { return Ok(()) };
        info!(
            chain_selector = %selector,
            previous = %metadata.mcm_address,
            next = %next.contract_id,
            "Multisig re-created"
        );
        metadata.mcm_address.clone_from(&next.contract_id);
        Ok(())
    }
}

fn out_of_range(index: usize) -> Error {
    Error::InvalidProposal(format!("operation {index} out of range"))
}
