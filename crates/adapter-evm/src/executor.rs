use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use mcms_core::{
    ChainFamily, ChainMetadata, Encoder, Error, Executor, Operation, QuorumConfig, Result, Signature,
    TransactionResult, cache::ContractCache, metrics::AdapterMetrics, signature::recover_sorted_signers,
};
use serde_json::json;
use tracing::info;

use crate::{
    bindings::ManyChainMultiSig::{self, executeCall, setRootCall},
    client::{EvmClient, parse_address, submit},
    encoder::EvmEncoder,
};

/// Sets roots and executes operations on a `ManyChainMultiSig` contract.
pub struct EvmExecutor {
    encoder: EvmEncoder,
    client: Arc<dyn EvmClient>,
    cache: Option<Arc<ContractCache<QuorumConfig>>>,
    metrics: AdapterMetrics,
}

impl EvmExecutor {
    pub fn new(encoder: EvmEncoder, client: Arc<dyn EvmClient>) -> Self {
        Self { encoder, client, cache: None, metrics: AdapterMetrics::new(ChainFamily::Evm) }
    }

    pub fn with_cache(mut self, cache: Arc<ContractCache<QuorumConfig>>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn invalidate(&self, mcm_address: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(mcm_address);
        }
    }
}

#[async_trait]
impl Executor for EvmExecutor {
    async fn execute_operation(
        &self,
        metadata: &ChainMetadata,
        nonce: u32,
        proof: &[B256],
        op: &Operation,
    ) -> Result<TransactionResult> {
        let mcm = parse_address(&metadata.mcm_address)?;
        let op = self.encoder.op(nonce, mcm, op)?;
        let to = op.to;

        let call = executeCall { op, proof: proof.to_vec() };
        let hash = submit(self.client.as_ref(), &self.metrics, mcm, call, "execute").await?;
        self.invalidate(&metadata.mcm_address);

        info!(chain_selector = %self.encoder.chain_selector, %mcm, nonce, %to, tx_hash = %hash, "Operation executed");
        Ok(TransactionResult::new(hash.to_string(), ChainFamily::Evm).with_raw_data(json!({ "nonce": nonce })))
    }

    async fn set_root(
        &self,
        metadata: &ChainMetadata,
        proof: &[B256],
        root: B256,
        valid_until: u32,
        sorted_signatures: &[Signature],
    ) -> Result<TransactionResult> {
        let mcm = parse_address(&metadata.mcm_address)?;
        let root_metadata = self.encoder.root_metadata(metadata)?;
        let signing_hash = self.encoder.signing_hash(root, valid_until);
        recover_sorted_signers(sorted_signatures, signing_hash)?;

        let now = self.client.latest_block_timestamp().await.map_err(|err| Error::query("latest_block_timestamp", err))?;
        if u64::from(valid_until) <= now {
            return Err(Error::InvalidProposal(format!("root expired at {valid_until}, chain time is {now}")));
        }

        let call = setRootCall {
            root,
            validUntil: valid_until,
            metadata: root_metadata,
            metadataProof: proof.to_vec(),
            signatures: sorted_signatures
                .iter()
                .map(|sig| ManyChainMultiSig::Signature { v: sig.v, r: sig.r, s: sig.s })
                .collect(),
        };
        let hash = submit(self.client.as_ref(), &self.metrics, mcm, call, "set_root").await?;
        self.invalidate(&metadata.mcm_address);

        info!(chain_selector = %self.encoder.chain_selector, %mcm, %root, valid_until, tx_hash = %hash, "Root set");
        Ok(TransactionResult::new(hash.to_string(), ChainFamily::Evm))
    }
}
