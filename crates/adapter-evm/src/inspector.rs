use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use mcms_core::{ChainMetadata, FlatConfig, Inspector, QuorumConfig, Result, cache::ContractCache};
use tracing::debug;

use crate::{
    bindings::ManyChainMultiSig::{getConfigCall, getOpCountCall, getRootCall, getRootMetadataCall},
    client::{EvmClient, parse_address, view},
};

/// Reads multisig state through view calls.
pub struct EvmInspector {
    client: Arc<dyn EvmClient>,
    cache: Arc<ContractCache<QuorumConfig>>,
}

impl EvmInspector {
    pub fn new(client: Arc<dyn EvmClient>) -> Self {
        Self { client, cache: Arc::default() }
    }

    /// Shares a config cache with the mutating adapters of the same contract.
    pub fn with_cache(mut self, cache: Arc<ContractCache<QuorumConfig>>) -> Self {
        self.cache = cache;
        self
    }

    async fn fetch_config(&self, mcm_address: &str) -> Result<QuorumConfig> {
        let mcm = parse_address(mcm_address)?;
        let config = view(self.client.as_ref(), mcm, getConfigCall {}, "getConfig").await?;
        let flat = FlatConfig {
            signer_addresses: config.signers.iter().map(|signer| signer.addr).collect(),
            signer_groups: config.signers.iter().map(|signer| signer.group).collect(),
            group_quorums: config.groupQuorums,
            group_parents: config.groupParents,
        };
        debug!(%mcm, signers = flat.signer_addresses.len(), "Fetched multisig config");
        flat.unflatten()
    }
}

#[async_trait]
impl Inspector for EvmInspector {
    async fn get_config(&self, mcm_address: &str) -> Result<QuorumConfig> {
        self.cache.get_or_fetch(mcm_address, || self.fetch_config(mcm_address)).await
    }

    async fn get_op_count(&self, mcm_address: &str) -> Result<u64> {
        view(self.client.as_ref(), parse_address(mcm_address)?, getOpCountCall {}, "getOpCount").await.map(|count| count.to::<u64>())
    }

    async fn get_root(&self, mcm_address: &str) -> Result<(B256, u32)> {
        let root = view(self.client.as_ref(), parse_address(mcm_address)?, getRootCall {}, "getRoot").await?;
        Ok((root.root, root.validUntil))
    }

    async fn get_root_metadata(&self, mcm_address: &str) -> Result<ChainMetadata> {
        let metadata =
            view(self.client.as_ref(), parse_address(mcm_address)?, getRootMetadataCall {}, "getRootMetadata").await?;
        Ok(ChainMetadata::new(metadata.preOpCount.to::<u64>(), metadata.multiSig.to_string()))
    }
}
