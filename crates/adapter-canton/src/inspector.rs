use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use mcms_core::{ChainMetadata, Inspector, QuorumConfig, Result, cache::ContractCache};
use tracing::debug;

use crate::{
    client::{CantonLedger, fetch_mcms},
    contract::McmsState,
    fields::CantonMetadataFields,
};

/// Reads multisig state from the payload of the active MCMS contract.
pub struct CantonInspector {
    ledger: Arc<dyn CantonLedger>,
    cache: Arc<ContractCache<McmsState>>,
}

impl CantonInspector {
    pub fn new(ledger: Arc<dyn CantonLedger>) -> Self {
        Self { ledger, cache: Arc::default() }
    }

    /// Shares a contract cache with the mutating adapters of the same participant.
    pub fn with_cache(mut self, cache: Arc<ContractCache<McmsState>>) -> Self {
        self.cache = cache;
        self
    }

    pub(crate) async fn state(&self, contract_id: &str) -> Result<McmsState> {
        self.cache
            .get_or_fetch(contract_id, || async {
                let state = fetch_mcms(self.ledger.as_ref(), contract_id).await?;
                debug!(contract_id, instance_id = %state.instance_id, "Fetched MCMS contract");
                Ok(state)
            })
            .await
    }
}

#[async_trait]
impl Inspector for CantonInspector {
    async fn get_config(&self, mcm_address: &str) -> Result<QuorumConfig> {
        self.state(mcm_address).await?.config.to_quorum_config()
    }

    async fn get_op_count(&self, mcm_address: &str) -> Result<u64> {
        self.state(mcm_address).await?.expiring_root.op_count.to_u64("opCount")
    }

    async fn get_root(&self, mcm_address: &str) -> Result<(B256, u32)> {
        let root = self.state(mcm_address).await?.expiring_root;
        Ok((root.root()?, root.valid_until()?))
    }

    async fn get_root_metadata(&self, mcm_address: &str) -> Result<ChainMetadata> {
        let state = self.state(mcm_address).await?;
        let metadata = state.root_metadata;
        let fields = CantonMetadataFields {
            chain_id: metadata.chain_id.0,
            multisig_id: metadata.multisig_id,
            pre_op_count: metadata.pre_op_count.to_u64("preOpCount")?,
            post_op_count: metadata.post_op_count.to_u64("postOpCount")?,
            override_previous_root: metadata.override_previous_root,
            instance_id: state.instance_id,
        };
        fields.into_chain_metadata(mcm_address)
    }
}
