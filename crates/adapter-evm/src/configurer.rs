use std::sync::Arc;

use async_trait::async_trait;
use mcms_core::{
    ChainFamily, Configurer, QuorumConfig, Result, TransactionResult, cache::ContractCache, metrics::AdapterMetrics,
};
use serde_json::json;
use tracing::info;

use crate::{
    bindings::ManyChainMultiSig::setConfigCall,
    client::{EvmClient, parse_address, submit},
};

/// Largest signer set `setConfig` accepts.
pub const MAX_SIGNERS: usize = 255;

/// Pushes signer configs with a single `setConfig` transaction.
pub struct EvmConfigurer {
    client: Arc<dyn EvmClient>,
    cache: Option<Arc<ContractCache<QuorumConfig>>>,
    metrics: AdapterMetrics,
}

impl EvmConfigurer {
    pub fn new(client: Arc<dyn EvmClient>) -> Self {
        Self { client, cache: None, metrics: AdapterMetrics::new(ChainFamily::Evm) }
    }

    /// Invalidates `cache` after every config change.
    pub fn with_cache(mut self, cache: Arc<ContractCache<QuorumConfig>>) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[async_trait]
impl Configurer for EvmConfigurer {
    async fn set_config(&self, mcm_address: &str, config: &QuorumConfig, clear_root: bool) -> Result<TransactionResult> {
        let mcm = parse_address(mcm_address)?;
        let flat = config.flatten()?;
        flat.ensure_signer_limit(MAX_SIGNERS)?;

        let call = setConfigCall {
            signerAddresses: flat.signer_addresses,
            signerGroups: flat.signer_groups,
            groupQuorums: flat.group_quorums,
            groupParents: flat.group_parents,
            clearRoot: clear_root,
        };
        let hash = submit(self.client.as_ref(), &self.metrics, mcm, call, "set_config").await?;
        if let Some(cache) = &self.cache {
            cache.invalidate(mcm_address);
        }

        info!(%mcm, tx_hash = %hash, clear_root, "Config set");
        Ok(TransactionResult::new(hash.to_string(), ChainFamily::Evm)
            .with_raw_data(json!({ "mcmAddress": mcm_address, "clearRoot": clear_root })))
    }
}
