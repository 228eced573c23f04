use std::sync::Arc;

use async_trait::async_trait;
use mcms_core::{
    ChainFamily, Configurer, QuorumConfig, Result, TransactionResult, cache::ContractCache, metrics::AdapterMetrics,
};
use serde_json::json;
use tracing::info;

use crate::{
    address::ContractAddress,
    client::{SolanaSubmitter, submit_sequence},
    programs::McmProgram,
};

/// Largest signer set the mcm program stores.
pub const MAX_SIGNERS: usize = 180;

/// Uploads signers in chunks, then applies the config with `set_config`.
pub struct SolanaConfigurer {
    submitter: Arc<dyn SolanaSubmitter>,
    cache: Option<Arc<ContractCache<QuorumConfig>>>,
    metrics: AdapterMetrics,
}

impl SolanaConfigurer {
    pub fn new(submitter: Arc<dyn SolanaSubmitter>) -> Self {
        Self { submitter, cache: None, metrics: AdapterMetrics::new(ChainFamily::Solana) }
    }

    /// Invalidates `cache` after every config change.
    pub fn with_cache(mut self, cache: Arc<ContractCache<QuorumConfig>>) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[async_trait]
impl Configurer for SolanaConfigurer {
    async fn set_config(&self, mcm_address: &str, config: &QuorumConfig, clear_root: bool) -> Result<TransactionResult> {
        let address: ContractAddress = mcm_address.parse()?;
        let flat = config.flatten()?;
        flat.ensure_signer_limit(MAX_SIGNERS)?;

        let program = McmProgram::new(address, self.submitter.authority())?;
        let sequence = program.set_config_sequence(&flat, clear_root)?;
        let steps = sequence.len();
        let signature = submit_sequence(self.submitter.as_ref(), &self.metrics, sequence).await;
        if let Some(cache) = &self.cache {
            cache.invalidate(mcm_address);
        }
        let signature = signature?;

        info!(%address, %signature, steps, clear_root, "Config set");
        Ok(TransactionResult::new(signature, ChainFamily::Solana)
            .with_raw_data(json!({ "mcmAddress": mcm_address, "clearRoot": clear_root, "steps": steps })))
    }
}
