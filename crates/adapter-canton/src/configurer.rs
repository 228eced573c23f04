use std::sync::Arc;

use async_trait::async_trait;
use mcms_core::{
    ChainFamily, Configurer, QuorumConfig, Result, TransactionResult, cache::ContractCache, metrics::AdapterMetrics,
};
use tracing::info;

use crate::{
    choices::SetConfig,
    client::{CantonLedger, mutation, recreated_mcms, submit},
    contract::{McmsState, MultisigConfig},
    handle::{McmsHandle, Mutation},
};

/// Largest signer set the template accepts.
pub const MAX_SIGNERS: usize = 255;

/// Replaces the signer tree with the `SetConfig` choice.
pub struct CantonConfigurer {
    ledger: Arc<dyn CantonLedger>,
    cache: Option<Arc<ContractCache<McmsState>>>,
    metrics: AdapterMetrics,
}

impl CantonConfigurer {
    pub fn new(ledger: Arc<dyn CantonLedger>) -> Self {
        Self { ledger, cache: None, metrics: AdapterMetrics::new(ChainFamily::Canton) }
    }

    pub fn with_cache(mut self, cache: Arc<ContractCache<McmsState>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the signer tree of `handle`'s contract, which is archived.
    pub async fn set_config_on(&self, handle: McmsHandle, config: &QuorumConfig, clear_root: bool) -> Result<Mutation> {
        let flat = config.flatten()?;
        flat.ensure_signer_limit(MAX_SIGNERS)?;

        let multisig = MultisigConfig::from_flat(&flat);
        let choice = SetConfig {
            new_signers: multisig.signers,
            new_group_quorums: multisig.group_quorums,
            new_group_parents: multisig.group_parents,
            clear_root,
        };
        let previous = handle.contract_id();
        let tx = submit(self.ledger.as_ref(), &self.metrics, previous, "mcms-set-config", &choice).await;
        if let Some(cache) = &self.cache {
            cache.invalidate(previous);
        }
        let tx = tx?;
        let next = recreated_mcms(&tx, previous)?;

        info!(
            previous,
            contract_id = next.contract_id(),
            signers = flat.signer_addresses.len(),
            clear_root,
            "Config set"
        );
        Ok(mutation(&tx, next))
    }
}

#[async_trait]
impl Configurer for CantonConfigurer {
    /// Returns the re-created contract in [`TransactionResult::recreated`];
    /// `mcm_address` is archived.
    async fn set_config(&self, mcm_address: &str, config: &QuorumConfig, clear_root: bool) -> Result<TransactionResult> {
        self.set_config_on(McmsHandle::new(mcm_address), config, clear_root).await.map(Mutation::into_result)
    }
}
