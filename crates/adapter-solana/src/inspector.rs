use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use mcms_core::{ChainMetadata, Inspector, QuorumConfig, Result, cache::ContractCache};
use tracing::debug;

use crate::{
    accounts::{ExpiringRootAndOpCount, MultisigConfig, RootMetadata},
    address::ContractAddress,
    client::{SolanaReader, read_account, require_account},
};

/// Reads multisig state from the program's PDAs.
pub struct SolanaInspector {
    reader: Arc<dyn SolanaReader>,
    cache: Arc<ContractCache<QuorumConfig>>,
}

impl SolanaInspector {
    pub fn new(reader: Arc<dyn SolanaReader>) -> Self {
        Self { reader, cache: Arc::default() }
    }

    /// Shares a config cache with the mutating adapters of the same instance.
    pub fn with_cache(mut self, cache: Arc<ContractCache<QuorumConfig>>) -> Self {
        self.cache = cache;
        self
    }

    async fn fetch_config(&self, mcm_address: &str) -> Result<QuorumConfig> {
        let address: ContractAddress = mcm_address.parse()?;
        let config: MultisigConfig =
            require_account(self.reader.as_ref(), &address.multisig_config()?, "multisig_config").await?;
        debug!(%address, signers = config.signers.len(), "Fetched multisig config");
        config.flat_config().unflatten()
    }

    /// The root and op count, zeroed when no root was ever set.
    async fn expiring_root(&self, mcm_address: &str) -> Result<ExpiringRootAndOpCount> {
        let address: ContractAddress = mcm_address.parse()?;
        let key = address.expiring_root_and_op_count()?;
        Ok(read_account(self.reader.as_ref(), &key, "expiring_root_and_op_count").await?.unwrap_or_default())
    }
}

#[async_trait]
impl Inspector for SolanaInspector {
    async fn get_config(&self, mcm_address: &str) -> Result<QuorumConfig> {
        self.cache.get_or_fetch(mcm_address, || self.fetch_config(mcm_address)).await
    }

    async fn get_op_count(&self, mcm_address: &str) -> Result<u64> {
        Ok(self.expiring_root(mcm_address).await?.op_count)
    }

    async fn get_root(&self, mcm_address: &str) -> Result<(B256, u32)> {
        let expiring = self.expiring_root(mcm_address).await?;
        Ok((B256::from(expiring.root), expiring.valid_until))
    }

    async fn get_root_metadata(&self, mcm_address: &str) -> Result<ChainMetadata> {
        let address: ContractAddress = mcm_address.parse()?;
        let metadata: RootMetadata =
            require_account(self.reader.as_ref(), &address.root_metadata()?, "root_metadata").await?;
        Ok(ChainMetadata::new(metadata.pre_op_count, mcm_address))
    }
}
