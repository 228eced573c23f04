use std::sync::Arc;

use mcms_core::{ChainSelector, EncoderParams, QuorumConfig, cache::ContractCache};

use crate::{
    client::{SolanaReader, SolanaSubmitter},
    configurer::SolanaConfigurer,
    encoder::SolanaEncoder,
    executor::SolanaExecutor,
    inspector::SolanaInspector,
    timelock_converter::SolanaTimelockConverter,
    timelock_executor::SolanaTimelockExecutor,
    timelock_inspector::SolanaTimelockInspector,
};

/// Every Solana adapter for one cluster, sharing a reader, a submitter and a
/// config cache.
pub struct SolanaChain {
    chain_selector: ChainSelector,
    reader: Arc<dyn SolanaReader>,
    submitter: Arc<dyn SolanaSubmitter>,
    cache: Arc<ContractCache<QuorumConfig>>,
    configurer: SolanaConfigurer,
    inspector: SolanaInspector,
    timelock_inspector: SolanaTimelockInspector,
    timelock_executor: SolanaTimelockExecutor,
}

impl SolanaChain {
    pub fn new(
        chain_selector: ChainSelector,
        reader: Arc<dyn SolanaReader>,
        submitter: Arc<dyn SolanaSubmitter>,
    ) -> Self {
        let cache = Arc::new(ContractCache::default());
        Self {
            chain_selector,
            configurer: SolanaConfigurer::new(submitter.clone()).with_cache(cache.clone()),
            inspector: SolanaInspector::new(reader.clone()).with_cache(cache.clone()),
            timelock_inspector: SolanaTimelockInspector::new(reader.clone()),
            timelock_executor: SolanaTimelockExecutor::new(reader.clone(), submitter.clone()),
            reader,
            submitter,
            cache,
        }
    }

    pub const fn chain_selector(&self) -> ChainSelector {
        self.chain_selector
    }

    pub const fn encoder(&self, params: EncoderParams) -> SolanaEncoder {
        SolanaEncoder::new(self.chain_selector, params.tx_count, params.override_previous_root)
    }

    pub fn executor(&self, params: EncoderParams) -> SolanaExecutor {
        SolanaExecutor::new(self.encoder(params), self.reader.clone(), self.submitter.clone())
            .with_cache(self.cache.clone())
    }

    pub const fn configurer(&self) -> &SolanaConfigurer {
        &self.configurer
    }

    pub const fn inspector(&self) -> &SolanaInspector {
        &self.inspector
    }

    pub const fn timelock_converter(&self) -> &SolanaTimelockConverter {
        &SolanaTimelockConverter
    }

    pub const fn timelock_inspector(&self) -> &SolanaTimelockInspector {
        &self.timelock_inspector
    }

    pub const fn timelock_executor(&self) -> &SolanaTimelockExecutor {
        &self.timelock_executor
    }
}
