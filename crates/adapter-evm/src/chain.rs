use std::sync::Arc;

use mcms_core::{ChainSelector, EncoderParams, QuorumConfig, cache::ContractCache};

use crate::{
    client::EvmClient, configurer::EvmConfigurer, encoder::EvmEncoder, executor::EvmExecutor,
    inspector::EvmInspector, timelock_converter::EvmTimelockConverter, timelock_executor::EvmTimelockExecutor,
    timelock_inspector::EvmTimelockInspector,
};

/// Every EVM adapter for one chain, sharing a client and a config cache.
pub struct EvmChain {
    chain_selector: ChainSelector,
    chain_id: u64,
    client: Arc<dyn EvmClient>,
    cache: Arc<ContractCache<QuorumConfig>>,
    configurer: EvmConfigurer,
    inspector: EvmInspector,
    timelock_inspector: EvmTimelockInspector,
    timelock_executor: EvmTimelockExecutor,
}

impl EvmChain {
    pub fn new(chain_selector: ChainSelector, chain_id: u64, client: Arc<dyn EvmClient>) -> Self {
        let cache = Arc::new(ContractCache::default());
        Self {
            chain_selector,
            chain_id,
            configurer: EvmConfigurer::new(client.clone()).with_cache(cache.clone()),
            inspector: EvmInspector::new(client.clone()).with_cache(cache.clone()),
            timelock_inspector: EvmTimelockInspector::new(client.clone()),
            timelock_executor: EvmTimelockExecutor::new(client.clone()),
            client,
            cache,
        }
    }

    pub const fn chain_selector(&self) -> ChainSelector {
        self.chain_selector
    }

    pub fn encoder(&self, params: EncoderParams) -> EvmEncoder {
        EvmEncoder::with_chain_id(self.chain_selector, self.chain_id, params.tx_count, params.override_previous_root)
    }

    pub fn executor(&self, params: EncoderParams) -> EvmExecutor {
        EvmExecutor::new(self.encoder(params), self.client.clone()).with_cache(self.cache.clone())
    }

    pub const fn configurer(&self) -> &EvmConfigurer {
        &self.configurer
    }

    pub const fn inspector(&self) -> &EvmInspector {
        &self.inspector
    }

    pub const fn timelock_converter(&self) -> &EvmTimelockConverter {
        &EvmTimelockConverter
    }

    pub const fn timelock_inspector(&self) -> &EvmTimelockInspector {
        &self.timelock_inspector
    }

    pub const fn timelock_executor(&self) -> &EvmTimelockExecutor {
        &self.timelock_executor
    }
}
