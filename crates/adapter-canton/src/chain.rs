use std::sync::Arc;

use mcms_core::{ChainSelector, EncoderParams, cache::ContractCache};

use crate::{
    client::CantonLedger,
    configurer::CantonConfigurer,
    contract::McmsState,
    encoder::CantonEncoder,
    executor::CantonExecutor,
    inspector::CantonInspector,
    timelock_converter::CantonTimelockConverter,
    timelock_executor::CantonTimelockExecutor,
    timelock_inspector::CantonTimelockInspector,
};

/// Every Canton adapter for one participant, sharing a ledger connection and
/// a contract cache.
pub struct CantonChain {
    chain_selector: ChainSelector,
    ledger: Arc<dyn CantonLedger>,
    cache: Arc<ContractCache<McmsState>>,
    configurer: CantonConfigurer,
    inspector: CantonInspector,
    timelock_inspector: CantonTimelockInspector,
    timelock_executor: CantonTimelockExecutor,
}

impl CantonChain {
    pub fn new(chain_selector: ChainSelector, ledger: Arc<dyn CantonLedger>) -> Self {
        let cache = Arc::new(ContractCache::default());
        Self {
            chain_selector,
            configurer: CantonConfigurer::new(ledger.clone()).with_cache(cache.clone()),
            inspector: CantonInspector::new(ledger.clone()).with_cache(cache.clone()),
            timelock_inspector: CantonTimelockInspector::new(ledger.clone()),
            timelock_executor: CantonTimelockExecutor::new(ledger.clone()),
            ledger,
            cache,
        }
    }

    pub const fn chain_selector(&self) -> ChainSelector {
        self.chain_selector
    }

    pub const fn encoder(&self, params: EncoderParams) -> CantonEncoder {
        CantonEncoder::new(self.chain_selector, params.tx_count, params.override_previous_root)
    }

    pub fn executor(&self, params: EncoderParams) -> CantonExecutor {
        CantonExecutor::new(self.encoder(params), self.ledger.clone()).with_cache(self.cache.clone())
    }

    pub const fn configurer(&self) -> &CantonConfigurer {
        &self.configurer
    }

    pub const fn inspector(&self) -> &CantonInspector {
        &self.inspector
    }

    pub const fn timelock_converter(&self) -> &CantonTimelockConverter {
        &CantonTimelockConverter
    }

    pub const fn timelock_inspector(&self) -> &CantonTimelockInspector {
        &self.timelock_inspector
    }

    pub const fn timelock_executor(&self) -> &CantonTimelockExecutor {
        &self.timelock_executor
    }
}
