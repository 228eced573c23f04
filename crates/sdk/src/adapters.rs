//! The closed set of chain families a proposal can touch.

use std::collections::BTreeMap;

use mcms_canton::CantonChain;
use mcms_core::{
    ChainFamily, ChainSelector, Configurer, Encoder, EncoderParams, Encoders, Error, Executor, Inspector, Result,
    TimelockConverter, TimelockExecutor, TimelockInspector,
};
use mcms_evm::EvmChain;
use mcms_solana::SolanaChain;

/// The adapters of one chain, whatever its family.
pub enum ChainAdapters {
    Evm(EvmChain),
    Solana(SolanaChain),
    Canton(CantonChain),
}

macro_rules! dispatch {
    ($self:ident, $chain:ident => $expr:expr) => {
        match $self {
            Self::Evm($chain) => $expr,
            Self::Solana($chain) => $expr,
            Self::Canton($chain) => $expr,
        }
    };
}

impl ChainAdapters {
    pub const fn family(&self) -> ChainFamily {
        match self {
            Self::Evm(_) => ChainFamily::Evm,
            Self::Solana(_) => ChainFamily::Solana,
            Self::Canton(_) => ChainFamily::Canton,
        }
    }

    pub fn chain_selector(&self) -> ChainSelector {
        dispatch!(self, chain => chain.chain_selector())
    }

    pub fn encoder(&self, params: EncoderParams) -> Box<dyn Encoder> {
        dispatch!(self, chain => Box::new(chain.encoder(params)) as Box<dyn Encoder>)
    }

    pub fn executor(&self, params: EncoderParams) -> Box<dyn Executor> {
        dispatch!(self, chain => Box::new(chain.executor(params)) as Box<dyn Executor>)
    }

    pub fn configurer(&self) -> &dyn Configurer {
        dispatch!(self, chain => chain.configurer() as &dyn Configurer)
    }

    pub fn inspector(&self) -> &dyn Inspector {
        dispatch!(self, chain => chain.inspector() as &dyn Inspector)
    }

    pub fn timelock_converter(&self) -> &dyn TimelockConverter {
        dispatch!(self, chain => chain.timelock_converter() as &dyn TimelockConverter)
    }

    pub fn timelock_inspector(&self) -> &dyn TimelockInspector {
        dispatch!(self, chain => chain.timelock_inspector() as &dyn TimelockInspector)
    }

    pub fn timelock_executor(&self) -> &dyn TimelockExecutor {
        dispatch!(self, chain => chain.timelock_executor() as &dyn TimelockExecutor)
    }
}

impl From<EvmChain> for ChainAdapters {
    fn from(chain: EvmChain) -> Self {
        Self::Evm(chain)
    }
}

impl From<SolanaChain> for ChainAdapters {
    fn from(chain: SolanaChain) -> Self {
        Self::Solana(chain)
    }
}

impl From<CantonChain> for ChainAdapters {
    fn from(chain: CantonChain) -> Self {
        Self::Canton(chain)
    }
}

/// Adapters for every chain the caller can reach, keyed by selector.
#[derive(Default)]
pub struct Chains {
    chains: BTreeMap<ChainSelector, ChainAdapters>,
}

impl Chains {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `chain` under its own selector.
    pub fn with(mut self, chain: impl Into<ChainAdapters>) -> Self {
        let chain = chain.into();
        self.chains.insert(chain.chain_selector(), chain);
        self
    }

    pub fn get(&self, selector: ChainSelector) -> Result<&ChainAdapters> {
        self.chains.get(&selector).ok_or(Error::UnknownChainSelector(selector))
    }

    /// Encoders for every selector in `params`.
    pub fn encoders(&self, params: &BTreeMap<ChainSelector, EncoderParams>) -> Result<Encoders> {
        params.iter().map(|(selector, params)| Ok((*selector, self.get(*selector)?.encoder(*params)))).collect()
    }

    /// Executors for every selector in `params`.
    pub fn executors(
        &self,
        params: &BTreeMap<ChainSelector, EncoderParams>,
    ) -> Result<BTreeMap<ChainSelector, Box<dyn Executor>>> {
        params.iter().map(|(selector, params)| Ok((*selector, self.get(*selector)?.executor(*params)))).collect()
    }

    pub fn inspectors(&self) -> BTreeMap<ChainSelector, &dyn Inspector> {
        self.chains.iter().map(|(selector, chain)| (*selector, chain.inspector())).collect()
    }

    /// Timelock converters for every chain.
    pub fn timelock_converters(&self) -> BTreeMap<ChainSelector, &dyn TimelockConverter> {
        self.chains.iter().map(|(selector, chain)| (*selector, chain.timelock_converter())).collect()
    }

    pub fn timelock_inspectors(&self) -> BTreeMap<ChainSelector, &dyn TimelockInspector> {
        self.chains.iter().map(|(selector, chain)| (*selector, chain.timelock_inspector())).collect()
    }

    pub fn timelock_executors(&self) -> BTreeMap<ChainSelector, &dyn TimelockExecutor> {
        self.chains.iter().map(|(selector, chain)| (*selector, chain.timelock_executor())).collect()
    }
}
