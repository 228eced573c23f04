//! EVM adapters for the `ManyChainMultiSig` and `RBACTimelock` contracts.
//!
//! All adapters talk to the chain through an [`EvmClient`]; [`AlloyClient`]
//! is the JSON-RPC implementation.

pub mod bindings;
mod chain;
pub mod client;
mod configurer;
pub mod encoder;
mod executor;
mod inspector;
pub mod timelock_converter;
mod timelock_executor;
pub mod timelock_inspector;

#[cfg(test)]
mod mock;

pub use chain::EvmChain;
pub use client::{AlloyClient, EvmClient};
pub use configurer::{EvmConfigurer, MAX_SIGNERS};
pub use encoder::{EvmEncoder, EvmTransactionFields, SIMULATED_CHAIN_ID};
pub use executor::EvmExecutor;
pub use inspector::EvmInspector;
pub use timelock_converter::EvmTimelockConverter;
pub use timelock_executor::EvmTimelockExecutor;
pub use timelock_inspector::EvmTimelockInspector;
