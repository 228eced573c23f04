//! Canton adapters for the MCMS Daml template.
//!
//! A multisig is an active contract of `MCMS.Main:MCMS` addressed by its
//! contract id. The template embeds the timelock, so the timelock address is
//! the same contract. Every consuming choice archives the contract and
//! creates its successor. The adapters' `*_on` methods take an
//! [`McmsHandle`] by value and return the successor's in a [`Mutation`]; the
//! chain-agnostic trait methods report it in
//! [`TransactionResult::recreated`](mcms_core::TransactionResult::recreated).
//!
//! Commands go through a [`CantonLedger`] ([`JsonLedgerClient`] over the JSON
//! Ledger API v2) acting as a single party.

mod chain;
pub mod choices;
pub mod client;
mod configurer;
pub mod contract;
pub mod encoder;
mod executor;
pub mod fields;
mod handle;
mod inspector;
pub mod timelock_converter;
mod timelock_executor;
pub mod timelock_inspector;
pub mod value;

#[cfg(test)]
mod mock;

pub use chain::CantonChain;
pub use client::{CantonLedger, JsonLedgerClient};
pub use configurer::{CantonConfigurer, MAX_SIGNERS};
pub use contract::{MCMS_TEMPLATE_ID, McmsState};
pub use encoder::CantonEncoder;
pub use executor::CantonExecutor;
pub use fields::{CantonMetadataFields, CantonTransactionFields, SELF_TARGET, TimelockRole};
pub use handle::{McmsHandle, Mutation};
pub use inspector::CantonInspector;
pub use timelock_converter::{CantonTimelockConverter, TimelockParams};
pub use timelock_executor::CantonTimelockExecutor;
pub use timelock_inspector::CantonTimelockInspector;
