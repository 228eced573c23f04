//! Solana adapters for the `mcm` and `timelock` Anchor programs.
//!
//! Contracts are addressed as `<programId>.<seed>`: one deployed program hosts
//! many instances and every account of an instance is a PDA derived from its
//! seed. State is read through a [`SolanaReader`] ([`RpcReader`] over
//! JSON-RPC); transactions go out through a caller-supplied
//! [`SolanaSubmitter`], which owns the signing key.
//!
//! Large payloads (signer lists, signatures, timelock instructions) do not fit
//! a single transaction, so the program stages them in PDAs over several
//! instructions. Every multi-step submission reports the index and name of
//! the step that failed.

pub mod accounts;
pub mod address;
mod chain;
pub mod client;
mod configurer;
pub mod encoder;
mod executor;
pub mod fields;
mod inspector;
pub mod instruction;
pub mod programs;
pub mod pubkey;
pub mod timelock_converter;
mod timelock_executor;
pub mod timelock_inspector;

#[cfg(test)]
mod mock;

pub use address::ContractAddress;
pub use chain::SolanaChain;
pub use client::{RpcReader, SolanaReader, SolanaSubmitter};
pub use configurer::{MAX_SIGNERS, SolanaConfigurer};
pub use encoder::SolanaEncoder;
pub use executor::SolanaExecutor;
pub use fields::{SolanaMetadataFields, SolanaTransactionFields};
pub use inspector::SolanaInspector;
pub use pubkey::Pubkey;
pub use timelock_converter::SolanaTimelockConverter;
pub use timelock_executor::SolanaTimelockExecutor;
pub use timelock_inspector::SolanaTimelockInspector;
