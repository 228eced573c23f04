//! Chain-agnostic core of the multi-chain multisig toolkit.
//!
//! Holds the proposal model, quorum configuration math, the Merkle tree
//! every chain verifies against, and the adapter traits each chain family
//! implements.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod merkle;
pub mod metrics;
pub mod operation;
pub mod proposal;
pub mod retry;
pub mod sdk;
pub mod signature;
pub mod timelock;

pub use chain::{ChainFamily, ChainInfo, ChainRegistry, ChainSelector};
pub use config::{FlatConfig, QuorumConfig};
pub use error::{Error, Result};
pub use merkle::MerkleTree;
pub use operation::{BatchOperation, ChainMetadata, ContractIdentity, Operation, Transaction, TransactionResult};
pub use proposal::{BaseProposal, ConvertedProposal, EncoderParams, Encoders, Proposal, ProposalKind, TimelockProposal};
pub use sdk::{Configurer, Encoder, Executor, Inspector, TimelockConverter, TimelockExecutor, TimelockInspector};
pub use signature::Signature;
pub use timelock::{OperationState, TimelockAction};
