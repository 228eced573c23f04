//! The adapter contract every chain family implements.
//!
//! Addresses are the chain's native contract identifier rendered as a string:
//! a hex address on EVM, `programId.seed` on Solana, a contract id on Canton.

use std::time::Duration;

use alloy_primitives::B256;
use async_trait::async_trait;

use crate::{
    config::QuorumConfig,
    error::Result,
    operation::{BatchOperation, ChainMetadata, Operation, TransactionResult},
    signature::{Signature, root_signing_hash},
    timelock::TimelockAction,
};

/// Computes Merkle leaves exactly as the chain's multisig contract does.
pub trait Encoder: Send + Sync {
    /// Leaf for `op` executed as operation number `op_count` of the contract.
    fn hash_operation(&self, op_count: u32, metadata: &ChainMetadata, op: &Operation) -> Result<B256>;

    /// Leaf for the root metadata of this chain.
    fn hash_metadata(&self, metadata: &ChainMetadata) -> Result<B256>;

    /// The hash signers sign to authorize `root` on this chain.
    fn signing_hash(&self, root: B256, valid_until: u32) -> B256 {
        root_signing_hash(root, valid_until)
    }
}

/// Pushes a signer configuration to a multisig contract.
#[async_trait]
pub trait Configurer: Send + Sync {
    async fn set_config(&self, mcm_address: &str, config: &QuorumConfig, clear_root: bool)
    -> Result<TransactionResult>;
}

/// Read-only view of a multisig contract.
#[async_trait]
pub trait Inspector: Send + Sync {
    /// The on-chain signer tree, validated.
    async fn get_config(&self, mcm_address: &str) -> Result<QuorumConfig>;

    async fn get_op_count(&self, mcm_address: &str) -> Result<u64>;

    /// The active root and its expiry in unix seconds.
    async fn get_root(&self, mcm_address: &str) -> Result<(B256, u32)>;

    async fn get_root_metadata(&self, mcm_address: &str) -> Result<ChainMetadata>;
}

/// Submits roots and operations to a multisig contract.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute_operation(
        &self,
        metadata: &ChainMetadata,
        nonce: u32,
        proof: &[B256],
        op: &Operation,
    ) -> Result<TransactionResult>;

    /// `sorted_signatures` must already be ordered by ascending signer address.
    async fn set_root(
        &self,
        metadata: &ChainMetadata,
        proof: &[B256],
        root: B256,
        valid_until: u32,
        sorted_signatures: &[Signature],
    ) -> Result<TransactionResult>;
}

/// Rewrites a timelock batch into multisig operations.
pub trait TimelockConverter: Send + Sync {
    /// Returns the operations that carry out `action` on `batch` and the
    /// batch's operation id.
    ///
    /// The id depends only on the calls, `predecessor` and `salt`, never on
    /// `action`, so a cancellation built from the same batch targets the
    /// scheduled operation.
    #[allow(clippy::too_many_arguments)]
    fn convert_batch_to_chain_operations(
        &self,
        metadata: &ChainMetadata,
        batch: &BatchOperation,
        timelock_address: &str,
        mcm_address: &str,
        delay: Duration,
        action: TimelockAction,
        predecessor: B256,
        salt: B256,
    ) -> Result<(Vec<Operation>, B256)>;
}

/// Read-only view of a timelock contract.
#[async_trait]
pub trait TimelockInspector: Send + Sync {
    async fn get_proposers(&self, address: &str) -> Result<Vec<String>>;
    async fn get_executors(&self, address: &str) -> Result<Vec<String>>;
    async fn get_bypassers(&self, address: &str) -> Result<Vec<String>>;
    async fn get_cancellers(&self, address: &str) -> Result<Vec<String>>;

    /// True unless the id was never scheduled or was cancelled.
    async fn is_operation(&self, address: &str, id: B256) -> Result<bool>;
    /// True while the operation is scheduled and not yet executed.
    async fn is_operation_pending(&self, address: &str, id: B256) -> Result<bool>;
    /// True once the delay elapsed by the chain's own clock.
    async fn is_operation_ready(&self, address: &str, id: B256) -> Result<bool>;
    async fn is_operation_done(&self, address: &str, id: B256) -> Result<bool>;

    /// Minimum scheduling delay in seconds.
    async fn get_min_delay(&self, address: &str) -> Result<u64>;
}

/// Executes scheduled timelock batches.
#[async_trait]
pub trait TimelockExecutor: Send + Sync {
    async fn execute(
        &self,
        batch: &BatchOperation,
        timelock_address: &str,
        predecessor: B256,
        salt: B256,
    ) -> Result<TransactionResult>;
}
