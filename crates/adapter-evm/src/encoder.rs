//! Merkle leaves for the `ManyChainMultiSig` contract.

use std::sync::LazyLock;

use alloy::sol_types::SolValue;
use alloy_primitives::{Address, B256, U256, aliases::U40, keccak256};
use mcms_core::{
    ChainFamily, ChainMetadata, ChainRegistry, ChainSelector, Encoder, Operation, Result, metrics::AdapterMetrics,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    bindings::ManyChainMultiSig::{Op, RootMetadata},
    client::parse_address,
};

/// Chain id the contracts report on simulated backends.
pub const SIMULATED_CHAIN_ID: u64 = 1337;

pub static DOMAIN_SEPARATOR_OP: LazyLock<B256> =
    LazyLock::new(|| keccak256("MANY_CHAIN_MULTI_SIG_DOMAIN_SEPARATOR_OP"));

pub static DOMAIN_SEPARATOR_METADATA: LazyLock<B256> =
    LazyLock::new(|| keccak256("MANY_CHAIN_MULTI_SIG_DOMAIN_SEPARATOR_METADATA"));

/// EVM-specific fields of a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmTransactionFields {
    /// Wei forwarded with the call.
    #[serde(default)]
    pub value: U256,
}

/// Computes leaves for one EVM chain of a proposal.
#[derive(Clone, Debug)]
pub struct EvmEncoder {
    pub chain_selector: ChainSelector,
    pub chain_id: u64,
    pub tx_count: u64,
    pub override_previous_root: bool,
    metrics: AdapterMetrics,
}

impl EvmEncoder {
    /// Resolves the chain id through `registry`, or uses the simulated id when `is_sim` is set.
    pub fn new(
        registry: &ChainRegistry,
        chain_selector: ChainSelector,
        tx_count: u64,
        override_previous_root: bool,
        is_sim: bool,
    ) -> Result<Self> {
        let chain_id = if is_sim {
            SIMULATED_CHAIN_ID
        } else {
            registry.evm_chain_id(chain_selector)?
        };
        Ok(Self::with_chain_id(chain_selector, chain_id, tx_count, override_previous_root))
    }

    pub fn with_chain_id(chain_selector: ChainSelector, chain_id: u64, tx_count: u64, override_previous_root: bool) -> Self {
        Self {
            chain_selector,
            chain_id,
            tx_count,
            override_previous_root,
            metrics: AdapterMetrics::new(ChainFamily::Evm),
        }
    }

    /// The root metadata struct the contract stores for `metadata`.
    pub fn root_metadata(&self, metadata: &ChainMetadata) -> Result<RootMetadata> {
        Ok(RootMetadata {
            chainId: U256::from(self.chain_id),
            multiSig: parse_address(&metadata.mcm_address)?,
            preOpCount: metadata.starting_op_count,
            postOpCount: metadata.op_count_after(self.tx_count)?,
            overridePreviousRoot: self.override_previous_root,
        })
    }

    /// The op struct the contract executes for `op` at nonce `op_count`.
    pub fn op(&self, op_count: u32, multisig: Address, op: &Operation) -> Result<Op> {
        let fields: EvmTransactionFields = op.transaction.parse_additional_fields()?;
        Ok(Op {
            chainId: U256::from(self.chain_id),
            multiSig: multisig,
            nonce: U40::from(op_count),
            to: parse_address(&op.transaction.to)?,
            value: fields.value,
            data: op.transaction.data.clone(),
        })
    }
}

impl Encoder for EvmEncoder {
    fn hash_operation(&self, op_count: u32, metadata: &ChainMetadata, op: &Operation) -> Result<B256> {
        let op = self.op(op_count, parse_address(&metadata.mcm_address)?, op)?;
        let leaf = keccak256((*DOMAIN_SEPARATOR_OP, op).abi_encode_params());
        self.metrics.record_hash("operation");
        debug!(chain_selector = %self.chain_selector, op_count, %leaf, "Hashed EVM operation");
        Ok(leaf)
    }

    fn hash_metadata(&self, metadata: &ChainMetadata) -> Result<B256> {
        let root_metadata = self.root_metadata(metadata)?;
        let leaf = keccak256((*DOMAIN_SEPARATOR_METADATA, root_metadata).abi_encode_params());
        self.metrics.record_hash("metadata");
        Ok(leaf)
    }
}
