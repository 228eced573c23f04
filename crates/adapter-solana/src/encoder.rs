//! Merkle leaves for the Solana mcm program.
//!
//! Integers are written as 32-byte words holding a little-endian `u64` in
//! their last eight bytes, which is how the program lays out its hash input.

use std::sync::LazyLock;

use alloy_primitives::{B256, keccak256};
use mcms_core::{ChainFamily, ChainMetadata, ChainSelector, Encoder, Operation, Result, metrics::AdapterMetrics};
use tracing::debug;

use crate::{
    address::{ContractAddress, parse_program_id},
    fields::SolanaTransactionFields,
    instruction::AccountMeta,
};

pub static DOMAIN_SEPARATOR_OP: LazyLock<B256> =
    LazyLock::new(|| keccak256("MANY_CHAIN_MULTI_SIG_DOMAIN_SEPARATOR_OP_SOLANA"));

pub static DOMAIN_SEPARATOR_METADATA: LazyLock<B256> =
    LazyLock::new(|| keccak256("MANY_CHAIN_MULTI_SIG_DOMAIN_SEPARATOR_METADATA_SOLANA"));

const SIGNER_FLAG: u8 = 0b10;
const WRITABLE_FLAG: u8 = 0b01;

pub(crate) fn le_word(n: u64) -> [u8; 32] {
    let mut word = [0; 32];
    word[24..].copy_from_slice(&n.to_le_bytes());
    word
}

fn bool_word(flag: bool) -> [u8; 32] {
    let mut word = [0; 32];
    word[31] = u8::from(flag);
    word
}

fn account_flags(account: &AccountMeta) -> u8 {
    let mut flags = 0;
    if account.is_signer {
        flags |= SIGNER_FLAG;
    }
    if account.is_writable {
        flags |= WRITABLE_FLAG;
    }
    flags
}

/// Computes leaves for one Solana chain of a proposal.
#[derive(Clone, Debug)]
pub struct SolanaEncoder {
    pub chain_selector: ChainSelector,
    pub tx_count: u64,
    pub override_previous_root: bool,
    metrics: AdapterMetrics,
}

impl SolanaEncoder {
    pub const fn new(chain_selector: ChainSelector, tx_count: u64, override_previous_root: bool) -> Self {
        Self { chain_selector, tx_count, override_previous_root, metrics: AdapterMetrics::new(ChainFamily::Solana) }
    }
}

impl Encoder for SolanaEncoder {
    fn hash_operation(&self, op_count: u32, metadata: &ChainMetadata, op: &Operation) -> Result<B256> {
        let config = metadata.mcm_address.parse::<ContractAddress>()?.multisig_config()?;
        let to = parse_program_id(&op.transaction.to)?;
        let fields = SolanaTransactionFields::parse(&op.transaction)?;
        let data = &op.transaction.data;

        let mut buf = Vec::with_capacity(32 * 6 + data.len() + 33 * fields.accounts.len());
        buf.extend_from_slice(DOMAIN_SEPARATOR_OP.as_slice());
        buf.extend_from_slice(&le_word(self.chain_selector.0));
        buf.extend_from_slice(config.as_ref());
        buf.extend_from_slice(&le_word(u64::from(op_count)));
        buf.extend_from_slice(to.as_ref());
        buf.extend_from_slice(&le_word(data.len() as u64));
        buf.extend_from_slice(data);
        buf.extend_from_slice(&le_word(fields.accounts.len() as u64));
        for account in &fields.accounts {
            buf.extend_from_slice(account.pubkey.as_ref());
            buf.push(account_flags(account));
        }

        self.metrics.record_hash("operation");
        let leaf = keccak256(&buf);
        debug!(chain_selector = %self.chain_selector, op_count, %leaf, "Hashed operation");
        Ok(leaf)
    }

    fn hash_metadata(&self, metadata: &ChainMetadata) -> Result<B256> {
        let config = metadata.mcm_address.parse::<ContractAddress>()?.multisig_config()?;
        let pre = metadata.starting_op_count;

        let buf = [
            DOMAIN_SEPARATOR_METADATA.0,
            le_word(self.chain_selector.0),
            config.to_bytes(),
            le_word(pre),
            le_word(metadata.op_count_after(self.tx_count)?),
            bool_word(self.override_previous_root),
        ]
        .concat();

        self.metrics.record_hash("metadata");
        Ok(keccak256(buf))
    }
}
