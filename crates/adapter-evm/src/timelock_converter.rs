//! Lowers timelock batches into `RBACTimelock` calls.

use std::time::Duration;

use alloy::sol_types::{SolCall, SolValue};
use alloy_primitives::{B256, U256, keccak256};
use itertools::Itertools;
use mcms_core::{
    BatchOperation, ChainMetadata, Operation, Result, TimelockAction, TimelockConverter, Transaction,
};
use serde_json::Value;

use crate::{
    bindings::RBACTimelock::{Call, bypasserExecuteBatchCall, cancelCall, scheduleBatchCall},
    client::parse_address,
    encoder::EvmTransactionFields,
};

/// Contract type recorded on operations that target the timelock.
pub const TIMELOCK_CONTRACT_TYPE: &str = "RBACTimelock";

/// The timelock calls of a batch, in batch order.
pub fn batch_calls(batch: &BatchOperation) -> Result<Vec<Call>> {
    batch
        .transactions
        .iter()
        .map(|tx| {
            let fields: EvmTransactionFields = tx.parse_additional_fields()?;
            Ok(Call { target: parse_address(&tx.to)?, value: fields.value, data: tx.data.clone() })
        })
        .collect()
}

/// `keccak256(abi.encode(calls, predecessor, salt))`, as `hashOperationBatch` computes it.
pub fn hash_operation_batch(calls: &[Call], predecessor: B256, salt: B256) -> B256 {
    keccak256((calls.to_vec(), predecessor, salt).abi_encode_params())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EvmTimelockConverter;

impl TimelockConverter for EvmTimelockConverter {
    fn convert_batch_to_chain_operations(
        &self,
        _metadata: &ChainMetadata,
        batch: &BatchOperation,
        timelock_address: &str,
        _mcm_address: &str,
        delay: Duration,
        action: TimelockAction,
        predecessor: B256,
        salt: B256,
    ) -> Result<(Vec<Operation>, B256)> {
        parse_address(timelock_address)?;
        let calls = batch_calls(batch)?;
        let id = hash_operation_batch(&calls, predecessor, salt);

        let data = match action {
            TimelockAction::Schedule => {
                scheduleBatchCall { calls, predecessor, salt, delay: U256::from(delay.as_secs()) }.abi_encode()
            }
            TimelockAction::Cancel => cancelCall { id }.abi_encode(),
            TimelockAction::Bypass => bypasserExecuteBatchCall { calls }.abi_encode(),
        };
        let tags = batch.tags().into_iter().unique().collect();

        let op = Operation {
            chain_selector: batch.chain_selector,
            transaction: Transaction::new(timelock_address, data, Value::Null)
                .with_metadata(TIMELOCK_CONTRACT_TYPE, tags),
        };
        Ok((vec![op], id))
    }
}
