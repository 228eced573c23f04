use std::sync::Arc;

use alloy::sol_types::SolCall;
use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use mcms_core::{
    BatchOperation, ChainFamily, Error, OperationState, Result, TimelockExecutor, TransactionResult,
    metrics::AdapterMetrics, timelock::classify_rejection,
};
use tracing::{info, warn};

use crate::{
    bindings::RBACTimelock::executeBatchCall,
    client::{EvmClient, parse_address},
    timelock_converter::{batch_calls, hash_operation_batch},
    timelock_inspector::EvmTimelockInspector,
};

/// Executes ready batches with `executeBatch`.
pub struct EvmTimelockExecutor {
    client: Arc<dyn EvmClient>,
    inspector: EvmTimelockInspector,
    metrics: AdapterMetrics,
}

impl EvmTimelockExecutor {
    pub fn new(client: Arc<dyn EvmClient>) -> Self {
        let inspector = EvmTimelockInspector::new(client.clone());
        Self { client, inspector, metrics: AdapterMetrics::new(ChainFamily::Evm) }
    }
}

#[async_trait]
impl TimelockExecutor for EvmTimelockExecutor {
    async fn execute(
        &self,
        batch: &BatchOperation,
        timelock_address: &str,
        predecessor: B256,
        salt: B256,
    ) -> Result<TransactionResult> {
        let timelock = parse_address(timelock_address)?;
        let calls = batch_calls(batch)?;
        let id = hash_operation_batch(&calls, predecessor, salt);

        OperationState::fetch(&self.inspector, timelock_address, id).await?.ensure_executable(id)?;

        let input = executeBatchCall { calls, predecessor, salt }.abi_encode();
        let hash = match self.client.send(timelock, input.into(), U256::ZERO).await {
            Ok(hash) => hash,
            Err(err) => {
                self.metrics.record_failure("execute_batch");
                let message = format!("{err:#}");
                warn!(%timelock, %id, error = %message, "Batch execution rejected");
                return Err(classify_rejection(id, &message).unwrap_or_else(|| Error::submission("execute_batch", err)));
            }
        };
        self.metrics.record_submission("execute_batch");

        info!(%timelock, %id, tx_hash = %hash, "Timelock batch executed");
        Ok(TransactionResult::new(hash.to_string(), ChainFamily::Evm))
    }
}
