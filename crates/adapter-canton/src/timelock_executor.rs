use std::sync::Arc;

use alloy_primitives::{B256, hex};
use async_trait::async_trait;
use mcms_core::{
    BatchOperation, ChainFamily, Error, OperationState, Result, TimelockExecutor, TransactionResult,
    metrics::AdapterMetrics, timelock::classify_rejection,
};
use tracing::{info, warn};

use crate::{
    choices::{Choice, ExecuteScheduledBatch},
    client::{CantonLedger, command, mutation, recreated_mcms},
    fields::CantonTransactionFields,
    handle::{McmsHandle, Mutation},
    timelock_converter::{hash_timelock_op_id, timelock_calls},
    timelock_inspector::CantonTimelockInspector,
};

/// Executes ready operations with `ExecuteScheduledBatch` on the MCMS contract.
pub struct CantonTimelockExecutor {
    ledger: Arc<dyn CantonLedger>,
    inspector: CantonTimelockInspector,
    metrics: AdapterMetrics,
}

impl CantonTimelockExecutor {
    pub fn new(ledger: Arc<dyn CantonLedger>) -> Self {
        Self {
            inspector: CantonTimelockInspector::new(ledger.clone()),
            ledger,
            metrics: AdapterMetrics::new(ChainFamily::Canton),
        }
    }

    /// Executes the ready `batch` on `handle`'s contract, which is archived.
    pub async fn execute_on(
        &self,
        handle: McmsHandle,
        batch: &BatchOperation,
        predecessor: B256,
        salt: B256,
    ) -> Result<Mutation> {
        let timelock_address = handle.contract_id();
        let calls = timelock_calls(batch)?;
        let mut target_cids = Vec::new();
        for tx in &batch.transactions {
            let fields = CantonTransactionFields::parse(tx)?;
            if !fields.target_cid.is_empty() {
                target_cids.push(fields.target_cid);
            }
        }
        let id = hash_timelock_op_id(&calls, predecessor, salt);

        OperationState::fetch(&self.inspector, timelock_address, id).await?.ensure_executable(id)?;

        let choice = ExecuteScheduledBatch {
            submitter: self.ledger.party().to_owned(),
            op_id: hex::encode(id),
            calls,
            predecessor: hex::encode(predecessor),
            salt: hex::encode(salt),
            target_cids,
        };
        let command = command(timelock_address, "mcms-timelock-execute", &choice)?;
        let tx = match self.ledger.exercise(command).await {
            Ok(tx) => tx,
            Err(err) => {
                self.metrics.record_failure(ExecuteScheduledBatch::NAME);
                let message = format!("{err:#}");
                warn!(timelock = timelock_address, %id, error = %message, "Batch execution rejected");
                return Err(
                    classify_rejection(id, &message).unwrap_or_else(|| Error::submission(ExecuteScheduledBatch::NAME, err))
                );
            }
        };
        self.metrics.record_submission(ExecuteScheduledBatch::NAME);
        let next = recreated_mcms(&tx, timelock_address)?;

        info!(previous = timelock_address, contract_id = next.contract_id(), %id, "Timelock batch executed");
        Ok(mutation(&tx, next))
    }
}

#[async_trait]
impl TimelockExecutor for CantonTimelockExecutor {
    /// `timelock_address` is the MCMS contract id; the contract is re-created.
    async fn execute(
        &self,
        batch: &BatchOperation,
        timelock_address: &str,
        predecessor: B256,
        salt: B256,
    ) -> Result<TransactionResult> {
        self.execute_on(McmsHandle::new(timelock_address), batch, predecessor, salt).await.map(Mutation::into_result)
    }
}
