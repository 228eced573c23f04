use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use mcms_core::{
    BatchOperation, ChainFamily, Error, OperationState, Result, TimelockExecutor, TransactionResult,
    metrics::AdapterMetrics, timelock::classify_rejection,
};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    address::ContractAddress,
    client::{SolanaReader, SolanaSubmitter},
    programs::TimelockProgram,
    timelock_converter::{batch_instructions, hash_operation},
    timelock_inspector::{Role, SolanaTimelockInspector},
};

/// Executes ready operations with `execute_batch`.
pub struct SolanaTimelockExecutor {
    submitter: Arc<dyn SolanaSubmitter>,
    inspector: SolanaTimelockInspector,
    metrics: AdapterMetrics,
}

impl SolanaTimelockExecutor {
    pub fn new(reader: Arc<dyn SolanaReader>, submitter: Arc<dyn SolanaSubmitter>) -> Self {
        Self {
            submitter,
            inspector: SolanaTimelockInspector::new(reader),
            metrics: AdapterMetrics::new(ChainFamily::Solana),
        }
    }
}

#[async_trait]
impl TimelockExecutor for SolanaTimelockExecutor {
    async fn execute(
        &self,
        batch: &BatchOperation,
        timelock_address: &str,
        predecessor: B256,
        salt: B256,
    ) -> Result<TransactionResult> {
        let timelock: ContractAddress = timelock_address.parse()?;
        let instructions = batch_instructions(batch)?;
        let id = hash_operation(&instructions, predecessor, salt);

        OperationState::fetch(&self.inspector, timelock_address, id).await?.ensure_executable(id)?;

        let executor_role = self.inspector.role_controller(timelock_address, Role::Executor).await?;
        let program = TimelockProgram::new(timelock, self.submitter.authority())?;
        let instruction = program.execute_batch(id, predecessor, &instructions, executor_role)?;

        let signature = match self.submitter.send(vec![instruction]).await {
            Ok(signature) => signature,
            Err(err) => {
                self.metrics.record_failure("execute_batch");
                let message = format!("{err:#}");
                warn!(%timelock, %id, error = %message, "Batch execution rejected");
                return Err(classify_rejection(id, &message).unwrap_or_else(|| Error::submission("execute_batch", err)));
            }
        };
        self.metrics.record_submission("execute_batch");

        info!(%timelock, %id, %signature, "Timelock batch executed");
        Ok(TransactionResult::new(signature, ChainFamily::Solana).with_raw_data(json!({ "operationId": id })))
    }
}
