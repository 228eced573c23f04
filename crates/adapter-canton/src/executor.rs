use std::sync::Arc;

use alloy_primitives::{B256, hex};
use async_trait::async_trait;
use mcms_core::{
    ChainFamily, ChainMetadata, Encoder, Error, Executor, Operation, Result, Signature, TransactionResult,
    cache::ContractCache, metrics::AdapterMetrics, signature::recover_sorted_signers,
};
use tracing::info;

use crate::{
    choices::{ExecuteMcmsOp, ExecuteOp, Op, RawSignature, SetRoot},
    client::{CantonLedger, LedgerTransaction, mutation, recreated_mcms, submit},
    contract::{McmsState, RootMetadata},
    encoder::CantonEncoder,
    fields::{CantonMetadataFields, CantonTransactionFields},
    handle::{McmsHandle, Mutation},
    value::{Int64, timestamp},
};

fn proof_hex(proof: &[B256]) -> Vec<String> {
    proof.iter().map(hex::encode).collect()
}

fn count(value: u64, what: &str) -> Result<Int64> {
    i64::try_from(value)
        .map(Int64)
        .map_err(|_| Error::InvalidAdditionalFields(format!("{what} {value} does not fit an Int64")))
}

/// Sets roots and executes operations on an MCMS contract.
///
/// Both mutations archive the contract. The `*_on` methods consume its
/// [`McmsHandle`] and return the successor's; the [`Executor`] methods report
/// the successor in [`TransactionResult::recreated`].
pub struct CantonExecutor {
    encoder: CantonEncoder,
    ledger: Arc<dyn CantonLedger>,
    cache: Option<Arc<ContractCache<McmsState>>>,
    metrics: AdapterMetrics,
}

impl CantonExecutor {
    pub fn new(encoder: CantonEncoder, ledger: Arc<dyn CantonLedger>) -> Self {
        Self { encoder, ledger, cache: None, metrics: AdapterMetrics::new(ChainFamily::Canton) }
    }

    pub fn with_cache(mut self, cache: Arc<ContractCache<McmsState>>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn invalidate(&self, contract_id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(contract_id);
        }
    }

    async fn execute_choice(
        &self,
        contract_id: &str,
        fields: &CantonTransactionFields,
        op: Op,
        op_proof: Vec<String>,
    ) -> Result<LedgerTransaction> {
        let submitter = self.ledger.party().to_owned();
        let tx = if fields.targets_self() {
            let choice = ExecuteMcmsOp { submitter, op, op_proof };
            submit(self.ledger.as_ref(), &self.metrics, contract_id, "mcms-execute-op", &choice).await
        } else {
            let choice = ExecuteOp {
                submitter,
                target_cid: fields.target_cid.clone(),
                op,
                op_proof,
                contract_ids: fields.contract_ids.clone(),
            };
            submit(self.ledger.as_ref(), &self.metrics, contract_id, "mcms-execute-op", &choice).await
        };
        self.invalidate(contract_id);
        tx
    }

    /// Executes `op` at `nonce` on `handle`'s contract, which is archived.
    ///
    /// `metadata` supplies the chain and multisig ids; its `mcm_address` is
    /// not consulted.
    pub async fn execute_operation_on(
        &self,
        handle: McmsHandle,
        metadata: &ChainMetadata,
        nonce: u32,
        proof: &[B256],
        op: &Operation,
    ) -> Result<Mutation> {
        let fields = CantonTransactionFields::parse(&op.transaction)?;
        fields.require_executable()?;
        let meta = CantonMetadataFields::parse(metadata)?;

        let canton_op = Op {
            chain_id: Int64(meta.chain_id),
            multisig_id: meta.multisig_id,
            nonce: Int64::from(nonce),
            target_instance_id: fields.target_instance_id.clone(),
            function_name: fields.function_name.clone(),
            operation_data: fields.operation_data.clone(),
        };
        let tx = self.execute_choice(handle.contract_id(), &fields, canton_op, proof_hex(proof)).await?;
        let next = recreated_mcms(&tx, handle.contract_id())?;

        info!(
            chain_selector = %self.encoder.chain_selector,
            previous = handle.contract_id(),
            contract_id = next.contract_id(),
            nonce,
            target = %fields.target_instance_id,
            function = %fields.function_name,
            "Operation executed"
        );
        Ok(mutation(&tx, next))
    }

    /// Sets the signed root on `handle`'s contract, which is archived.
    pub async fn set_root_on(
        &self,
        handle: McmsHandle,
        metadata: &ChainMetadata,
        proof: &[B256],
        root: B256,
        valid_until: u32,
        sorted_signatures: &[Signature],
    ) -> Result<Mutation> {
        let meta = CantonMetadataFields::parse(metadata)?;
        let signing_hash = self.encoder.signing_hash(root, valid_until);
        recover_sorted_signers(sorted_signatures, signing_hash)?;

        let signatures = sorted_signatures
            .iter()
            .map(|signature| {
                Ok(RawSignature {
                    public_key: hex::encode(signature.recover_public_key(signing_hash)?),
                    r: hex::encode(signature.r),
                    s: hex::encode(signature.s),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let choice = SetRoot {
            submitter: self.ledger.party().to_owned(),
            new_root: hex::encode(root),
            valid_until: timestamp(valid_until)?,
            metadata: RootMetadata {
                chain_id: Int64(meta.chain_id),
                multisig_id: meta.multisig_id,
                pre_op_count: count(meta.pre_op_count, "preOpCount")?,
                post_op_count: count(meta.post_op_count, "postOpCount")?,
                override_previous_root: meta.override_previous_root,
            },
            metadata_proof: proof_hex(proof),
            signatures,
        };
        let tx = submit(self.ledger.as_ref(), &self.metrics, handle.contract_id(), "mcms-set-root", &choice).await;
        self.invalidate(handle.contract_id());
        let tx = tx?;
        let next = recreated_mcms(&tx, handle.contract_id())?;

        info!(
            chain_selector = %self.encoder.chain_selector,
            previous = handle.contract_id(),
            contract_id = next.contract_id(),
            %root,
            valid_until,
            signatures = sorted_signatures.len(),
            "Root set"
        );
        Ok(mutation(&tx, next))
    }
}

#[async_trait]
impl Executor for CantonExecutor {
    async fn execute_operation(
        &self,
        metadata: &ChainMetadata,
        nonce: u32,
        proof: &[B256],
        op: &Operation,
    ) -> Result<TransactionResult> {
        let handle = McmsHandle::new(&metadata.mcm_address);
        self.execute_operation_on(handle, metadata, nonce, proof, op).await.map(Mutation::into_result)
    }

    async fn set_root(
        &self,
        metadata: &ChainMetadata,
        proof: &[B256],
        root: B256,
        valid_until: u32,
        sorted_signatures: &[Signature],
    ) -> Result<TransactionResult> {
        let handle = McmsHandle::new(&metadata.mcm_address);
        self.set_root_on(handle, metadata, proof, root, valid_until, sorted_signatures)
            .await
            .map(Mutation::into_result)
    }
}
