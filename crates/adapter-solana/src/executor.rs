use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use mcms_core::{
    ChainFamily, ChainMetadata, Encoder, Error, Executor, Operation, QuorumConfig, Result, Signature,
    TransactionResult, cache::ContractCache, metrics::AdapterMetrics, signature::recover_sorted_signers,
};
use serde_json::json;
use tracing::info;

use crate::{
    address::{ContractAddress, parse_program_id},
    client::{SolanaReader, SolanaSubmitter, clock, submit_sequence},
    encoder::SolanaEncoder,
    fields::SolanaTransactionFields,
    instruction::{AccountMeta, without_pda_signer},
    programs::{McmProgram, mcm::RootMetadataInput},
};

/// Sets roots and executes operations on an mcm program instance.
///
/// Signatures are staged in a PDA over several transactions before
/// `set_root` consumes them.
pub struct SolanaExecutor {
    encoder: SolanaEncoder,
    reader: Arc<dyn SolanaReader>,
    submitter: Arc<dyn SolanaSubmitter>,
    cache: Option<Arc<ContractCache<QuorumConfig>>>,
    metrics: AdapterMetrics,
}

impl SolanaExecutor {
    pub fn new(encoder: SolanaEncoder, reader: Arc<dyn SolanaReader>, submitter: Arc<dyn SolanaSubmitter>) -> Self {
        Self { encoder, reader, submitter, cache: None, metrics: AdapterMetrics::new(ChainFamily::Solana) }
    }

    pub fn with_cache(mut self, cache: Arc<ContractCache<QuorumConfig>>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn invalidate(&self, mcm_address: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(mcm_address);
        }
    }

    fn program(&self, mcm_address: &str) -> Result<McmProgram> {
        McmProgram::new(mcm_address.parse::<ContractAddress>()?, self.submitter.authority())
    }
}

#[async_trait]
impl Executor for SolanaExecutor {
    async fn execute_operation(
        &self,
        metadata: &ChainMetadata,
        nonce: u32,
        proof: &[B256],
        op: &Operation,
    ) -> Result<TransactionResult> {
        let program = self.program(&metadata.mcm_address)?;
        let to = parse_program_id(&op.transaction.to)?;
        let fields = SolanaTransactionFields::parse(&op.transaction)?;
        let remaining: Vec<AccountMeta> = fields.accounts.into_iter().map(without_pda_signer).collect();

        let instruction = program.execute(
            self.encoder.chain_selector.0,
            u64::from(nonce),
            to,
            op.transaction.data.to_vec(),
            proof,
            &remaining,
        )?;
        let signature = submit_sequence(self.submitter.as_ref(), &self.metrics, vec![("execute", instruction)]).await?;
        self.invalidate(&metadata.mcm_address);

        info!(
            chain_selector = %self.encoder.chain_selector,
            address = %program.address,
            nonce,
            %to,
            %signature,
            "Operation executed"
        );
        Ok(TransactionResult::new(signature, ChainFamily::Solana).with_raw_data(json!({ "nonce": nonce })))
    }

    async fn set_root(
        &self,
        metadata: &ChainMetadata,
        proof: &[B256],
        root: B256,
        valid_until: u32,
        sorted_signatures: &[Signature],
    ) -> Result<TransactionResult> {
        let program = self.program(&metadata.mcm_address)?;
        let signing_hash = self.encoder.signing_hash(root, valid_until);
        recover_sorted_signers(sorted_signatures, signing_hash)?;

        let now = clock(self.reader.as_ref()).await?;
        if i64::from(valid_until) <= now {
            return Err(Error::InvalidProposal(format!("root expired at {valid_until}, cluster time is {now}")));
        }

        let pre_op_count = metadata.starting_op_count;
        let root_metadata = RootMetadataInput {
            chain_id: self.encoder.chain_selector.0,
            multisig: program.config(),
            pre_op_count,
            post_op_count: metadata.op_count_after(self.encoder.tx_count)?,
            override_previous_root: self.encoder.override_previous_root,
        };
        let sequence = program.set_root_sequence(root_metadata, proof, root, valid_until, sorted_signatures)?;
        let steps = sequence.len();
        let signature = submit_sequence(self.submitter.as_ref(), &self.metrics, sequence).await?;
        self.invalidate(&metadata.mcm_address);

        info!(
            chain_selector = %self.encoder.chain_selector,
            address = %program.address,
            %root,
            valid_until,
            steps,
            %signature,
            "Root set"
        );
        Ok(TransactionResult::new(signature, ChainFamily::Solana).with_raw_data(json!({ "steps": steps })))
    }
}
