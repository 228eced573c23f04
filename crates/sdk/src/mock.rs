//! Recording adapters and proposal fixtures for the proposal drivers.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use mcms_core::{
    BaseProposal, BatchOperation, ChainFamily, ChainMetadata, ChainSelector, ContractIdentity, Encoder,
    EncoderParams, Encoders, Error, Executor, Inspector, Operation, OperationState, Proposal,
    ProposalKind, QuorumConfig, Result, Signature, TimelockAction, TimelockExecutor, TimelockInspector,
    TimelockProposal, Transaction, TransactionResult,
    signature::{recover_sorted_signers, root_signing_hash},
};
use mcms_evm::{
    EvmEncoder,
    timelock_converter::{batch_calls, hash_operation_batch},
};
use parking_lot::Mutex;
use serde_json::Value;

pub(crate) const SEPOLIA: ChainSelector = ChainSelector(16015286601757825753);
pub(crate) const MAINNET: ChainSelector = ChainSelector(5009297550715157269);

pub(crate) fn anvil_signers() -> Vec<PrivateKeySigner> {
    [
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    ]
    .iter()
    .map(|key| key.parse().unwrap())
    .collect()
}

pub(crate) fn valid_until() -> u32 {
    let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_secs();
    (now + 3600) as u32
}

fn mcm(byte: u8) -> String {
    Address::repeat_byte(byte).to_string()
}

fn call(byte: u8) -> Transaction {
    Transaction::new(Address::repeat_byte(byte).to_string(), vec![byte, byte], Value::Null)
}

fn base(kind: ProposalKind) -> BaseProposal {
    BaseProposal {
        version: "v1".into(),
        kind,
        valid_until: valid_until(),
        signatures: vec![],
        override_previous_root: false,
        chain_metadata: BTreeMap::from([
            (SEPOLIA, ChainMetadata::new(3, mcm(0xa1))),
            (MAINNET, ChainMetadata::new(0, mcm(0xa2))),
        ]),
        description: "test proposal".into(),
        metadata: Default::default(),
    }
}

/// Two operations on Sepolia and one on mainnet, interleaved.
pub(crate) fn proposal() -> Proposal {
    let op = |chain_selector, byte| Operation { chain_selector, transaction: call(byte) };
    Proposal { base: base(ProposalKind::Proposal), operations: vec![op(SEPOLIA, 1), op(MAINNET, 2), op(SEPOLIA, 3)] }
}

/// Two batches on Sepolia and one on mainnet.
pub(crate) fn timelock_proposal() -> TimelockProposal {
    let batch = |chain_selector, bytes: &[u8]| BatchOperation {
        chain_selector,
        transactions: bytes.iter().map(|byte| call(*byte)).collect(),
    };
    TimelockProposal {
        base: base(ProposalKind::TimelockProposal),
        action: TimelockAction::Schedule,
        delay: std::time::Duration::from_secs(60),
        timelock_addresses: BTreeMap::from([(SEPOLIA, mcm(0xb1)), (MAINNET, mcm(0xb2))]),
        operations: vec![batch(SEPOLIA, &[1, 2]), batch(MAINNET, &[3]), batch(SEPOLIA, &[4])],
        salt_override: None,
    }
}

pub(crate) fn encoders(params: &BTreeMap<ChainSelector, EncoderParams>) -> Encoders {
    params
        .iter()
        .map(|(selector, params)| {
            let chain_id = if *selector == SEPOLIA { 11155111 } else { 1 };
            let encoder = EvmEncoder::with_chain_id(*selector, chain_id, params.tx_count, params.override_previous_root);
            (*selector, Box::new(encoder) as Box<dyn Encoder>)
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    SetRoot { mcm: String, root: B256, signers: Vec<Address> },
    Execute { mcm: String, nonce: u32 },
}

/// An executor that checks what it is given against the signed root and
/// records every call.
#[derive(Clone, Default)]
pub(crate) struct MockExecutor {
    pub(crate) calls: Arc<Mutex<Vec<Call>>>,
    root: Arc<Mutex<B256>>,
    /// Re-create the contract on every call, as a Canton ledger does.
    pub(crate) recreate: bool,
    /// Report Canton results without naming the successor contract.
    pub(crate) drop_successor: bool,
}

impl MockExecutor {
    pub(crate) fn recreating() -> Self {
        Self { recreate: true, ..Default::default() }
    }

    fn result(&self, mcm: &str) -> TransactionResult {
        let family = if self.drop_successor { ChainFamily::Canton } else { ChainFamily::Evm };
        let mut result = TransactionResult::new(format!("0x{:02x}", self.calls.lock().len()), family);
        if self.recreate {
            result.recreated = Some(ContractIdentity { contract_id: format!("{mcm}'"), template_id: "MCMS".into() });
        }
        result
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute_operation(
        &self,
        metadata: &ChainMetadata,
        nonce: u32,
        proof: &[B256],
        _op: &Operation,
    ) -> Result<TransactionResult> {
        if *self.root.lock() == B256::ZERO || proof.is_empty() {
            return Err(Error::InvalidProposal("no root to prove against".into()));
        }
        self.calls.lock().push(Call::Execute { mcm: metadata.mcm_address.clone(), nonce });
        Ok(self.result(&metadata.mcm_address))
    }

    async fn set_root(
        &self,
        metadata: &ChainMetadata,
        proof: &[B256],
        root: B256,
        valid_until: u32,
        sorted_signatures: &[Signature],
    ) -> Result<TransactionResult> {
        let signers = recover_sorted_signers(sorted_signatures, root_signing_hash(root, valid_until))?;
        if proof.is_empty() {
            return Err(Error::InvalidProposal("empty proof".into()));
        }
        *self.root.lock() = root;
        self.calls.lock().push(Call::SetRoot { mcm: metadata.mcm_address.clone(), root, signers });
        Ok(self.result(&metadata.mcm_address))
    }
}

/// Serves a fixed quorum config for every contract.
pub(crate) struct MockInspector(pub(crate) QuorumConfig);

#[async_trait]
impl Inspector for MockInspector {
    async fn get_config(&self, _mcm_address: &str) -> Result<QuorumConfig> {
        Ok(self.0.clone())
    }

    async fn get_op_count(&self, _mcm_address: &str) -> Result<u64> {
        Ok(0)
    }

    async fn get_root(&self, _mcm_address: &str) -> Result<(B256, u32)> {
        Ok((B256::ZERO, 0))
    }

    async fn get_root_metadata(&self, mcm_address: &str) -> Result<ChainMetadata> {
        Ok(ChainMetadata::new(0, mcm_address))
    }
}

/// A timelock keyed by operation id, shared between its inspector and executor roles.
#[derive(Default)]
pub(crate) struct MockTimelock {
    pub(crate) operations: Mutex<HashMap<B256, OperationState>>,
    /// `(timelock address, predecessor)` of every executed batch.
    pub(crate) executed: Mutex<Vec<(String, B256)>>,
    pub(crate) recreate: bool,
}

impl MockTimelock {
    pub(crate) fn set(&self, id: B256, state: OperationState) {
        self.operations.lock().insert(id, state);
    }

    fn state(&self, id: B256) -> OperationState {
        self.operations.lock().get(&id).copied().unwrap_or(OperationState::Absent)
    }
}

#[async_trait]
impl TimelockInspector for MockTimelock {
    async fn get_proposers(&self, _address: &str) -> Result<Vec<String>> {
        Ok(vec![])
    }

    async fn get_executors(&self, _address: &str) -> Result<Vec<String>> {
        Ok(vec![])
    }

    async fn get_bypassers(&self, _address: &str) -> Result<Vec<String>> {
        Ok(vec![])
    }

    async fn get_cancellers(&self, _address: &str) -> Result<Vec<String>> {
        Ok(vec![])
    }

    async fn is_operation(&self, _address: &str, id: B256) -> Result<bool> {
        Ok(self.state(id) != OperationState::Absent)
    }

    async fn is_operation_pending(&self, _address: &str, id: B256) -> Result<bool> {
        Ok(matches!(self.state(id), OperationState::Pending | OperationState::Ready))
    }

    async fn is_operation_ready(&self, _address: &str, id: B256) -> Result<bool> {
        Ok(self.state(id) == OperationState::Ready)
    }

    async fn is_operation_done(&self, _address: &str, id: B256) -> Result<bool> {
        Ok(self.state(id) == OperationState::Done)
    }

    async fn get_min_delay(&self, _address: &str) -> Result<u64> {
        Ok(0)
    }
}

#[async_trait]
impl TimelockExecutor for MockTimelock {
    async fn execute(
        &self,
        batch: &BatchOperation,
        timelock_address: &str,
        predecessor: B256,
        salt: B256,
    ) -> Result<TransactionResult> {
        let id = hash_operation_batch(&batch_calls(batch)?, predecessor, salt);
        OperationState::fetch(self, timelock_address, id).await?.ensure_executable(id)?;
        self.set(id, OperationState::Done);
        self.executed.lock().push((timelock_address.to_owned(), predecessor));

        let mut result = TransactionResult::new(id.to_string(), ChainFamily::Evm);
        if self.recreate {
            result.recreated =
                Some(ContractIdentity { contract_id: format!("{timelock_address}'"), template_id: "MCMS".into() });
        }
        Ok(result)
    }
}
