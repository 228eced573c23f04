//! In-memory mcm and timelock programs for adapter tests.

use std::collections::HashMap;

use async_trait::async_trait;
use eyre::{Result, bail, eyre};
use parking_lot::Mutex;

use crate::{
    accounts::{
        ExpiringRootAndOpCount, McmSigner, MultisigConfig, Operation, OperationStatus, RootMetadata, TimelockConfig,
    },
    client::{SolanaReader, SolanaSubmitter},
    instruction::{AnchorAccount, Instruction, InstructionArgs},
    programs::{mcm, timelock},
    pubkey::{Pubkey, test_wallet},
};

#[derive(Default)]
pub(crate) struct MockState {
    pub(crate) accounts: HashMap<Pubkey, Vec<u8>>,
    pub(crate) clock: i64,
    staged_signers: HashMap<Pubkey, Vec<[u8; 20]>>,
    staged_signatures: HashMap<Pubkey, usize>,
    sent: Vec<Instruction>,
    fail_next_send: Option<String>,
}

impl MockState {
    pub(crate) fn put<T: AnchorAccount>(&mut self, key: Pubkey, account: &T) {
        self.accounts.insert(key, account.to_account_data().unwrap());
    }

    pub(crate) fn get<T: AnchorAccount>(&self, key: &Pubkey) -> Option<T> {
        self.accounts.get(key).map(|data| T::from_account_data(data).unwrap())
    }

    fn operation(&self, key: &Pubkey) -> Result<Operation> {
        self.get(key).ok_or_else(|| eyre!("AnchorError: AccountNotInitialized {key}"))
    }

    fn apply(&mut self, ix: &Instruction) -> Result<()> {
        let key = |index: usize| ix.accounts[index].pubkey;

        if let Some(args) = mcm::InitSigners::decode(ix) {
            self.staged_signers.insert(key(1), Vec::with_capacity(args.total_signers.into()));
        } else if let Some(args) = mcm::AppendSigners::decode(ix) {
            let staged = self.staged_signers.get_mut(&key(1)).ok_or_else(|| eyre!("signers not initialized"))?;
            staged.extend(args.signers_batch);
        } else if mcm::FinalizeSigners::decode(ix).is_some() {
            if !self.staged_signers.contains_key(&key(1)) {
                bail!("signers not initialized");
            }
        } else if let Some(args) = mcm::SetConfig::decode(ix) {
            let addresses = self.staged_signers.remove(&key(1)).ok_or_else(|| eyre!("signers not finalized"))?;
            let signers = addresses
                .into_iter()
                .zip(args.signer_groups)
                .enumerate()
                .map(|(index, (evm_address, group))| McmSigner { evm_address, index: index as u8, group })
                .collect();
            let config = MultisigConfig {
                multisig_id: args.multisig_id,
                group_quorums: args.group_quorums,
                group_parents: args.group_parents,
                signers,
                ..Default::default()
            };
            self.put(key(0), &config);
            if args.clear_root {
                let mut expiring: ExpiringRootAndOpCount = self.get(&key(3)).unwrap_or_default();
                expiring.root = [0; 32];
                expiring.valid_until = 0;
                self.put(key(3), &expiring);
            }
        } else if mcm::InitSignatures::decode(ix).is_some() {
            self.staged_signatures.insert(key(0), 0);
        } else if let Some(args) = mcm::AppendSignatures::decode(ix) {
            let staged = self.staged_signatures.get_mut(&key(0)).ok_or_else(|| eyre!("signatures not initialized"))?;
            *staged += args.signatures_batch.len();
        } else if mcm::FinalizeSignatures::decode(ix).is_some() {
            if !self.staged_signatures.contains_key(&key(0)) {
                bail!("signatures not initialized");
            }
        } else if let Some(args) = mcm::SetRoot::decode(ix) {
            self.staged_signatures.remove(&key(0)).ok_or_else(|| eyre!("signatures not finalized"))?;
            if i64::from(args.valid_until) <= self.clock {
                bail!("Error: ValidUntilHasAlreadyPassed");
            }
            let metadata = args.metadata;
            self.put(
                key(3),
                &ExpiringRootAndOpCount { root: args.root, valid_until: args.valid_until, op_count: metadata.pre_op_count },
            );
            self.put(
                key(1),
                &RootMetadata {
                    chain_id: metadata.chain_id,
                    multisig: metadata.multisig,
                    pre_op_count: metadata.pre_op_count,
                    post_op_count: metadata.post_op_count,
                    override_previous_root: metadata.override_previous_root,
                },
            );
        } else if let Some(args) = mcm::Execute::decode(ix) {
            let mut expiring: ExpiringRootAndOpCount = self.get(&key(2)).ok_or_else(|| eyre!("no root set"))?;
            if args.nonce != expiring.op_count {
                bail!("Error: WrongNonce");
            }
            expiring.op_count += 1;
            self.put(key(2), &expiring);
        } else {
            self.apply_timelock(ix)?;
        }
        Ok(())
    }

    fn apply_timelock(&mut self, ix: &Instruction) -> Result<()> {
        let key = |index: usize| ix.accounts[index].pubkey;

        if let Some(args) = timelock::InitializeOperation::decode(ix) {
            self.initialize(key(0), args.id, args.predecessor, args.salt, args.instruction_count)?;
        } else if let Some(args) = timelock::BypasserInitializeOperation::decode(ix) {
            self.initialize(key(0), args.id, [0; 32], [0; 32], args.instruction_count)?;
        } else if let Some(args) = timelock::AppendInstructions::decode(ix) {
            let mut op = self.operation(&key(0))?;
            op.instructions.extend(args.instructions_batch);
            self.put(key(0), &op);
        } else if let Some(args) = timelock::BypasserAppendInstructions::decode(ix) {
            let mut op = self.operation(&key(0))?;
            op.instructions.extend(args.instructions_batch);
            self.put(key(0), &op);
        } else if timelock::FinalizeOperation::decode(ix).is_some()
            || timelock::BypasserFinalizeOperation::decode(ix).is_some()
        {
            let mut op = self.operation(&key(0))?;
            if op.instructions.len() != op.total_instructions as usize {
                bail!("Error: TooManyInstructions");
            }
            op.state = OperationStatus::Finalized;
            self.put(key(0), &op);
        } else if let Some(args) = timelock::ScheduleBatch::decode(ix) {
            let mut op = self.operation(&key(0))?;
            let config: TimelockConfig = self.get(&key(1)).unwrap_or_default();
            if op.state != OperationStatus::Finalized {
                bail!("Error: OperationNotFinalized");
            }
            if args.delay < config.min_delay {
                bail!("Error: DelayInsufficient");
            }
            op.state = OperationStatus::Scheduled;
            op.timestamp = self.clock as u64 + args.delay;
            self.put(key(0), &op);
        } else if timelock::Cancel::decode(ix).is_some() {
            let op = self.operation(&key(0))?;
            if op.state != OperationStatus::Scheduled {
                bail!("Error: OperationNotCancellable");
            }
            self.accounts.remove(&key(0));
        } else if timelock::ExecuteBatch::decode(ix).is_some() {
            let mut op = self.operation(&key(0))?;
            if op.state != OperationStatus::Scheduled || op.timestamp > self.clock as u64 {
                bail!("Error: OperationNotReady");
            }
            op.state = OperationStatus::Done;
            self.put(key(0), &op);
        } else if timelock::BypasserExecuteBatch::decode(ix).is_some() {
            let op = self.operation(&key(1))?;
            if op.state != OperationStatus::Finalized {
                bail!("Error: OperationNotFinalized");
            }
            self.accounts.remove(&key(1));
        } else {
            bail!("unknown instruction for program {}", ix.program_id);
        }
        Ok(())
    }

    fn initialize(&mut self, key: Pubkey, id: [u8; 32], predecessor: [u8; 32], salt: [u8; 32], count: u32) -> Result<()> {
        if self.accounts.contains_key(&key) {
            bail!("account {key} already in use");
        }
        let op = Operation { id, predecessor, salt, total_instructions: count, ..Default::default() };
        self.put(key, &op);
        Ok(())
    }
}

/// One cluster hosting the mcm and timelock programs, signing as `authority`.
pub(crate) struct MockLedger {
    authority: Pubkey,
    state: Mutex<MockState>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self { authority: test_wallet(), state: Mutex::default() }
    }
}

impl MockLedger {
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub(crate) fn sent(&self) -> Vec<Instruction> {
        self.state.lock().sent.clone()
    }

    /// Makes the next submission fail with `reason`.
    pub(crate) fn fail_next_send(&self, reason: &str) {
        self.state.lock().fail_next_send = Some(reason.to_owned());
    }
}

#[async_trait]
impl SolanaReader for MockLedger {
    async fn account_data(&self, key: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.state.lock().accounts.get(key).cloned())
    }

    async fn clock_unix_timestamp(&self) -> Result<i64> {
        Ok(self.state.lock().clock)
    }
}

#[async_trait]
impl SolanaSubmitter for MockLedger {
    fn authority(&self) -> Pubkey {
        self.authority
    }

    async fn send(&self, instructions: Vec<Instruction>) -> Result<String> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_send.take() {
            bail!(reason);
        }
        for ix in &instructions {
            state.apply(ix)?;
        }
        state.sent.extend(instructions);
        Ok(format!("signature-{}", state.sent.len()))
    }
}
