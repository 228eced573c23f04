//! In-memory participant hosting MCMS contracts for adapter tests.

use std::collections::HashMap;

use alloy_primitives::B256;
use async_trait::async_trait;
use eyre::{Result, bail, eyre};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::{
    choices::{
        Choice, ExecuteMcmsOp, ExecuteOp, ExecuteScheduledBatch, GetMinDelay, IsOperation, IsOperationDone,
        IsOperationPending, IsOperationReady, Op, SetConfig, SetRoot, TimelockCall,
    },
    client::{CantonLedger, CreatedEvent, ExerciseCommand, LedgerEvent, LedgerTransaction},
    contract::{ExpiringRoot, McmsState, MultisigConfig},
    timelock_converter::{TimelockParams, hash_timelock_op_id},
};

pub(crate) const PARTY: &str = "alice::1220abcd";
pub(crate) const TEMPLATE_ID: &str = "5f2a9c0e:MCMS.Main:MCMS";

#[derive(Clone, Copy, Debug)]
pub(crate) struct ScheduledOp {
    pub ready_at: i64,
    pub done: bool,
}

#[derive(Default)]
pub(crate) struct MockState {
    pub contracts: HashMap<String, McmsState>,
    pub operations: HashMap<B256, ScheduledOp>,
    /// Ledger time in unix seconds.
    pub clock: i64,
    /// Calls the timelock dispatched, in order.
    pub executed_calls: Vec<TimelockCall>,
    /// Commit consuming choices without reporting the successor contract.
    pub omit_created: bool,
    next_id: u64,
}

impl MockState {
    /// Adds a contract and returns its id.
    pub fn create(&mut self, state: McmsState) -> String {
        let contract_id = format!("mcms-{}", self.next_id);
        self.next_id += 1;
        self.contracts.insert(contract_id.clone(), state);
        contract_id
    }

    fn contract(&self, contract_id: &str) -> Result<&McmsState> {
        self.contracts.get(contract_id).ok_or_else(|| eyre!("contract {contract_id} not found"))
    }

    fn status(&self, op_id: &str) -> Result<Option<ScheduledOp>> {
        Ok(self.operations.get(&op_id.parse::<B256>()?).copied())
    }

    fn apply_op(&mut self, state: &mut McmsState, op: &Op) -> Result<()> {
        if op.nonce != state.expiring_root.op_count {
            bail!("nonce {} does not match op count {}", op.nonce, state.expiring_root.op_count);
        }
        state.expiring_root.op_count.0 += 1;
        let params = match op.function_name.as_str() {
            TimelockParams::SCHEDULE | TimelockParams::BYPASS | TimelockParams::CANCEL => {
                TimelockParams::decode(&op.function_name, &op.operation_data)?
            }
            _ => return Ok(()),
        };
        match params {
            TimelockParams::Schedule { calls, predecessor, salt, delay_secs } => {
                if delay_secs < state.min_delay.as_secs() {
                    bail!("insufficient delay");
                }
                let id = hash_timelock_op_id(&calls, predecessor.parse()?, salt.parse()?);
                self.operations.insert(id, ScheduledOp { ready_at: self.clock + delay_secs, done: false });
            }
            TimelockParams::Bypass { calls } => self.executed_calls.extend(calls),
            TimelockParams::Cancel { op_id } => {
                let id: B256 = op_id.parse()?;
                if self.operations.get(&id).is_none_or(|op| op.done) {
                    bail!("operation {op_id} does not exist");
                }
                self.operations.remove(&id);
            }
        }
        Ok(())
    }
}

/// A participant acting as [`PARTY`].
///
/// Consuming choices archive the contract and create `mcms-N` in its place,
/// so tests follow the id through each mutation.
#[derive(Default)]
pub(crate) struct MockLedger {
    state: Mutex<MockState>,
    exercised: Mutex<Vec<ExerciseCommand>>,
    fail_next: Mutex<Option<String>>,
    fail_choice: Mutex<Option<(String, String)>>,
}

impl MockLedger {
    /// A ledger holding one contract with `state`, and its id.
    pub fn with_contract(state: McmsState) -> (Self, String) {
        let ledger = Self::default();
        let contract_id = ledger.state.lock().create(state);
        (ledger, contract_id)
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn contract(&self, contract_id: &str) -> Option<McmsState> {
        self.state.lock().contracts.get(contract_id).cloned()
    }

    pub fn exercised(&self) -> Vec<ExerciseCommand> {
        self.exercised.lock().clone()
    }

    /// Commands exercising `C`, decoded.
    pub fn exercised_as<C: Choice>(&self) -> Vec<C> {
        self.exercised()
            .into_iter()
            .filter(|command| command.choice == C::NAME)
            .map(|command| serde_json::from_value(command.argument).unwrap())
            .collect()
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_owned());
    }

    /// Rejects the next exercise of `choice` with `message`.
    pub fn fail_choice(&self, choice: &str, message: &str) {
        *self.fail_choice.lock() = Some((choice.to_owned(), message.to_owned()));
    }

    fn consume<F>(&self, command: &ExerciseCommand, f: F) -> Result<LedgerTransaction>
    where
        F: FnOnce(&mut MockState, &mut McmsState) -> Result<()>,
    {
        let mut ledger = self.state.lock();
        let mut contract = ledger.contract(&command.contract_id)?.clone();
        f(&mut *ledger, &mut contract)?;

        ledger.contracts.remove(&command.contract_id);
        let payload = serde_json::to_value(&contract)?;
        let contract_id = ledger.create(contract);

        let mut events = vec![
            LedgerEvent::Exercised { choice: command.choice.clone(), result: Value::Null },
            LedgerEvent::Archived { contract_id: command.contract_id.clone() },
        ];
        if !ledger.omit_created {
            events.push(LedgerEvent::Created(CreatedEvent {
                contract_id,
                template_id: TEMPLATE_ID.to_owned(),
                payload,
            }));
        }
        Ok(transaction(events))
    }

    fn query(&self, command: &ExerciseCommand, result: Value) -> LedgerTransaction {
        transaction(vec![LedgerEvent::Exercised { choice: command.choice.clone(), result }])
    }

    fn status_query<C: Choice>(
        &self,
        command: &ExerciseCommand,
        op_id: impl FnOnce(&C) -> &str,
        f: impl FnOnce(Option<ScheduledOp>, i64) -> bool,
    ) -> Result<LedgerTransaction> {
        let choice: C = argument(command)?;
        let state = self.state.lock();
        state.contract(&command.contract_id)?;
        let answer = f(state.status(op_id(&choice))?, state.clock);
        drop(state);
        Ok(self.query(command, json!(answer)))
    }
}

fn argument<C: DeserializeOwned>(command: &ExerciseCommand) -> Result<C> {
    Ok(serde_json::from_value(command.argument.clone())?)
}

fn transaction(events: Vec<LedgerEvent>) -> LedgerTransaction {
    LedgerTransaction { command_id: "cmd-1".to_owned(), update_id: "upd-1".to_owned(), events }
}

#[async_trait]
impl CantonLedger for MockLedger {
    fn party(&self) -> &str {
        PARTY
    }

    async fn exercise(&self, command: ExerciseCommand) -> Result<LedgerTransaction> {
        self.exercised.lock().push(command.clone());
        if let Some(message) = self.fail_next.lock().take() {
            bail!(message);
        }
        let failure = self.fail_choice.lock().take_if(|(choice, _)| *choice == command.choice);
        if let Some((_, message)) = failure {
            bail!(message);
        }

        match command.choice.as_str() {
            SetConfig::NAME => {
                let choice: SetConfig = argument(&command)?;
                self.consume(&command, |_, contract| {
                    contract.config = MultisigConfig {
                        signers: choice.new_signers,
                        group_quorums: choice.new_group_quorums,
                        group_parents: choice.new_group_parents,
                    };
                    if choice.clear_root {
                        let op_count = contract.expiring_root.op_count;
                        contract.expiring_root = ExpiringRoot { op_count, ..Default::default() };
                    }
                    Ok(())
                })
            }
            SetRoot::NAME => {
                let choice: SetRoot = argument(&command)?;
                self.consume(&command, |_, contract| {
                    contract.expiring_root = ExpiringRoot {
                        root: choice.new_root,
                        valid_until: choice.valid_until,
                        op_count: choice.metadata.pre_op_count,
                    };
                    contract.root_metadata = choice.metadata;
                    Ok(())
                })
            }
            ExecuteOp::NAME => {
                let choice: ExecuteOp = argument(&command)?;
                self.consume(&command, |ledger, contract| ledger.apply_op(contract, &choice.op))
            }
            ExecuteMcmsOp::NAME => {
                let choice: ExecuteMcmsOp = argument(&command)?;
                self.consume(&command, |ledger, contract| ledger.apply_op(contract, &choice.op))
            }
            ExecuteScheduledBatch::NAME => {
                let choice: ExecuteScheduledBatch = argument(&command)?;
                self.consume(&command, |ledger, _| {
                    let id: B256 = choice.op_id.parse()?;
                    let clock = ledger.clock;
                    let Some(op) = ledger.operations.get_mut(&id) else {
                        bail!("operation {} does not exist", choice.op_id);
                    };
                    if op.done || op.ready_at > clock {
                        bail!("operation is not ready");
                    }
                    op.done = true;
                    ledger.executed_calls.extend(choice.calls);
                    Ok(())
                })
            }
            IsOperation::NAME => self.status_query::<IsOperation>(&command, |c| c.op_id.as_str(), |op, _| op.is_some()),
            IsOperationPending::NAME => {
                self.status_query::<IsOperationPending>(&command, |c| c.op_id.as_str(), |op, _| op.is_some_and(|op| !op.done))
            }
            IsOperationReady::NAME => self.status_query::<IsOperationReady>(
                &command,
                |c| c.op_id.as_str(),
                |op, clock| op.is_some_and(|op| !op.done && op.ready_at <= clock),
            ),
            IsOperationDone::NAME => {
                self.status_query::<IsOperationDone>(&command, |c| c.op_id.as_str(), |op, _| op.is_some_and(|op| op.done))
            }
            GetMinDelay::NAME => {
                let _: GetMinDelay = argument(&command)?;
                let min_delay = self.state.lock().contract(&command.contract_id)?.min_delay;
                Ok(self.query(&command, serde_json::to_value(min_delay)?))
            }
            other => bail!("unknown choice {other}"),
        }
    }

    async fn fetch_contract(&self, _template_id: &str, contract_id: &str) -> Result<Option<CreatedEvent>> {
        let state = self.state.lock();
        let Some(contract) = state.contracts.get(contract_id) else {
            return Ok(None);
        };
        Ok(Some(CreatedEvent {
            contract_id: contract_id.to_owned(),
            template_id: TEMPLATE_ID.to_owned(),
            payload: serde_json::to_value(contract)?,
        }))
    }
}
