//! In-memory multisig and timelock contracts for adapter tests.

use std::collections::HashMap;

use alloy::sol_types::{SolCall, SolInterface};
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use async_trait::async_trait;
use eyre::{Result, bail};
use parking_lot::Mutex;

use crate::{
    bindings::{
        ManyChainMultiSig::{self, Config, ManyChainMultiSigCalls, RootMetadata, Signer},
        RBACTimelock::{self, RBACTimelockCalls},
    },
    client::EvmClient,
    timelock_converter::hash_operation_batch,
};

/// Timestamp the timelock records for executed operations.
const DONE_TIMESTAMP: u64 = 1;

#[derive(Default)]
pub(crate) struct MockState {
    pub(crate) config: Config,
    pub(crate) root: B256,
    pub(crate) valid_until: u32,
    pub(crate) root_metadata: RootMetadata,
    pub(crate) op_count: u64,
    /// Operation id to the timestamp it becomes ready at.
    pub(crate) operations: HashMap<B256, u64>,
    pub(crate) min_delay: u64,
    pub(crate) roles: HashMap<B256, Vec<Address>>,
    pub(crate) timestamp: u64,
    sent: Vec<(Address, Bytes)>,
    fail_next_send: Option<String>,
}

impl MockState {
    fn operation(&self, id: B256) -> Option<u64> {
        self.operations.get(&id).copied()
    }

    fn is_ready(&self, id: B256) -> bool {
        self.operation(id).is_some_and(|at| at > DONE_TIMESTAMP && at <= self.timestamp)
    }

    fn call_multisig(&self, call: ManyChainMultiSigCalls) -> Result<Vec<u8>> {
        use ManyChainMultiSig::*;
        Ok(match call {
            ManyChainMultiSigCalls::getConfig(_) => getConfigCall::abi_encode_returns(&self.config),
            ManyChainMultiSigCalls::getOpCount(_) => getOpCountCall::abi_encode_returns(&self.op_count),
            ManyChainMultiSigCalls::getRoot(_) => {
                getRootCall::abi_encode_returns(&getRootReturn { root: self.root, validUntil: self.valid_until })
            }
            ManyChainMultiSigCalls::getRootMetadata(_) => getRootMetadataCall::abi_encode_returns(&self.root_metadata),
            _ => bail!("not a view call"),
        })
    }

    fn call_timelock(&self, call: RBACTimelockCalls) -> Result<Vec<u8>> {
        use RBACTimelock::*;
        Ok(match call {
            RBACTimelockCalls::isOperation(c) => isOperationCall::abi_encode_returns(&self.operation(c.id).is_some()),
            RBACTimelockCalls::isOperationPending(c) => {
                let pending = self.operation(c.id).is_some_and(|at| at > DONE_TIMESTAMP);
                isOperationPendingCall::abi_encode_returns(&pending)
            }
            RBACTimelockCalls::isOperationReady(c) => isOperationReadyCall::abi_encode_returns(&self.is_ready(c.id)),
            RBACTimelockCalls::isOperationDone(c) => {
                isOperationDoneCall::abi_encode_returns(&(self.operation(c.id) == Some(DONE_TIMESTAMP)))
            }
            RBACTimelockCalls::getMinDelay(_) => getMinDelayCall::abi_encode_returns(&U256::from(self.min_delay)),
            RBACTimelockCalls::getRoleMemberCount(c) => {
                let count = self.roles.get(&c.role).map_or(0, Vec::len);
                getRoleMemberCountCall::abi_encode_returns(&U256::from(count))
            }
            RBACTimelockCalls::getRoleMember(c) => {
                let index = usize::try_from(c.index).map_err(|_| eyre::eyre!("index out of range"))?;
                let Some(member) = self.roles.get(&c.role).and_then(|members| members.get(index)) else {
                    bail!("execution reverted: index out of bounds");
                };
                getRoleMemberCall::abi_encode_returns(member)
            }
            _ => bail!("not a view call"),
        })
    }

    fn send_multisig(&mut self, call: ManyChainMultiSigCalls) -> Result<()> {
        match call {
            ManyChainMultiSigCalls::setConfig(c) => {
                let signers = c
                    .signerAddresses
                    .into_iter()
                    .zip(c.signerGroups)
                    .enumerate()
                    .map(|(index, (addr, group))| Signer { addr, index: index as u8, group })
                    .collect();
                self.config = Config { signers, groupQuorums: c.groupQuorums, groupParents: c.groupParents };
                if c.clearRoot {
                    self.root = B256::ZERO;
                    self.valid_until = 0;
                }
            }
            ManyChainMultiSigCalls::setRoot(c) => {
                self.root = c.root;
                self.valid_until = c.validUntil;
                self.op_count = c.metadata.preOpCount;
                self.root_metadata = c.metadata;
            }
            ManyChainMultiSigCalls::execute(c) => {
                if c.op.nonce != self.op_count {
                    bail!("execution reverted: WrongNonce()");
                }
                self.op_count += 1;
            }
            _ => bail!("not a mutating call"),
        }
        Ok(())
    }

    fn send_timelock(&mut self, call: RBACTimelockCalls) -> Result<()> {
        match call {
            RBACTimelockCalls::scheduleBatch(c) => {
                let id = hash_operation_batch(&c.calls, c.predecessor, c.salt);
                if self.operations.contains_key(&id) {
                    bail!("execution reverted: RBACTimelock: operation already scheduled");
                }
                let delay = u64::try_from(c.delay).map_err(|_| eyre::eyre!("delay out of range"))?;
                if delay < self.min_delay {
                    bail!("execution reverted: RBACTimelock: insufficient delay");
                }
                self.operations.insert(id, self.timestamp + delay);
            }
            RBACTimelockCalls::cancel(c) => match self.operation(c.id) {
                Some(at) if at > DONE_TIMESTAMP => {
                    self.operations.remove(&c.id);
                }
                _ => bail!("execution reverted: RBACTimelock: operation cannot be cancelled"),
            },
            RBACTimelockCalls::executeBatch(c) => {
                let id = hash_operation_batch(&c.calls, c.predecessor, c.salt);
                if !self.is_ready(id) {
                    bail!("execution reverted: RBACTimelock: operation is not ready");
                }
                self.operations.insert(id, DONE_TIMESTAMP);
            }
            RBACTimelockCalls::bypasserExecuteBatch(_) => {}
            _ => bail!("not a mutating call"),
        }
        Ok(())
    }
}

/// One chain hosting a multisig and a timelock at every address.
#[derive(Default)]
pub(crate) struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub(crate) fn sent(&self) -> Vec<(Address, Bytes)> {
        self.state.lock().sent.clone()
    }

    /// Makes the next submission fail with `reason`.
    pub(crate) fn fail_next_send(&self, reason: &str) {
        self.state.lock().fail_next_send = Some(reason.to_owned());
    }
}

#[async_trait]
impl EvmClient for MockChain {
    async fn call(&self, _to: Address, input: Bytes) -> Result<Bytes> {
        let state = self.state.lock();
        let output = match ManyChainMultiSigCalls::abi_decode(&input) {
            Ok(call) => state.call_multisig(call)?,
            Err(_) => state.call_timelock(RBACTimelockCalls::abi_decode(&input)?)?,
        };
        Ok(output.into())
    }

    async fn send(&self, to: Address, input: Bytes, _value: U256) -> Result<B256> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_send.take() {
            bail!(reason);
        }
        match ManyChainMultiSigCalls::abi_decode(&input) {
            Ok(call) => state.send_multisig(call)?,
            Err(_) => state.send_timelock(RBACTimelockCalls::abi_decode(&input)?)?,
        }
        state.sent.push((to, input.clone()));
        Ok(keccak256([input.as_ref(), &state.sent.len().to_be_bytes()].concat()))
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        Ok(self.state.lock().timestamp)
    }
}
