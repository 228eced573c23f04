//! Account layouts of the mcm, timelock and access-controller programs.

use alloy_primitives::{Address, B256};
use borsh::{BorshDeserialize, BorshSerialize};
use mcms_core::{Error, FlatConfig, Result, config::MAX_GROUPS};

use crate::{instruction::AnchorAccount, pubkey::Pubkey};

/// Capacity of an access controller's member list.
pub const MAX_ACCESS_LIST_LEN: usize = 64;

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct McmSigner {
    pub evm_address: [u8; 20],
    pub index: u8,
    pub group: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MultisigConfig {
    pub chain_id: u64,
    pub multisig_id: [u8; 32],
    pub owner: Pubkey,
    pub proposed_owner: Pubkey,
    pub group_quorums: [u8; MAX_GROUPS],
    pub group_parents: [u8; MAX_GROUPS],
    pub signers: Vec<McmSigner>,
}

impl AnchorAccount for MultisigConfig {
    const NAME: &'static str = "MultisigConfig";
}

impl MultisigConfig {
    pub fn flat_config(&self) -> FlatConfig {
        FlatConfig {
            signer_addresses: self.signers.iter().map(|signer| Address::from(signer.evm_address)).collect(),
            signer_groups: self.signers.iter().map(|signer| signer.group).collect(),
            group_quorums: self.group_quorums,
            group_parents: self.group_parents,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ExpiringRootAndOpCount {
    pub root: [u8; 32],
    pub valid_until: u32,
    pub op_count: u64,
}

impl AnchorAccount for ExpiringRootAndOpCount {
    const NAME: &'static str = "ExpiringRootAndOpCount";
}

/// Root metadata as stored by the multisig program.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RootMetadata {
    pub chain_id: u64,
    pub multisig: Pubkey,
    pub pre_op_count: u64,
    pub post_op_count: u64,
    pub override_previous_root: bool,
}

impl AnchorAccount for RootMetadata {
    const NAME: &'static str = "RootMetadata";
}

/// Role access controllers of a timelock instance.
///
/// The account continues with the blocked selector list, which is not read.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TimelockConfig {
    pub timelock_id: [u8; 32],
    pub owner: Pubkey,
    pub proposed_owner: Pubkey,
    pub proposer_role_access_controller: Pubkey,
    pub executor_role_access_controller: Pubkey,
    pub canceller_role_access_controller: Pubkey,
    pub bypasser_role_access_controller: Pubkey,
    pub min_delay: u64,
}

impl AnchorAccount for TimelockConfig {
    const NAME: &'static str = "Config";
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum OperationStatus {
    #[default]
    Initialized = 0,
    Finalized = 1,
    Scheduled = 2,
    Done = 3,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InstructionAccount {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// One instruction stored in a timelock operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InstructionData {
    pub program_id: Pubkey,
    pub data: Vec<u8>,
    pub accounts: Vec<InstructionAccount>,
}

/// A timelock operation, staged instruction by instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Operation {
    pub state: OperationStatus,
    /// Unix second from which a scheduled operation may execute.
    pub timestamp: u64,
    pub id: [u8; 32],
    pub predecessor: [u8; 32],
    pub salt: [u8; 32],
    pub total_instructions: u32,
    pub instructions: Vec<InstructionData>,
}

impl AnchorAccount for Operation {
    const NAME: &'static str = "Operation";
}

impl Operation {
    pub fn id(&self) -> B256 {
        B256::from(self.id)
    }
}

/// A fixed-capacity member list; only the first `len` slots are in use.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AccessList {
    pub xs: [Pubkey; MAX_ACCESS_LIST_LEN],
    pub len: u64,
}

impl Default for AccessList {
    fn default() -> Self {
        Self { xs: [Pubkey::default(); MAX_ACCESS_LIST_LEN], len: 0 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AccessController {
    pub owner: Pubkey,
    pub proposed_owner: Pubkey,
    pub access_list: AccessList,
}

impl AnchorAccount for AccessController {
    const NAME: &'static str = "AccessController";
}

impl AccessController {
    /// Members in slot order.
    pub fn members(&self) -> Result<&[Pubkey]> {
        let len = usize::try_from(self.access_list.len)
            .ok()
            .filter(|len| *len <= MAX_ACCESS_LIST_LEN)
            .ok_or_else(|| Error::decode("AccessController", format!("access list length {}", self.access_list.len)))?;
        Ok(&self.access_list.xs[..len])
    }

    pub fn with_members(members: &[Pubkey]) -> Self {
        let mut access_list = AccessList::default();
        for (slot, member) in access_list.xs.iter_mut().zip(members) {
            *slot = *member;
        }
        access_list.len = members.len().min(MAX_ACCESS_LIST_LEN) as u64;
        Self { access_list, ..Default::default() }
    }
}
