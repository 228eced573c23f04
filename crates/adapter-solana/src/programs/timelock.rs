//! The timelock program.

use alloy_primitives::B256;
use borsh::{BorshDeserialize, BorshSerialize};
use mcms_core::Result;

use crate::{
    accounts::InstructionData,
    address::ContractAddress,
    instruction::{AccountMeta, Instruction, InstructionArgs, without_pda_signer},
    pubkey::{Pubkey, SYSTEM_PROGRAM_ID},
};

macro_rules! operation_args {
    ($(#[$doc:meta])* $ty:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
        pub struct $ty {
            pub timelock_id: [u8; 32],
            pub id: [u8; 32],
        }

        impl InstructionArgs for $ty {
            const NAME: &'static str = $name;
        }
    };
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializeOperation {
    pub timelock_id: [u8; 32],
    pub id: [u8; 32],
    pub predecessor: [u8; 32],
    pub salt: [u8; 32],
    pub instruction_count: u32,
}

impl InstructionArgs for InitializeOperation {
    const NAME: &'static str = "initialize_operation";
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AppendInstructions {
    pub timelock_id: [u8; 32],
    pub id: [u8; 32],
    pub instructions_batch: Vec<InstructionData>,
}

impl InstructionArgs for AppendInstructions {
    const NAME: &'static str = "append_instructions";
}

operation_args!(FinalizeOperation, "finalize_operation");

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ScheduleBatch {
    pub timelock_id: [u8; 32],
    pub id: [u8; 32],
    /// Seconds.
    pub delay: u64,
}

impl InstructionArgs for ScheduleBatch {
    const NAME: &'static str = "schedule_batch";
}

operation_args!(Cancel, "cancel");

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BypasserInitializeOperation {
    pub timelock_id: [u8; 32],
    pub id: [u8; 32],
    pub instruction_count: u32,
}

impl InstructionArgs for BypasserInitializeOperation {
    const NAME: &'static str = "bypasser_initialize_operation";
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BypasserAppendInstructions {
    pub timelock_id: [u8; 32],
    pub id: [u8; 32],
    pub instructions_batch: Vec<InstructionData>,
}

impl InstructionArgs for BypasserAppendInstructions {
    const NAME: &'static str = "bypasser_append_instructions";
}

operation_args!(BypasserFinalizeOperation, "bypasser_finalize_operation");
operation_args!(
    /// Runs a bypasser operation immediately, skipping the delay.
    BypasserExecuteBatch,
    "bypasser_execute_batch"
);
operation_args!(ExecuteBatch, "execute_batch");

/// Accounts the timelock signer passes on to the batch's programs, in first
/// appearance order with duplicates merged.
///
/// The timelock signs for its PDA itself, so no remaining account is marked
/// as a signer of the outer transaction.
pub fn remaining_accounts(instructions: &[InstructionData]) -> Vec<AccountMeta> {
    let mut out: Vec<AccountMeta> = Vec::new();
    let mut push = |key: Pubkey, writable: bool| match out.iter_mut().find(|meta| meta.pubkey == key) {
        Some(existing) => existing.is_writable |= writable,
        None => out.push(AccountMeta { pubkey: key, is_signer: false, is_writable: writable }),
    };
    for instruction in instructions {
        push(instruction.program_id, false);
        for account in &instruction.accounts {
            push(account.pubkey, account.is_writable);
        }
    }
    out
}

/// Builds instructions for one timelock instance.
#[derive(Clone, Debug)]
pub struct TimelockProgram {
    pub address: ContractAddress,
    pub authority: Pubkey,
    config: Pubkey,
}

impl TimelockProgram {
    pub fn new(address: ContractAddress, authority: Pubkey) -> Result<Self> {
        Ok(Self { config: address.timelock_config()?, address, authority })
    }

    pub const fn config(&self) -> Pubkey {
        self.config
    }

    fn authority_meta(&self) -> AccountMeta {
        without_pda_signer(AccountMeta::new(self.authority, true))
    }

    fn staging_accounts(&self, operation: Pubkey, role: Pubkey, with_system: bool) -> Vec<AccountMeta> {
        let mut accounts = vec![
            AccountMeta::new(operation, false),
            AccountMeta::new_readonly(self.config, false),
            AccountMeta::new_readonly(role, false),
            self.authority_meta(),
        ];
        if with_system {
            accounts.push(AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false));
        }
        accounts
    }

    /// Initializes, fills, finalizes and schedules operation `id`.
    pub fn schedule_sequence(
        &self,
        id: B256,
        predecessor: B256,
        salt: B256,
        instructions: &[InstructionData],
        delay: u64,
        proposer_role: Pubkey,
    ) -> Result<Vec<(&'static str, Instruction)>> {
        let timelock_id = self.address.seed;
        let program_id = self.address.program_id;
        let operation = self.address.timelock_operation(id)?;
        let mut sequence = Vec::with_capacity(instructions.len() + 3);

        let args = InitializeOperation {
            timelock_id,
            id: id.0,
            predecessor: predecessor.0,
            salt: salt.0,
            instruction_count: instructions.len() as u32,
        };
        sequence.push((
            InitializeOperation::NAME,
            args.build(program_id, self.staging_accounts(operation, proposer_role, true))?,
        ));
        for instruction in instructions {
            let args = AppendInstructions { timelock_id, id: id.0, instructions_batch: vec![instruction.clone()] };
            sequence.push((
                AppendInstructions::NAME,
                args.build(program_id, self.staging_accounts(operation, proposer_role, true))?,
            ));
        }
        sequence.push((
            FinalizeOperation::NAME,
            FinalizeOperation { timelock_id, id: id.0 }
                .build(program_id, self.staging_accounts(operation, proposer_role, false))?,
        ));
        sequence.push((
            ScheduleBatch::NAME,
            ScheduleBatch { timelock_id, id: id.0, delay }
                .build(program_id, self.staging_accounts(operation, proposer_role, false))?,
        ));
        Ok(sequence)
    }

    /// Stages operation `id` under the bypasser role and executes it at once.
    pub fn bypass_sequence(
        &self,
        id: B256,
        instructions: &[InstructionData],
        bypasser_role: Pubkey,
    ) -> Result<Vec<(&'static str, Instruction)>> {
        let timelock_id = self.address.seed;
        let program_id = self.address.program_id;
        let operation = self.address.timelock_bypasser_operation(id)?;
        let mut sequence = Vec::with_capacity(instructions.len() + 3);

        let args = BypasserInitializeOperation { timelock_id, id: id.0, instruction_count: instructions.len() as u32 };
        sequence.push((
            BypasserInitializeOperation::NAME,
            args.build(program_id, self.staging_accounts(operation, bypasser_role, true))?,
        ));
        for instruction in instructions {
            let args = BypasserAppendInstructions { timelock_id, id: id.0, instructions_batch: vec![instruction.clone()] };
            sequence.push((
                BypasserAppendInstructions::NAME,
                args.build(program_id, self.staging_accounts(operation, bypasser_role, true))?,
            ));
        }
        sequence.push((
            BypasserFinalizeOperation::NAME,
            BypasserFinalizeOperation { timelock_id, id: id.0 }
                .build(program_id, self.staging_accounts(operation, bypasser_role, false))?,
        ));

        let mut accounts = vec![
            AccountMeta::new_readonly(self.config, false),
            AccountMeta::new(operation, false),
            AccountMeta::new_readonly(self.address.timelock_signer()?, false),
            AccountMeta::new_readonly(bypasser_role, false),
            self.authority_meta(),
        ];
        accounts.extend(remaining_accounts(instructions));
        sequence.push((
            BypasserExecuteBatch::NAME,
            BypasserExecuteBatch { timelock_id, id: id.0 }.build(program_id, accounts)?,
        ));
        Ok(sequence)
    }

    pub fn cancel(&self, id: B256, canceller_role: Pubkey) -> Result<Instruction> {
        let operation = self.address.timelock_operation(id)?;
        Cancel { timelock_id: self.address.seed, id: id.0 }
            .build(self.address.program_id, self.staging_accounts(operation, canceller_role, false))
    }

    /// Executes scheduled operation `id` once its delay has passed.
    pub fn execute_batch(
        &self,
        id: B256,
        predecessor: B256,
        instructions: &[InstructionData],
        executor_role: Pubkey,
    ) -> Result<Instruction> {
        let mut accounts = vec![
            AccountMeta::new(self.address.timelock_operation(id)?, false),
            AccountMeta::new_readonly(self.address.timelock_operation(predecessor)?, false),
            AccountMeta::new_readonly(self.config, false),
            AccountMeta::new_readonly(self.address.timelock_signer()?, false),
            AccountMeta::new_readonly(executor_role, false),
            self.authority_meta(),
        ];
        accounts.extend(remaining_accounts(instructions));
        ExecuteBatch { timelock_id: self.address.seed, id: id.0 }.build(self.address.program_id, accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{accounts::InstructionAccount, pubkey::test_wallet};

    const PROGRAM: &str = "LoCoNsJFuhTkSQjfdDfn3yuwqhSYoPujmviRHVCzsqn";
    fn program() -> TimelockProgram {
        TimelockProgram::new(format!("{PROGRAM}.test-mcm").parse().unwrap(), test_wallet()).unwrap()
    }

    fn instruction(program: u8, account: u8, writable: bool) -> InstructionData {
        InstructionData {
            program_id: Pubkey::new_from_array([program; 32]),
            data: vec![program],
            accounts: vec![InstructionAccount {
                pubkey: Pubkey::new_from_array([account; 32]),
                is_signer: true,
                is_writable: writable,
            }],
        }
    }

    #[test]
    fn test_schedule_sequence_order() {
        let instructions = [instruction(1, 2, false), instruction(3, 4, true)];
        let role = Pubkey::new_from_array([9; 32]);
        let sequence =
            program().schedule_sequence(B256::repeat_byte(1), B256::ZERO, B256::ZERO, &instructions, 60, role).unwrap();

        let names: Vec<_> = sequence.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            ["initialize_operation", "append_instructions", "append_instructions", "finalize_operation", "schedule_batch"]
        );
        assert_eq!(InitializeOperation::decode(&sequence[0].1).unwrap().instruction_count, 2);
        assert_eq!(AppendInstructions::decode(&sequence[2].1).unwrap().instructions_batch, vec![instructions[1].clone()]);
        assert_eq!(ScheduleBatch::decode(&sequence[4].1).unwrap().delay, 60);
        assert!(sequence.iter().all(|(_, ix)| ix.accounts[2].pubkey == role));
    }

    #[test]
    fn test_bypass_sequence_executes_last() {
        let role = Pubkey::new_from_array([9; 32]);
        let sequence = program().bypass_sequence(B256::repeat_byte(1), &[instruction(1, 2, false)], role).unwrap();
        let (name, last) = sequence.last().unwrap();
        assert_eq!(*name, "bypasser_execute_batch");
        assert!(BypasserExecuteBatch::decode(last).is_some());
        assert_eq!(
            last.accounts[1].pubkey,
            program().address.timelock_bypasser_operation(B256::repeat_byte(1)).unwrap()
        );
    }

    #[test]
    fn test_remaining_accounts_merge_duplicates() {
        let accounts = remaining_accounts(&[instruction(1, 2, false), instruction(1, 2, true)]);
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0], AccountMeta::new_readonly(Pubkey::new_from_array([1; 32]), false));
        assert_eq!(accounts[1], AccountMeta::new(Pubkey::new_from_array([2; 32]), false));
    }

    #[test]
    fn test_pda_authority_is_not_a_signer() {
        let signer = program().address.timelock_signer().unwrap();
        let timelock = TimelockProgram::new(program().address, signer).unwrap();
        let ix = timelock.cancel(B256::ZERO, Pubkey::new_from_array([9; 32])).unwrap();
        assert!(!ix.accounts[3].is_signer);
        assert!(program().cancel(B256::ZERO, Pubkey::new_from_array([9; 32])).unwrap().accounts[3].is_signer);
    }
}
