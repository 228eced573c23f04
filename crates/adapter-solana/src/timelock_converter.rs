//! Lowers timelock batches into timelock program instructions executed by
//! the multisig signer.

use std::time::Duration;

use alloy_primitives::{B256, keccak256};
use itertools::Itertools;
use mcms_core::{BatchOperation, ChainMetadata, Operation, Result, TimelockAction, TimelockConverter, Transaction};
use crate::{
    accounts::InstructionData,
    address::{ContractAddress, parse_program_id},
    fields::{SolanaMetadataFields, SolanaTransactionFields},
    instruction::{Instruction, without_pda_signer},
    programs::TimelockProgram,
};

/// Contract type recorded on operations that target the timelock.
pub const TIMELOCK_CONTRACT_TYPE: &str = "RBACTimelock";

/// The stored instructions of a batch, in batch order.
pub fn batch_instructions(batch: &BatchOperation) -> Result<Vec<InstructionData>> {
    batch
        .transactions
        .iter()
        .map(|tx| {
            let fields = SolanaTransactionFields::parse(tx)?;
            Ok(InstructionData {
                program_id: parse_program_id(&tx.to)?,
                data: tx.data.to_vec(),
                accounts: fields.instruction_accounts(),
            })
        })
        .collect()
}

/// The operation id the timelock program derives for `instructions`.
///
/// Counts and lengths are `u32` little-endian; each account contributes its
/// key followed by one signer byte and one writable byte.
pub fn hash_operation(instructions: &[InstructionData], predecessor: B256, salt: B256) -> B256 {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(instructions.len() as u32).to_le_bytes());
    for instruction in instructions {
        buf.extend_from_slice(instruction.program_id.as_ref());
        buf.extend_from_slice(&(instruction.accounts.len() as u32).to_le_bytes());
        for account in &instruction.accounts {
            buf.extend_from_slice(account.pubkey.as_ref());
            buf.push(u8::from(account.is_signer));
            buf.push(u8::from(account.is_writable));
        }
        buf.extend_from_slice(&(instruction.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&instruction.data);
    }
    buf.extend_from_slice(predecessor.as_slice());
    buf.extend_from_slice(salt.as_slice());
    keccak256(buf)
}

fn to_operation(batch: &BatchOperation, instruction: Instruction, tags: Vec<String>) -> Result<Operation> {
    let fields = SolanaTransactionFields {
        accounts: instruction.accounts.into_iter().map(without_pda_signer).collect(),
        value: 0,
    };
    Ok(Operation {
        chain_selector: batch.chain_selector,
        transaction: Transaction::new(instruction.program_id.to_string(), instruction.data, fields.to_value()?)
            .with_metadata(TIMELOCK_CONTRACT_TYPE, tags),
    })
}

/// Builds timelock instructions signed by the multisig's signer PDA.
///
/// The role access controllers come from the chain metadata, so conversion
/// never reads the cluster.
#[derive(Clone, Copy, Debug, Default)]
pub struct SolanaTimelockConverter;

impl TimelockConverter for SolanaTimelockConverter {
    fn convert_batch_to_chain_operations(
        &self,
        metadata: &ChainMetadata,
        batch: &BatchOperation,
        timelock_address: &str,
        mcm_address: &str,
        delay: Duration,
        action: TimelockAction,
        predecessor: B256,
        salt: B256,
    ) -> Result<(Vec<Operation>, B256)> {
        let timelock: ContractAddress = timelock_address.parse()?;
        let mcm: ContractAddress = mcm_address.parse()?;
        let roles = SolanaMetadataFields::parse(metadata)?;
        let instructions = batch_instructions(batch)?;
        let id = hash_operation(&instructions, predecessor, salt);

        let program = TimelockProgram::new(timelock, mcm.multisig_signer()?)?;
        let sequence = match action {
            TimelockAction::Schedule => program
                .schedule_sequence(
                    id,
                    predecessor,
                    salt,
                    &instructions,
                    delay.as_secs(),
                    roles.proposer_role_access_controller,
                )?
                .into_iter()
                .map(|(_, instruction)| instruction)
                .collect(),
            TimelockAction::Cancel => vec![program.cancel(id, roles.canceller_role_access_controller)?],
            TimelockAction::Bypass => program
                .bypass_sequence(id, &instructions, roles.bypasser_role_access_controller)?
                .into_iter()
                .map(|(_, instruction)| instruction)
                .collect(),
        };

        let tags: Vec<String> = batch.tags().into_iter().unique().collect();
        let ops = sequence
            .into_iter()
            .map(|instruction| to_operation(batch, instruction, tags.clone()))
            .collect::<Result<_>>()?;
        Ok((ops, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accounts::InstructionAccount,
        instruction::InstructionArgs,
        programs::timelock::{BypasserExecuteBatch, Cancel, InitializeOperation, ScheduleBatch},
        pubkey::Pubkey,
    };
    use mcms_core::{ChainSelector, Error};
    use serde_json::{Value, json};
    use test_case::test_case;

    const MCM: &str = "6UmMZr5MEqiKWD5jqTJd1WCR5kT8oZuFYBLJFi1o6GQX.test-mcm";
    const TIMELOCK: &str = "LoCoNsJFuhTkSQjfdDfn3yuwqhSYoPujmviRHVCzsqn.test-mcm";
    const TARGET: &str = "4HeqEoSyfYpeC2goFLj9eHgkxV33mR5G7JYAbRsN14uQ";

    fn metadata() -> ChainMetadata {
        let key = |byte: u8| Pubkey::new_from_array([byte; 32]).to_string();
        ChainMetadata::new(0, MCM).with_additional_fields(json!({
            "proposerRoleAccessController": key(1),
            "cancellerRoleAccessController": key(2),
            "bypasserRoleAccessController": key(3),
        }))
    }

    fn batch() -> BatchOperation {
        let account = json!({ "publicKey": TARGET, "isSigner": false, "isWritable": true });
        BatchOperation {
            chain_selector: ChainSelector(1),
            transactions: vec![
                Transaction::new(TARGET, vec![0x01], json!({ "accounts": [account] }))
                    .with_metadata("Token", vec!["mint".into()]),
                Transaction::new(TARGET, vec![0x02], Value::Null).with_metadata("Token", vec!["mint".into(), "x".into()]),
            ],
        }
    }

    fn convert(action: TimelockAction) -> (Vec<Operation>, B256) {
        SolanaTimelockConverter
            .convert_batch_to_chain_operations(
                &metadata(),
                &batch(),
                TIMELOCK,
                MCM,
                Duration::from_secs(600),
                action,
                B256::ZERO,
                B256::repeat_byte(1),
            )
            .unwrap()
    }

    fn instruction(op: &Operation) -> Instruction {
        let fields = SolanaTransactionFields::parse(&op.transaction).unwrap();
        Instruction {
            program_id: op.transaction.to.parse().unwrap(),
            accounts: fields.accounts,
            data: op.transaction.data.to_vec(),
        }
    }

    #[test]
    fn test_hash_operation_layout() {
        let instructions = vec![InstructionData {
            program_id: Pubkey::new_from_array([7; 32]),
            data: vec![0xAB],
            accounts: vec![InstructionAccount { pubkey: Pubkey::new_from_array([8; 32]), is_signer: true, is_writable: false }],
        }];
        let expected = keccak256(
            [
                &1u32.to_le_bytes()[..],
                &[7; 32][..],
                &1u32.to_le_bytes()[..],
                &[8; 32][..],
                &[1, 0][..],
                &1u32.to_le_bytes()[..],
                &[0xAB][..],
                &[0; 32][..],
                &[2; 32][..],
            ]
            .concat(),
        );
        assert_eq!(hash_operation(&instructions, B256::ZERO, B256::repeat_byte(2)), expected);
    }

    fn go_tooling_batch() -> BatchOperation {
        let fields = json!({
            "accounts": [
                { "PublicKey": "8na2HyqgS15GcjiWmMQvQ87o8kw188QgaVSTa6q94orU", "IsWritable": true, "IsSigner": true },
                { "PublicKey": "AjfVZUFzzC8nyA37GXBEdB57RfqPYXifYNtP9jRdRtCw", "IsWritable": true },
            ],
            "value": 123,
        });
        BatchOperation {
            chain_selector: ChainSelector(1),
            transactions: vec![
                Transaction::new("GwAQ33PbytKignFmKvyVSLp7pD8tKMaBXXNwFTTkGsME", b"0x1234".to_vec(), fields)
                    .with_metadata("Contract1", vec!["tag1.1".into(), "tag1.2".into()]),
                Transaction::new("t3ChqFTKHUFdjNPDf8CuhFGwkwzqR47LL7sDbeU99XD", b"0x5678".to_vec(), Value::Null)
                    .with_metadata("Contract2", vec!["tag2.1".into(), "tag2.2".into()]),
            ],
        }
    }

    #[test_case(TimelockAction::Schedule, 5 ; "schedule")]
    #[test_case(TimelockAction::Cancel, 1 ; "cancel")]
    #[test_case(TimelockAction::Bypass, 5 ; "bypass")]
    fn test_operation_id_known_value(action: TimelockAction, steps: usize) {
        let salt = B256::with_last_byte(1);
        let (ops, id) = SolanaTimelockConverter
            .convert_batch_to_chain_operations(
                &metadata(),
                &go_tooling_batch(),
                TIMELOCK,
                MCM,
                Duration::from_secs(10),
                action,
                B256::ZERO,
                salt,
            )
            .unwrap();
        let want: B256 = "0xeccdce20b98da2001e6ae8c81c34a3aae1ce4aa757897906f15a2f257132dc7f".parse().unwrap();
        assert_eq!(id, want);
        assert_eq!(ops.len(), steps);
        assert!(ops.iter().all(|op| op.transaction.metadata.tags == ["tag1.1", "tag1.2", "tag2.1", "tag2.2"]));
    }

    #[test]
    fn test_go_cased_accounts_are_stored() {
        let instructions = batch_instructions(&go_tooling_batch()).unwrap();
        let signer: Pubkey = "8na2HyqgS15GcjiWmMQvQ87o8kw188QgaVSTa6q94orU".parse().unwrap();
        assert_eq!(
            instructions[0].accounts,
            vec![
                InstructionAccount { pubkey: signer, is_signer: true, is_writable: true },
                InstructionAccount {
                    pubkey: "AjfVZUFzzC8nyA37GXBEdB57RfqPYXifYNtP9jRdRtCw".parse().unwrap(),
                    is_signer: false,
                    is_writable: true,
                },
            ]
        );
        assert!(instructions[1].accounts.is_empty());
    }

    #[test]
    fn test_schedule_expands_to_staged_instructions() {
        let (ops, id) = convert(TimelockAction::Schedule);
        assert_eq!(ops.len(), 5);

        let timelock_program = TIMELOCK.parse::<ContractAddress>().unwrap().program_id;
        for op in &ops {
            let tx = &op.transaction;
            assert_eq!(tx.to, timelock_program.to_string());
            assert_eq!(tx.metadata.contract_type, TIMELOCK_CONTRACT_TYPE);
            assert_eq!(tx.metadata.tags, vec!["mint", "x"]);
            assert_eq!(tx.additional_fields["value"], 0);
        }

        let init = InitializeOperation::decode(&instruction(&ops[0])).unwrap();
        assert_eq!((B256::from(init.id), init.instruction_count), (id, 2));
        assert_eq!(ScheduleBatch::decode(&instruction(&ops[4])).unwrap().delay, 600);
    }

    #[test]
    fn test_multisig_signer_authority_is_not_a_signer() {
        let (ops, _) = convert(TimelockAction::Schedule);
        let signer = MCM.parse::<ContractAddress>().unwrap().multisig_signer().unwrap();
        let accounts = instruction(&ops[0]).accounts;
        let authority = accounts.iter().find(|meta| meta.pubkey == signer).unwrap();
        assert!(!authority.is_signer);
        assert!(authority.is_writable);
    }

    #[test]
    fn test_cancel_targets_scheduled_id() {
        let (_, scheduled_id) = convert(TimelockAction::Schedule);
        let (ops, cancel_id) = convert(TimelockAction::Cancel);
        assert_eq!(scheduled_id, cancel_id);
        assert_eq!(ops.len(), 1);
        let cancel = Cancel::decode(&instruction(&ops[0])).unwrap();
        assert_eq!(B256::from(cancel.id), scheduled_id);
        assert_eq!(instruction(&ops[0]).accounts[2].pubkey, Pubkey::new_from_array([2; 32]));
    }

    #[test]
    fn test_bypass_ends_with_execution() {
        let (ops, _) = convert(TimelockAction::Bypass);
        assert_eq!(ops.len(), 5);
        let last = instruction(ops.last().unwrap());
        assert!(BypasserExecuteBatch::decode(&last).is_some());
        let target: Pubkey = TARGET.parse().unwrap();
        assert!(last.accounts.iter().any(|meta| meta.pubkey == target && meta.is_writable));
    }

    #[test]
    fn test_call_order_changes_id() {
        let mut reordered = batch();
        reordered.transactions.reverse();
        let (_, reordered_id) = SolanaTimelockConverter
            .convert_batch_to_chain_operations(
                &metadata(),
                &reordered,
                TIMELOCK,
                MCM,
                Duration::ZERO,
                TimelockAction::Schedule,
                B256::ZERO,
                B256::repeat_byte(1),
            )
            .unwrap();
        assert_ne!(convert(TimelockAction::Schedule).1, reordered_id);
    }

    #[test]
    fn test_missing_role_controller() {
        let result = SolanaTimelockConverter.convert_batch_to_chain_operations(
            &ChainMetadata::new(0, MCM),
            &batch(),
            TIMELOCK,
            MCM,
            Duration::ZERO,
            TimelockAction::Schedule,
            B256::ZERO,
            B256::ZERO,
        );
        assert!(matches!(result, Err(Error::MissingField(_))));
    }
}
