//! The multisig (`mcm`) program.

use alloy_primitives::{Address, B256};
use borsh::{BorshDeserialize, BorshSerialize};
use mcms_core::{FlatConfig, Result, config::MAX_GROUPS};

use crate::{
    address::ContractAddress,
    instruction::{AccountMeta, Instruction, InstructionArgs},
    pubkey::{Pubkey, SYSTEM_PROGRAM_ID},
};

/// Signer addresses per `append_signers` transaction.
pub const SIGNERS_CHUNK: usize = 45;

/// Signatures per `append_signatures` transaction.
pub const SIGNATURES_CHUNK: usize = 13;

macro_rules! instruction_args {
    ($ty:ident, $name:literal) => {
        impl InstructionArgs for $ty {
            const NAME: &'static str = $name;
        }
    };
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitSigners {
    pub multisig_id: [u8; 32],
    pub total_signers: u8,
}
instruction_args!(InitSigners, "init_signers");

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AppendSigners {
    pub multisig_id: [u8; 32],
    pub signers_batch: Vec<[u8; 20]>,
}
instruction_args!(AppendSigners, "append_signers");

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FinalizeSigners {
    pub multisig_id: [u8; 32],
}
instruction_args!(FinalizeSigners, "finalize_signers");

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SetConfig {
    pub multisig_id: [u8; 32],
    pub signer_groups: Vec<u8>,
    pub group_quorums: [u8; MAX_GROUPS],
    pub group_parents: [u8; MAX_GROUPS],
    pub clear_root: bool,
}
instruction_args!(SetConfig, "set_config");

#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Signature {
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl From<&mcms_core::Signature> for Signature {
    fn from(sig: &mcms_core::Signature) -> Self {
        Self { v: sig.v, r: sig.r.0, s: sig.s.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitSignatures {
    pub multisig_id: [u8; 32],
    pub root: [u8; 32],
    pub valid_until: u32,
    pub total_signatures: u8,
}
instruction_args!(InitSignatures, "init_signatures");

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AppendSignatures {
    pub multisig_id: [u8; 32],
    pub root: [u8; 32],
    pub valid_until: u32,
    pub signatures_batch: Vec<Signature>,
}
instruction_args!(AppendSignatures, "append_signatures");

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FinalizeSignatures {
    pub multisig_id: [u8; 32],
    pub root: [u8; 32],
    pub valid_until: u32,
}
instruction_args!(FinalizeSignatures, "finalize_signatures");

/// Root metadata as `set_root` takes it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RootMetadataInput {
    pub chain_id: u64,
    pub multisig: Pubkey,
    pub pre_op_count: u64,
    pub post_op_count: u64,
    pub override_previous_root: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SetRoot {
    pub multisig_id: [u8; 32],
    pub root: [u8; 32],
    pub valid_until: u32,
    pub metadata: RootMetadataInput,
    pub metadata_proof: Vec<[u8; 32]>,
}
instruction_args!(SetRoot, "set_root");

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Execute {
    pub multisig_id: [u8; 32],
    pub chain_id: u64,
    pub nonce: u64,
    pub data: Vec<u8>,
    pub proof: Vec<[u8; 32]>,
}
instruction_args!(Execute, "execute");

fn proof_words(proof: &[B256]) -> Vec<[u8; 32]> {
    proof.iter().map(|node| node.0).collect()
}

/// Builds instructions for one multisig instance.
#[derive(Clone, Debug)]
pub struct McmProgram {
    pub address: ContractAddress,
    pub authority: Pubkey,
    config: Pubkey,
    config_signers: Pubkey,
    root_metadata: Pubkey,
    expiring_root: Pubkey,
}

impl McmProgram {
    pub fn new(address: ContractAddress, authority: Pubkey) -> Result<Self> {
        Ok(Self {
            config: address.multisig_config()?,
            config_signers: address.config_signers()?,
            root_metadata: address.root_metadata()?,
            expiring_root: address.expiring_root_and_op_count()?,
            address,
            authority,
        })
    }

    pub const fn config(&self) -> Pubkey {
        self.config
    }

    pub const fn root_metadata(&self) -> Pubkey {
        self.root_metadata
    }

    pub const fn expiring_root(&self) -> Pubkey {
        self.expiring_root
    }

    fn signers_accounts(&self, with_system: bool) -> Vec<AccountMeta> {
        let mut accounts = vec![
            AccountMeta::new(self.config, false),
            AccountMeta::new(self.config_signers, false),
            AccountMeta::new(self.authority, true),
        ];
        if with_system {
            accounts.push(AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false));
        }
        accounts
    }

    /// The staged signer upload followed by `set_config`, in submission order.
    pub fn set_config_sequence(&self, flat: &FlatConfig, clear_root: bool) -> Result<Vec<(&'static str, Instruction)>> {
        let multisig_id = self.address.seed;
        let program_id = self.address.program_id;
        let mut sequence = Vec::new();

        let total_signers = u8::try_from(flat.signer_addresses.len())
            .map_err(|_| mcms_core::Error::TooManySigners { count: flat.signer_addresses.len(), max: 255 })?;
        sequence.push((
            InitSigners::NAME,
            InitSigners { multisig_id, total_signers }.build(program_id, self.signers_accounts(true))?,
        ));
        for chunk in flat.signer_addresses.chunks(SIGNERS_CHUNK) {
            let signers_batch = chunk.iter().map(|signer: &Address| signer.0.0).collect();
            sequence.push((
                AppendSigners::NAME,
                AppendSigners { multisig_id, signers_batch }.build(program_id, self.signers_accounts(false))?,
            ));
        }
        sequence.push((
            FinalizeSigners::NAME,
            FinalizeSigners { multisig_id }.build(program_id, self.signers_accounts(false))?,
        ));

        let args = SetConfig {
            multisig_id,
            signer_groups: flat.signer_groups.clone(),
            group_quorums: flat.group_quorums,
            group_parents: flat.group_parents,
            clear_root,
        };
        let accounts = vec![
            AccountMeta::new(self.config, false),
            AccountMeta::new(self.config_signers, false),
            AccountMeta::new(self.root_metadata, false),
            AccountMeta::new(self.expiring_root, false),
            AccountMeta::new(self.authority, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ];
        sequence.push((SetConfig::NAME, args.build(program_id, accounts)?));
        Ok(sequence)
    }

    /// The staged signature upload followed by `set_root`, in submission order.
    pub fn set_root_sequence(
        &self,
        metadata: RootMetadataInput,
        proof: &[B256],
        root: B256,
        valid_until: u32,
        signatures: &[mcms_core::Signature],
    ) -> Result<Vec<(&'static str, Instruction)>> {
        let multisig_id = self.address.seed;
        let program_id = self.address.program_id;
        let staging = self.address.root_signatures(root, valid_until, &self.authority)?;
        let staging_accounts = || vec![AccountMeta::new(staging, false), AccountMeta::new(self.authority, true)];
        let mut sequence = Vec::new();

        let total_signatures = u8::try_from(signatures.len()).map_err(|_| {
            mcms_core::Error::InvalidProposal(format!("{} signatures, at most 255 fit one root", signatures.len()))
        })?;
        let mut accounts = staging_accounts();
        accounts.push(AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false));
        sequence.push((
            InitSignatures::NAME,
            InitSignatures { multisig_id, root: root.0, valid_until, total_signatures }.build(program_id, accounts)?,
        ));
        for chunk in signatures.chunks(SIGNATURES_CHUNK) {
            let args = AppendSignatures {
                multisig_id,
                root: root.0,
                valid_until,
                signatures_batch: chunk.iter().map(Signature::from).collect(),
            };
            sequence.push((AppendSignatures::NAME, args.build(program_id, staging_accounts())?));
        }
        sequence.push((
            FinalizeSignatures::NAME,
            FinalizeSignatures { multisig_id, root: root.0, valid_until }.build(program_id, staging_accounts())?,
        ));

        let args = SetRoot { multisig_id, root: root.0, valid_until, metadata, metadata_proof: proof_words(proof) };
        let accounts = vec![
            AccountMeta::new(staging, false),
            AccountMeta::new(self.root_metadata, false),
            AccountMeta::new(self.address.seen_signed_hashes(root, valid_until)?, false),
            AccountMeta::new(self.expiring_root, false),
            AccountMeta::new_readonly(self.config, false),
            AccountMeta::new(self.authority, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ];
        sequence.push((SetRoot::NAME, args.build(program_id, accounts)?));
        Ok(sequence)
    }

    /// `execute` for one proven operation; `remaining` are the target's accounts.
    pub fn execute(
        &self,
        chain_id: u64,
        nonce: u64,
        to: Pubkey,
        data: Vec<u8>,
        proof: &[B256],
        remaining: &[AccountMeta],
    ) -> Result<Instruction> {
        let args = Execute { multisig_id: self.address.seed, chain_id, nonce, data, proof: proof_words(proof) };
        let mut accounts = vec![
            AccountMeta::new(self.config, false),
            AccountMeta::new_readonly(self.root_metadata, false),
            AccountMeta::new(self.expiring_root, false),
            AccountMeta::new_readonly(to, false),
            AccountMeta::new_readonly(self.address.multisig_signer()?, false),
            AccountMeta::new(self.authority, true),
        ];
        accounts.extend(remaining.iter().cloned());
        args.build(self.address.program_id, accounts)
    }
}
