//! `<programId>.<seed>` contract addresses and the PDAs derived from them.
//!
//! One deployed program hosts many multisig or timelock instances; the seed
//! selects the instance and is mixed into every PDA of that instance.

use std::{fmt, str::FromStr};

use alloy_primitives::B256;
use mcms_core::{Error, Result};

use crate::pubkey::{MAX_SEED_LEN, Pubkey, find_program_address, parse_pubkey};

/// A program instance: the program id plus its zero-padded instance seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContractAddress {
    pub program_id: Pubkey,
    pub seed: [u8; MAX_SEED_LEN],
}

impl ContractAddress {
    pub fn new(program_id: Pubkey, seed: &[u8]) -> Result<Self> {
        if seed.len() > MAX_SEED_LEN {
            return Err(Error::invalid_address(
                String::from_utf8_lossy(seed),
                format!("seed is too long (max {MAX_SEED_LEN} bytes)"),
            ));
        }
        let mut padded = [0; MAX_SEED_LEN];
        padded[..seed.len()].copy_from_slice(seed);
        Ok(Self { program_id, seed: padded })
    }

    fn pda(&self, seeds: &[&[u8]]) -> Result<Pubkey> {
        find_program_address(seeds, &self.program_id).map(|(key, _)| key)
    }

    /// Signs on behalf of the multisig when it executes operations.
    pub fn multisig_signer(&self) -> Result<Pubkey> {
        self.pda(&[b"multisig_signer", &self.seed])
    }

    pub fn multisig_config(&self) -> Result<Pubkey> {
        self.pda(&[b"multisig_config", &self.seed])
    }

    pub fn config_signers(&self) -> Result<Pubkey> {
        self.pda(&[b"multisig_config_signers", &self.seed])
    }

    pub fn root_metadata(&self) -> Result<Pubkey> {
        self.pda(&[b"root_metadata", &self.seed])
    }

    pub fn expiring_root_and_op_count(&self) -> Result<Pubkey> {
        self.pda(&[b"expiring_root_and_op_count", &self.seed])
    }

    /// Staging account for the signatures `authority` uploads for one root.
    pub fn root_signatures(&self, root: B256, valid_until: u32, authority: &Pubkey) -> Result<Pubkey> {
        self.pda(&[b"root_signatures", &self.seed, root.as_slice(), &valid_until.to_le_bytes(), authority.as_ref()])
    }

    pub fn seen_signed_hashes(&self, root: B256, valid_until: u32) -> Result<Pubkey> {
        self.pda(&[b"seen_signed_hashes", &self.seed, root.as_slice(), &valid_until.to_le_bytes()])
    }

    pub fn timelock_config(&self) -> Result<Pubkey> {
        self.pda(&[b"timelock_config", &self.seed])
    }

    /// Signs on behalf of the timelock when it executes batches.
    pub fn timelock_signer(&self) -> Result<Pubkey> {
        self.pda(&[b"timelock_signer", &self.seed])
    }

    pub fn timelock_operation(&self, id: B256) -> Result<Pubkey> {
        self.pda(&[b"timelock_operation", &self.seed, id.as_slice()])
    }

    pub fn timelock_bypasser_operation(&self, id: B256) -> Result<Pubkey> {
        self.pda(&[b"timelock_bypasser_operation", &self.seed, id.as_slice()])
    }
}

impl FromStr for ContractAddress {
    type Err = Error;

    fn from_str(address: &str) -> Result<Self> {
        let parts: Vec<&str> = address.split('.').collect();
        let [program_id, seed] = parts.as_slice() else {
            return Err(Error::invalid_address(address, "expected <programId>.<seed>"));
        };
        Self::new(parse_pubkey(program_id)?, seed.as_bytes()).map_err(|err| Error::invalid_address(address, err))
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.seed.iter().rposition(|byte| *byte != 0).map_or(0, |last| last + 1);
        let start = self.seed[..end].iter().position(|byte| *byte != 0).unwrap_or(end);
        write!(f, "{}.{}", self.program_id, String::from_utf8_lossy(&self.seed[start..end]))
    }
}

/// Parses a transaction destination: a bare program id, or a contract address.
pub fn parse_program_id(to: &str) -> Result<Pubkey> {
    match to.parse::<ContractAddress>() {
        Ok(address) => Ok(address.program_id),
        Err(_) => parse_pubkey(to),
    }
}
