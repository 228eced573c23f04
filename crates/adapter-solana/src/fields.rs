//! Typed views of the Solana additional-fields payloads.

use mcms_core::{ChainMetadata, Error, Result, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    accounts::InstructionAccount,
    instruction::{AccountMeta, account_metas},
    pubkey::{Pubkey, base58},
};

/// Accounts a Solana transaction passes to its target program.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaTransactionFields {
    #[serde(default, with = "account_metas")]
    pub accounts: Vec<AccountMeta>,
    #[serde(default)]
    pub value: u64,
}

impl SolanaTransactionFields {
    pub fn parse(tx: &Transaction) -> Result<Self> {
        tx.parse_additional_fields()
    }

    /// The additional-fields JSON carried by a transaction.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|err| Error::InvalidAdditionalFields(err.to_string()))
    }

    pub fn instruction_accounts(&self) -> Vec<InstructionAccount> {
        self.accounts
            .iter()
            .map(|meta| InstructionAccount {
                pubkey: meta.pubkey,
                is_signer: meta.is_signer,
                is_writable: meta.is_writable,
            })
            .collect()
    }
}

/// Timelock role controllers a proposal's chain metadata must name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaMetadataFields {
    #[serde(default, with = "base58")]
    pub proposer_role_access_controller: Pubkey,
    #[serde(default, with = "base58")]
    pub canceller_role_access_controller: Pubkey,
    #[serde(default, with = "base58")]
    pub bypasser_role_access_controller: Pubkey,
}

impl SolanaMetadataFields {
    /// Parses and validates the fields of `metadata`; every controller is required.
    pub fn parse(metadata: &ChainMetadata) -> Result<Self> {
        let fields: Self = metadata.parse_additional_fields()?;
        fields.validate()?;
        Ok(fields)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, controller) in [
            ("proposerRoleAccessController", &self.proposer_role_access_controller),
            ("cancellerRoleAccessController", &self.canceller_role_access_controller),
            ("bypasserRoleAccessController", &self.bypasser_role_access_controller),
        ] {
            if *controller == Pubkey::default() {
                return Err(Error::MissingField(name));
            }
        }
        Ok(())
    }
}
