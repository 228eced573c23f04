//! Typed views of the Canton additional-fields payloads.

use std::fmt;

use mcms_core::{ChainMetadata, Error, Result, Transaction};
use serde::{Deserialize, Serialize};

/// Target of a Canton operation: a choice on another contract, or on the
/// multisig itself when `target_instance_id` is [`SELF_TARGET`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CantonTransactionFields {
    #[serde(default)]
    pub target_instance_id: String,
    #[serde(default)]
    pub function_name: String,
    /// Hex-encoded choice parameters. Non-hex text is hashed as its ASCII bytes.
    #[serde(default)]
    pub operation_data: String,
    #[serde(default)]
    pub target_cid: String,
    #[serde(default)]
    pub contract_ids: Vec<String>,
}

/// Instance id that routes an operation to the multisig contract's own choices.
pub const SELF_TARGET: &str = "self";

impl CantonTransactionFields {
    pub fn parse(tx: &Transaction) -> Result<Self> {
        tx.parse_additional_fields()
    }

    /// Fails on the first field execution cannot do without.
    pub fn require_executable(&self) -> Result<()> {
        if self.target_instance_id.is_empty() {
            return Err(Error::MissingField("targetInstanceId"));
        }
        if self.function_name.is_empty() {
            return Err(Error::MissingField("functionName"));
        }
        if self.target_cid.is_empty() {
            return Err(Error::MissingField("targetCid"));
        }
        Ok(())
    }

    pub fn targets_self(&self) -> bool {
        self.target_instance_id == SELF_TARGET
    }
}

/// Root metadata of a Canton multisig, carried in the chain metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CantonMetadataFields {
    #[serde(default)]
    pub chain_id: i64,
    #[serde(default)]
    pub multisig_id: String,
    #[serde(default)]
    pub pre_op_count: u64,
    #[serde(default)]
    pub post_op_count: u64,
    #[serde(default)]
    pub override_previous_root: bool,
    /// Instance id timelock operations dispatch to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_id: String,
}

impl CantonMetadataFields {
    /// Parses and validates the fields of `metadata`.
    pub fn parse(metadata: &ChainMetadata) -> Result<Self> {
        let fields: Self = metadata.parse_additional_fields()?;
        fields.validate()?;
        Ok(fields)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_id == 0 {
            return Err(Error::InvalidAdditionalFields("chainId is required".into()));
        }
        if self.chain_id < 0 {
            return Err(Error::InvalidAdditionalFields(format!("chainId {} is negative", self.chain_id)));
        }
        if self.multisig_id.is_empty() {
            return Err(Error::InvalidAdditionalFields("multisigId is required".into()));
        }
        if self.post_op_count < self.pre_op_count {
            return Err(Error::InvalidAdditionalFields(format!(
                "postOpCount {} must be >= preOpCount {}",
                self.post_op_count, self.pre_op_count
            )));
        }
        Ok(())
    }

    /// Validated chain metadata for the multisig contract `mcms_contract_id`.
    pub fn into_chain_metadata(self, mcms_contract_id: &str) -> Result<ChainMetadata> {
        if mcms_contract_id.is_empty() {
            return Err(Error::MissingField("mcmAddress"));
        }
        self.validate()?;
        let fields = serde_json::to_value(&self).map_err(|err| Error::InvalidAdditionalFields(err.to_string()))?;
        Ok(ChainMetadata::new(self.pre_op_count, mcms_contract_id).with_additional_fields(fields))
    }
}

/// Roles of the timelock built into the multisig contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimelockRole {
    Bypasser = 0,
    Canceller = 1,
    Proposer = 2,
}

impl TimelockRole {
    pub const fn byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for TimelockRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bypasser => "Bypasser",
            Self::Canceller => "Canceller",
            Self::Proposer => "Proposer",
        })
    }
}
