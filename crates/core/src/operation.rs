//! Chain-agnostic operations, batches, and chain metadata.

use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    chain::{ChainFamily, ChainSelector},
    error::{Error, Result},
};

/// Descriptive metadata carried alongside a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default)]
    pub contract_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A single call executed by a multisig contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Destination in the chain's native address format.
    pub to: String,
    pub data: Bytes,
    /// Family-specific payload, parsed by the adapter at its boundary.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub additional_fields: Value,
    #[serde(flatten)]
    pub metadata: OperationMetadata,
}

impl Transaction {
    pub fn new(to: impl Into<String>, data: impl Into<Bytes>, additional_fields: Value) -> Self {
        Self { to: to.into(), data: data.into(), additional_fields, metadata: OperationMetadata::default() }
    }

    pub fn with_metadata(mut self, contract_type: impl Into<String>, tags: Vec<String>) -> Self {
        self.metadata = OperationMetadata { contract_type: contract_type.into(), tags };
        self
    }

    /// Parses the additional fields into the adapter's typed view.
    pub fn parse_additional_fields<T: DeserializeOwned + Default>(&self) -> Result<T> {
        parse_additional_fields(&self.additional_fields)
    }
}

/// An operation targeting one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub chain_selector: ChainSelector,
    pub transaction: Transaction,
}

/// An ordered group of transactions scheduled as one timelock unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperation {
    pub chain_selector: ChainSelector,
    pub transactions: Vec<Transaction>,
}

impl BatchOperation {
    /// Tags of every transaction in batch order.
    pub fn tags(&self) -> Vec<String> {
        self.transactions.iter().flat_map(|tx| tx.metadata.tags.iter().cloned()).collect()
    }
}

/// Per-chain state a proposal is built against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    pub starting_op_count: u64,
    /// Chain-native identifier of the multisig contract.
    pub mcm_address: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub additional_fields: Value,
}

impl ChainMetadata {
    pub fn new(starting_op_count: u64, mcm_address: impl Into<String>) -> Self {
        Self { starting_op_count, mcm_address: mcm_address.into(), additional_fields: Value::Null }
    }

    pub fn with_additional_fields(mut self, fields: Value) -> Self {
        self.additional_fields = fields;
        self
    }

    /// The op count after `offset` more operations, rejecting overflow.
    pub fn op_count_after(&self, offset: u64) -> Result<u64> {
        self.starting_op_count.checked_add(offset).ok_or_else(|| {
            Error::InvalidProposal(format!(
                "op count {} + {offset} overflows for multisig {}",
                self.starting_op_count, self.mcm_address
            ))
        })
    }

    pub fn parse_additional_fields<T: DeserializeOwned + Default>(&self) -> Result<T> {
        parse_additional_fields(&self.additional_fields)
    }
}

/// Identity of a contract that a ledger re-created during a mutating call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractIdentity {
    pub contract_id: String,
    pub template_id: String,
}

/// Outcome of a submitted chain transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub hash: String,
    pub chain_family: ChainFamily,
    #[serde(default)]
    pub raw_data: Value,
    /// Set when the call replaced the multisig contract with a new identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recreated: Option<ContractIdentity>,
}

impl TransactionResult {
    pub fn new(hash: impl Into<String>, chain_family: ChainFamily) -> Self {
        Self { hash: hash.into(), chain_family, raw_data: Value::Null, recreated: None }
    }

    pub fn with_raw_data(mut self, raw_data: Value) -> Self {
        self.raw_data = raw_data;
        self
    }

    /// The contract that replaced `previous`, required on re-creating families.
    pub fn successor(&self, previous: &str) -> Result<Option<&ContractIdentity>> {
        match &self.recreated {
            None if self.chain_family.recreates_contracts() => {
                Err(Error::NoCreatedEvent { template: "multisig".to_owned(), contract_id: previous.to_owned() })
            }
            recreated => Ok(recreated.as_ref()),
        }
    }
}

/// Parses an additional-fields payload, treating an absent payload as the default.
pub fn parse_additional_fields<T: DeserializeOwned + Default>(fields: &Value) -> Result<T> {
    if fields.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(fields.clone()).map_err(|err| Error::InvalidAdditionalFields(err.to_string()))
}
