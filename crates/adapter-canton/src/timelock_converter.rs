//! Lowers timelock batches into operations on the multisig's own timelock.
//!
//! The Canton multisig has the timelock built in, so every action becomes a
//! single operation dispatched back to the multisig contract with the action's
//! parameters packed into `operationData`.

use std::{fmt::Write, time::Duration};

use alloy_primitives::{B256, hex, keccak256};
use itertools::Itertools;
use mcms_core::{
    BatchOperation, ChainMetadata, Error, Operation, Result, TimelockAction, TimelockConverter, Transaction,
};

use crate::{
    choices::TimelockCall,
    encoder::{ascii_hex, operation_data_hex},
    fields::{CantonMetadataFields, CantonTransactionFields},
};

/// Contract type recorded on operations that target the timelock.
pub const TIMELOCK_CONTRACT_TYPE: &str = "RBACTimelock";

/// The calls of a batch in batch order.
///
/// A transaction without a `targetInstanceId` targets `to`; one without
/// `operationData` carries its raw `data` as hex.
pub fn timelock_calls(batch: &BatchOperation) -> Result<Vec<TimelockCall>> {
    batch
        .transactions
        .iter()
        .map(|tx| {
            let fields = CantonTransactionFields::parse(tx)?;
            let target_instance_id =
                if fields.target_instance_id.is_empty() { tx.to.clone() } else { fields.target_instance_id };
            let operation_data = if fields.operation_data.is_empty() && !tx.data.is_empty() {
                hex::encode(&tx.data)
            } else {
                fields.operation_data
            };
            Ok(TimelockCall { target_instance_id, function_name: fields.function_name, operation_data })
        })
        .collect()
}

/// Contract ids every call of the batch needs disclosed, in batch order.
fn batch_contract_ids(batch: &BatchOperation) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for tx in &batch.transactions {
        ids.extend(CantonTransactionFields::parse(tx)?.contract_ids);
    }
    Ok(ids)
}

/// The id the timelock derives for `calls`.
///
/// `predecessor` and `salt` enter as the ASCII bytes of their hex rendering.
pub fn hash_timelock_op_id(calls: &[TimelockCall], predecessor: B256, salt: B256) -> B256 {
    let mut encoded = String::new();
    for call in calls {
        encoded.push_str(&ascii_hex(&call.target_instance_id));
        encoded.push_str(&ascii_hex(&call.function_name));
        encoded.push_str(&operation_data_hex(&call.operation_data));
    }
    encoded.push_str(&ascii_hex(&hex::encode(predecessor)));
    encoded.push_str(&ascii_hex(&hex::encode(salt)));
    // Every segment above is hex by construction.
    keccak256(hex::decode(encoded).unwrap_or_default())
}

/// Parameters of a timelock entry point, as packed into `operationData`.
///
/// Text is written as an 8-digit hex byte length followed by its ASCII hex,
/// lists as an 8-digit count followed by their items, and integers as 16 hex
/// digits of their two's complement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimelockParams {
    Schedule { calls: Vec<TimelockCall>, predecessor: String, salt: String, delay_secs: i64 },
    Bypass { calls: Vec<TimelockCall> },
    Cancel { op_id: String },
}

impl TimelockParams {
    pub const SCHEDULE: &str = "ScheduleBatch";
    pub const BYPASS: &str = "BypasserExecuteBatch";
    pub const CANCEL: &str = "CancelBatch";

    pub const fn function_name(&self) -> &'static str {
        match self {
            Self::Schedule { .. } => Self::SCHEDULE,
            Self::Bypass { .. } => Self::BYPASS,
            Self::Cancel { .. } => Self::CANCEL,
        }
    }

    pub fn encode_hex(&self) -> String {
        let mut writer = ParamsWriter::default();
        match self {
            Self::Schedule { calls, predecessor, salt, delay_secs } => {
                writer.calls(calls).text(predecessor).text(salt).int(*delay_secs);
            }
            Self::Bypass { calls } => {
                writer.calls(calls);
            }
            Self::Cancel { op_id } => {
                writer.text(op_id);
            }
        }
        writer.0
    }

    /// Decodes the parameters of the entry point `function_name`.
    pub fn decode(function_name: &str, data: &str) -> Result<Self> {
        let mut reader = ParamsReader { rest: data };
        let params = match function_name {
            Self::SCHEDULE => Self::Schedule {
                calls: reader.calls()?,
                predecessor: reader.text()?,
                salt: reader.text()?,
                delay_secs: reader.int()?,
            },
            Self::BYPASS => Self::Bypass { calls: reader.calls()? },
            Self::CANCEL => Self::Cancel { op_id: reader.text()? },
            other => return Err(Error::decode("timelock params", format!("unknown entry point {other}"))),
        };
        if !reader.rest.is_empty() {
            return Err(Error::decode("timelock params", format!("{} trailing hex digits", reader.rest.len())));
        }
        Ok(params)
    }
}

#[derive(Default)]
struct ParamsWriter(String);

impl ParamsWriter {
    fn len(&mut self, len: usize) -> &mut Self {
        let _ = write!(self.0, "{len:08x}");
        self
    }

    fn text(&mut self, text: &str) -> &mut Self {
        self.len(text.len());
        self.0.push_str(&ascii_hex(text));
        self
    }

    fn int(&mut self, value: i64) -> &mut Self {
        let _ = write!(self.0, "{value:016x}");
        self
    }

    fn calls(&mut self, calls: &[TimelockCall]) -> &mut Self {
        self.len(calls.len());
        for call in calls {
            self.text(&call.target_instance_id).text(&call.function_name).text(&call.operation_data);
        }
        self
    }
}

struct ParamsReader<'a> {
    rest: &'a str,
}

impl<'a> ParamsReader<'a> {
    fn take(&mut self, digits: usize) -> Result<&'a str> {
        if self.rest.len() < digits || !self.rest.is_char_boundary(digits) {
            return Err(Error::decode("timelock params", "unexpected end of data"));
        }
        let (head, rest) = self.rest.split_at(digits);
        self.rest = rest;
        Ok(head)
    }

    fn len(&mut self) -> Result<usize> {
        let digits = self.take(8)?;
        usize::from_str_radix(digits, 16).map_err(|err| Error::decode("timelock params", err))
    }

    fn text(&mut self) -> Result<String> {
        let len = self.len()?;
        let digits = self.take(len.saturating_mul(2))?;
        let bytes = hex::decode(digits).map_err(|err| Error::decode("timelock params", err))?;
        String::from_utf8(bytes).map_err(|err| Error::decode("timelock params", err))
    }

    fn int(&mut self) -> Result<i64> {
        let digits = self.take(16)?;
        u64::from_str_radix(digits, 16)
            .map(|bits| bits as i64)
            .map_err(|err| Error::decode("timelock params", err))
    }

    fn calls(&mut self) -> Result<Vec<TimelockCall>> {
        let count = self.len()?;
        (0..count)
            .map(|_| {
                Ok(TimelockCall {
                    target_instance_id: self.text()?,
                    function_name: self.text()?,
                    operation_data: self.text()?,
                })
            })
            .collect()
    }
}

/// Builds self-dispatched timelock operations for the multisig.
#[derive(Clone, Copy, Debug, Default)]
pub struct CantonTimelockConverter;

impl TimelockConverter for CantonTimelockConverter {
    fn convert_batch_to_chain_operations(
        &self,
        metadata: &ChainMetadata,
        batch: &BatchOperation,
        _timelock_address: &str,
        mcm_address: &str,
        delay: Duration,
        action: TimelockAction,
        predecessor: B256,
        salt: B256,
    ) -> Result<(Vec<Operation>, B256)> {
        let meta = CantonMetadataFields::parse(metadata)?;
        if meta.instance_id.is_empty() {
            return Err(Error::MissingField("instanceId"));
        }
        let calls = timelock_calls(batch)?;
        let id = hash_timelock_op_id(&calls, predecessor, salt);

        let params = match action {
            TimelockAction::Schedule => TimelockParams::Schedule {
                calls,
                predecessor: hex::encode(predecessor),
                salt: hex::encode(salt),
                delay_secs: i64::try_from(delay.as_secs())
                    .map_err(|_| Error::InvalidProposal(format!("delay {delay:?} is too long")))?,
            },
            TimelockAction::Bypass => TimelockParams::Bypass { calls },
            TimelockAction::Cancel => TimelockParams::Cancel { op_id: hex::encode(id) },
        };

        let fields = CantonTransactionFields {
            target_instance_id: meta.instance_id,
            function_name: params.function_name().to_owned(),
            operation_data: params.encode_hex(),
            target_cid: mcm_address.to_owned(),
            contract_ids: batch_contract_ids(batch)?,
        };
        let fields = serde_json::to_value(&fields).map_err(|err| Error::InvalidAdditionalFields(err.to_string()))?;
        let tags = batch.tags().into_iter().unique().collect();

        // The template ignores `data`; a single placeholder byte keeps it non-empty.
        let op = Operation {
            chain_selector: batch.chain_selector,
            transaction: Transaction::new(mcm_address, vec![0x00], fields).with_metadata(TIMELOCK_CONTRACT_TYPE, tags),
        };
        Ok((vec![op], id))
    }
}
