//! Arguments of the MCMS template's choices.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    contract::{RootMetadata, SignerInfo},
    value::Int64,
};

/// A choice on the MCMS template and the record it takes.
pub trait Choice: Serialize + DeserializeOwned {
    const NAME: &'static str;
}

macro_rules! choices {
    ($($(#[$meta:meta])* $name:ident { $($field:ident: $ty:ty),* $(,)? })*) => {$(
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $(pub $field: $ty,)*
        }

        impl Choice for $name {
            const NAME: &'static str = stringify!($name);
        }
    )*};
}

/// One call of a timelock batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelockCall {
    pub target_instance_id: String,
    pub function_name: String,
    pub operation_data: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignature {
    /// Uncompressed SEC1 key, hex.
    pub public_key: String,
    pub r: String,
    pub s: String,
}

/// An operation as the template hashes and dispatches it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Op {
    pub chain_id: Int64,
    pub multisig_id: String,
    pub nonce: Int64,
    pub target_instance_id: String,
    pub function_name: String,
    pub operation_data: String,
}

choices! {
    SetConfig {
        new_signers: Vec<SignerInfo>,
        new_group_quorums: Vec<Int64>,
        new_group_parents: Vec<Int64>,
        clear_root: bool,
    }

    SetRoot {
        submitter: String,
        new_root: String,
        valid_until: String,
        metadata: RootMetadata,
        metadata_proof: Vec<String>,
        signatures: Vec<RawSignature>,
    }

    /// Runs a choice on another contract, passed in as `target_cid`.
    ExecuteOp {
        submitter: String,
        target_cid: String,
        op: Op,
        op_proof: Vec<String>,
        contract_ids: Vec<String>,
    }

    /// Runs one of the multisig's own choices.
    ExecuteMcmsOp {
        submitter: String,
        op: Op,
        op_proof: Vec<String>,
    }

    ExecuteScheduledBatch {
        submitter: String,
        op_id: String,
        calls: Vec<TimelockCall>,
        predecessor: String,
        salt: String,
        target_cids: Vec<String>,
    }

    IsOperation { submitter: String, op_id: String }
    IsOperationPending { submitter: String, op_id: String }
    IsOperationReady { submitter: String, op_id: String }
    IsOperationDone { submitter: String, op_id: String }

    /// Non-consuming; returns a `RelTime`.
    GetMinDelay { submitter: String }
}
