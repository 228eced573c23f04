//! The MCMS template: its identifiers and the payload of its contracts.
//!
//! Every consuming choice archives the contract and creates its successor,
//! so a multisig's contract id changes with each mutation.

use alloy_primitives::{Address, B256, hex};
use mcms_core::{Error, FlatConfig, QuorumConfig, Result, config::MAX_GROUPS};
use serde::{Deserialize, Serialize};

use crate::{
    fields::TimelockRole,
    value::{Int64, RelTime, parse_timestamp},
};

/// Template reference resolved by package name, valid across package versions.
pub const MCMS_TEMPLATE_ID: &str = "#mcms:MCMS.Main:MCMS";

/// Normalized key of the MCMS template.
pub const MCMS_TEMPLATE_KEY: &str = "MCMS.Main:MCMS";

/// Reduces a template id to `Module:Entity`, dropping the package id or
/// `#name` reference in front.
pub fn normalize_template_key(template_id: &str) -> String {
    let trimmed = template_id.trim_start_matches('#');
    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 {
        return trimmed.to_owned();
    }
    parts[parts.len() - 2..].join(":")
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerInfo {
    /// Lowercase hex without `0x`.
    pub signer_address: String,
    pub signer_index: Int64,
    pub signer_group: Int64,
}

/// Signer table of the multisig or of one timelock role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MultisigConfig {
    pub signers: Vec<SignerInfo>,
    pub group_quorums: Vec<Int64>,
    pub group_parents: Vec<Int64>,
}

impl MultisigConfig {
    pub fn from_flat(flat: &FlatConfig) -> Self {
        let signers = flat
            .signer_addresses
            .iter()
            .zip(&flat.signer_groups)
            .enumerate()
            .map(|(index, (address, group))| SignerInfo {
                signer_address: hex::encode(address),
                signer_index: Int64(index as i64),
                signer_group: Int64::from(*group),
            })
            .collect();
        Self {
            signers,
            group_quorums: flat.group_quorums.iter().copied().map(Int64::from).collect(),
            group_parents: flat.group_parents.iter().copied().map(Int64::from).collect(),
        }
    }

    pub fn to_flat(&self) -> Result<FlatConfig> {
        if self.group_quorums.len() > MAX_GROUPS || self.group_parents.len() > MAX_GROUPS {
            return Err(Error::ConfigTooLarge { nodes: self.group_quorums.len().max(self.group_parents.len()) });
        }
        let mut flat = FlatConfig::default();
        for (slot, quorum) in flat.group_quorums.iter_mut().zip(&self.group_quorums) {
            *slot = small(*quorum, "group quorum")?;
        }
        for (slot, parent) in flat.group_parents.iter_mut().zip(&self.group_parents) {
            *slot = small(*parent, "group parent")?;
        }
        for signer in &self.signers {
            let address: Address = signer
                .signer_address
                .parse()
                .map_err(|err| Error::invalid_address(&signer.signer_address, err))?;
            let group = u8::try_from(signer.signer_group.0).map_err(|_| Error::GroupIndexOutOfRange { index: u8::MAX })?;
            flat.signer_addresses.push(address);
            flat.signer_groups.push(group);
        }
        Ok(flat)
    }

    /// The signer tree, validated.
    pub fn to_quorum_config(&self) -> Result<QuorumConfig> {
        self.to_flat()?.unflatten()
    }

    pub fn signer_addresses(&self) -> Vec<String> {
        self.signers.iter().map(|signer| signer.signer_address.clone()).collect()
    }
}

fn small(value: Int64, what: &str) -> Result<u8> {
    u8::try_from(value.0).map_err(|_| Error::InvalidConfig(format!("{what} {value} does not fit a u8")))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpiringRoot {
    /// Hex, empty until the first root is set.
    pub root: String,
    /// Daml timestamp, empty until the first root is set.
    pub valid_until: String,
    pub op_count: Int64,
}

impl ExpiringRoot {
    pub fn root(&self) -> Result<B256> {
        if self.root.is_empty() {
            return Ok(B256::ZERO);
        }
        self.root.parse().map_err(|err| Error::decode("root", err))
    }

    pub fn valid_until(&self) -> Result<u32> {
        if self.valid_until.is_empty() {
            return Ok(0);
        }
        let secs = parse_timestamp(&self.valid_until)?;
        u32::try_from(secs).map_err(|_| Error::decode("validUntil", format!("{secs} does not fit a u32")))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RootMetadata {
    pub chain_id: Int64,
    pub multisig_id: String,
    pub pre_op_count: Int64,
    pub post_op_count: Int64,
    pub override_previous_root: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleState {
    pub config: MultisigConfig,
}

/// Payload of an active MCMS contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McmsState {
    pub owner: String,
    pub instance_id: String,
    pub chain_id: Int64,
    pub mcms_id: String,
    pub config: MultisigConfig,
    pub expiring_root: ExpiringRoot,
    pub root_metadata: RootMetadata,
    pub proposer: RoleState,
    pub canceller: RoleState,
    pub bypasser: RoleState,
    pub min_delay: RelTime,
}

impl McmsState {
    pub const fn role(&self, role: TimelockRole) -> &RoleState {
        match role {
            TimelockRole::Proposer => &self.proposer,
            TimelockRole::Canceller => &self.canceller,
            TimelockRole::Bypasser => &self.bypasser,
        }
    }
}
