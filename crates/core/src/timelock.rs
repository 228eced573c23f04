//! Timelock actions and the scheduled-operation lifecycle.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sdk::TimelockInspector,
};

/// What a timelock proposal does with its batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum TimelockAction {
    #[display("schedule")]
    Schedule,
    #[display("cancel")]
    Cancel,
    #[display("bypass")]
    Bypass,
}

/// Where a timelock operation is in its lifecycle.
///
/// Cancelling moves a pending or ready operation back to `Absent`; a
/// cancelled id is indistinguishable from one that was never scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Absent,
    Pending,
    Ready,
    Done,
}

impl OperationState {
    /// Reads the state of `id` through the inspector's queries.
    pub async fn fetch(inspector: &dyn TimelockInspector, address: &str, id: B256) -> Result<Self> {
        if !inspector.is_operation(address, id).await? {
            return Ok(Self::Absent);
        }
        if inspector.is_operation_done(address, id).await? {
            return Ok(Self::Done);
        }
        if inspector.is_operation_ready(address, id).await? {
            return Ok(Self::Ready);
        }
        Ok(Self::Pending)
    }

    /// Fails unless an operation in this state can be executed now.
    pub fn ensure_executable(self, id: B256) -> Result<()> {
        match self {
            Self::Ready => Ok(()),
            Self::Absent => Err(Error::OperationNotFound(id)),
            Self::Pending | Self::Done => Err(Error::OperationNotReady(id)),
        }
    }
}

/// Message fragments chains use when rejecting an operation that is not ready yet.
pub const NOT_READY_MARKERS: &[&str] = &["not ready", "notready", "operation is not ready", "too early"];

/// Message fragments chains use when rejecting an unknown or cancelled operation.
pub const NOT_FOUND_MARKERS: &[&str] = &[
    "not found",
    "notfound",
    "unknown operation",
    "does not exist",
    "accountnotinitialized",
    "missing operation",
];

/// Maps an on-chain rejection of an execution of `id` onto its error category.
///
/// Matching is case-insensitive and limited to the marker lists above.
pub fn classify_rejection(id: B256, message: &str) -> Option<Error> {
    let message = message.to_lowercase();
    if NOT_READY_MARKERS.iter().any(|marker| message.contains(marker)) {
        return Some(Error::OperationNotReady(id));
    }
    if NOT_FOUND_MARKERS.iter().any(|marker| message.contains(marker)) {
        return Some(Error::OperationNotFound(id));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("execution reverted: RBACTimelock: operation is not ready", Some(true) ; "evm not ready")]
    #[test_case("Error: OperationNotReady", Some(true) ; "anchor not ready")]
    #[test_case("AnchorError: AccountNotInitialized", Some(false) ; "solana missing account")]
    #[test_case("DAML_INTERPRETATION_ERROR: operation does not exist", Some(false) ; "canton unknown")]
    #[test_case("insufficient funds for gas", None ; "unrelated")]
    fn test_classify_rejection(message: &str, not_ready: Option<bool>) {
        let id = B256::repeat_byte(9);
        let classified = classify_rejection(id, message);
        match not_ready {
            Some(true) => assert!(matches!(classified, Some(Error::OperationNotReady(got)) if got == id)),
            Some(false) => assert!(matches!(classified, Some(Error::OperationNotFound(got)) if got == id)),
            None => assert!(classified.is_none()),
        }
    }

    #[test]
    fn test_ensure_executable() {
        let id = B256::ZERO;
        assert!(OperationState::Ready.ensure_executable(id).is_ok());
        assert!(matches!(OperationState::Pending.ensure_executable(id), Err(Error::OperationNotReady(_))));
        assert!(matches!(OperationState::Done.ensure_executable(id), Err(Error::OperationNotReady(_))));
        assert!(matches!(OperationState::Absent.ensure_executable(id), Err(Error::OperationNotFound(_))));
    }

    #[test]
    fn test_action_serde() {
        assert_eq!(serde_json::to_string(&TimelockAction::Bypass).unwrap(), "\"bypass\"");
        let action: TimelockAction = serde_json::from_str("\"schedule\"").unwrap();
        assert_eq!(action, TimelockAction::Schedule);
    }
}
