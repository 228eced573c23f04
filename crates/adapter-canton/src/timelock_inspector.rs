use std::sync::Arc;

use alloy_primitives::{B256, hex};
use async_trait::async_trait;
use mcms_core::{ChainFamily, Error, Result, TimelockInspector};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    choices::{Choice, GetMinDelay, IsOperation, IsOperationDone, IsOperationPending, IsOperationReady},
    client::{CantonLedger, fetch_mcms, view},
    fields::TimelockRole,
    value::{Int64, RelTime},
};

/// Reads the timelock built into an MCMS contract.
///
/// Role members come from the contract payload; operation status and the
/// minimum delay are answered by non-consuming choices.
pub struct CantonTimelockInspector {
    ledger: Arc<dyn CantonLedger>,
}

impl CantonTimelockInspector {
    pub fn new(ledger: Arc<dyn CantonLedger>) -> Self {
        Self { ledger }
    }

    /// Signer addresses of `role`, as stored on the contract.
    pub async fn role_members(&self, address: &str, role: TimelockRole) -> Result<Vec<String>> {
        let state = fetch_mcms(self.ledger.as_ref(), address).await?;
        Ok(state.role(role).config.signer_addresses())
    }

    async fn status<C: Choice>(&self, address: &str, choice: C) -> Result<bool> {
        let result = view(self.ledger.as_ref(), address, &choice).await?;
        result.as_bool().ok_or_else(|| Error::decode(C::NAME, format!("expected a Bool, got {result}")))
    }
}

/// A `RelTime` record, or a bare microsecond count.
fn min_delay_secs(result: Value) -> Result<u64> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Delay {
        Record(RelTime),
        Micros(Int64),
    }

    let delay = match serde_json::from_value(result).map_err(|err| Error::decode(GetMinDelay::NAME, err))? {
        Delay::Record(delay) => delay,
        Delay::Micros(microseconds) => RelTime { microseconds },
    };
    u64::try_from(delay.as_secs())
        .map_err(|_| Error::decode(GetMinDelay::NAME, format!("negative delay {}", delay.microseconds)))
}

#[async_trait]
impl TimelockInspector for CantonTimelockInspector {
    async fn get_proposers(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, TimelockRole::Proposer).await
    }

    /// Any party may execute a ready operation, so there is no executor role.
    async fn get_executors(&self, _address: &str) -> Result<Vec<String>> {
        Err(Error::UnsupportedOnChain { family: ChainFamily::Canton, query: "get_executors" })
    }

    async fn get_bypassers(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, TimelockRole::Bypasser).await
    }

    async fn get_cancellers(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, TimelockRole::Canceller).await
    }

    async fn is_operation(&self, address: &str, id: B256) -> Result<bool> {
        let submitter = self.ledger.party().to_owned();
        self.status(address, IsOperation { submitter, op_id: hex::encode(id) }).await
    }

    async fn is_operation_pending(&self, address: &str, id: B256) -> Result<bool> {
        let submitter = self.ledger.party().to_owned();
        self.status(address, IsOperationPending { submitter, op_id: hex::encode(id) }).await
    }

    async fn is_operation_ready(&self, address: &str, id: B256) -> Result<bool> {
        let submitter = self.ledger.party().to_owned();
        self.status(address, IsOperationReady { submitter, op_id: hex::encode(id) }).await
    }

    async fn is_operation_done(&self, address: &str, id: B256) -> Result<bool> {
        let submitter = self.ledger.party().to_owned();
        self.status(address, IsOperationDone { submitter, op_id: hex::encode(id) }).await
    }

    async fn get_min_delay(&self, address: &str) -> Result<u64> {
        let choice = GetMinDelay { submitter: self.ledger.party().to_owned() };
        min_delay_secs(view(self.ledger.as_ref(), address, &choice).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        contract::{McmsState, MultisigConfig, RoleState},
        mock::{MockLedger, ScheduledOp},
    };
    use alloy_primitives::Address;
    use mcms_core::{OperationState, QuorumConfig};
    use serde_json::json;
    use test_case::test_case;

    fn role(byte: u8) -> RoleState {
        let config = QuorumConfig::new(1, vec![Address::repeat_byte(byte)], vec![]).unwrap();
        RoleState { config: MultisigConfig::from_flat(&config.flatten().unwrap()) }
    }

    fn ledger() -> (Arc<MockLedger>, String) {
        let state = McmsState {
            proposer: role(1),
            canceller: role(2),
            bypasser: role(3),
            min_delay: RelTime::from_secs(3600),
            ..Default::default()
        };
        let (ledger, mcm) = MockLedger::with_contract(state);
        (Arc::new(ledger), mcm)
    }

    #[tokio::test]
    async fn test_role_members() {
        let (ledger, mcm) = ledger();
        let inspector = CantonTimelockInspector::new(ledger);
        assert_eq!(inspector.get_proposers(&mcm).await.unwrap(), vec!["01".repeat(20)]);
        assert_eq!(inspector.get_cancellers(&mcm).await.unwrap(), vec!["02".repeat(20)]);
        assert_eq!(inspector.get_bypassers(&mcm).await.unwrap(), vec!["03".repeat(20)]);
        assert!(matches!(
            inspector.get_executors(&mcm).await,
            Err(Error::UnsupportedOnChain { family: ChainFamily::Canton, query: "get_executors" })
        ));
    }

    #[tokio::test]
    async fn test_min_delay() {
        let (ledger, mcm) = ledger();
        let inspector = CantonTimelockInspector::new(ledger.clone());
        assert_eq!(inspector.get_min_delay(&mcm).await.unwrap(), 3600);

        let command = ledger.exercised().pop().unwrap();
        assert_eq!(command.choice, "GetMinDelay");
        assert_eq!(command.workflow_id, "mcms-timelock-GetMinDelay");
        assert_eq!(command.contract_id, mcm);
    }

    #[test_case(json!({ "microseconds": "90000000" }), 90 ; "record")]
    #[test_case(json!("2500000"), 2 ; "bare micros")]
    #[test_case(json!(0), 0 ; "zero")]
    fn test_min_delay_shapes(result: Value, expected: u64) {
        assert_eq!(min_delay_secs(result).unwrap(), expected);
    }

    #[test]
    fn test_min_delay_rejects_garbage() {
        assert!(matches!(min_delay_secs(json!({ "seconds": 1 })), Err(Error::Decode { .. })));
        assert!(matches!(min_delay_secs(json!("-1000000")), Err(Error::Decode { .. })));
    }

    #[tokio::test]
    async fn test_operation_lifecycle() {
        let (ledger, mcm) = ledger();
        let inspector = CantonTimelockInspector::new(ledger.clone());
        let id = B256::repeat_byte(9);

        assert_eq!(OperationState::fetch(&inspector, &mcm, id).await.unwrap(), OperationState::Absent);

        ledger.with_state(|state| {
            state.clock = 100;
            state.operations.insert(id, ScheduledOp { ready_at: 200, done: false });
        });
        assert_eq!(OperationState::fetch(&inspector, &mcm, id).await.unwrap(), OperationState::Pending);
        assert!(inspector.is_operation_pending(&mcm, id).await.unwrap());

        ledger.with_state(|state| state.clock = 200);
        assert_eq!(OperationState::fetch(&inspector, &mcm, id).await.unwrap(), OperationState::Ready);

        ledger.with_state(|state| state.operations.get_mut(&id).unwrap().done = true);
        assert_eq!(OperationState::fetch(&inspector, &mcm, id).await.unwrap(), OperationState::Done);
        assert!(!inspector.is_operation_pending(&mcm, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_query_failure() {
        let (ledger, mcm) = ledger();
        ledger.fail_next("CONTRACT_NOT_FOUND");
        let err = CantonTimelockInspector::new(ledger).is_operation(&mcm, B256::ZERO).await.unwrap_err();
        assert!(matches!(err, Error::Query { query: "IsOperation", .. }));
    }
}
