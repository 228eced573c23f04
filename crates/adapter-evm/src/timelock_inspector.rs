use std::sync::{Arc, LazyLock};

use alloy_primitives::{Address, B256, U256, keccak256};
use async_trait::async_trait;
use mcms_core::{Error, Result, TimelockInspector};
use tracing::debug;

use crate::{
    bindings::RBACTimelock::{
        getMinDelayCall, getRoleMemberCall, getRoleMemberCountCall, isOperationCall, isOperationDoneCall,
        isOperationPendingCall, isOperationReadyCall,
    },
    client::{EvmClient, parse_address, view},
};

pub static PROPOSER_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("PROPOSER_ROLE"));
pub static EXECUTOR_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("EXECUTOR_ROLE"));
pub static BYPASSER_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("BYPASSER_ROLE"));
pub static CANCELLER_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("CANCELLER_ROLE"));

/// Reads `RBACTimelock` roles and operation state.
///
/// Readiness is evaluated by the contract against its own block timestamp.
#[derive(Clone)]
pub struct EvmTimelockInspector {
    client: Arc<dyn EvmClient>,
}

impl EvmTimelockInspector {
    pub fn new(client: Arc<dyn EvmClient>) -> Self {
        Self { client }
    }

    async fn role_members(&self, address: &str, role: B256) -> Result<Vec<String>> {
        let timelock = parse_address(address)?;
        let count = view(self.client.as_ref(), timelock, getRoleMemberCountCall { role }, "getRoleMemberCount").await?;
        let count = u64::try_from(count).map_err(|err| Error::decode("getRoleMemberCount", err))?;

        let mut members = Vec::new();
        for index in 0..count {
            let call = getRoleMemberCall { role, index: U256::from(index) };
            let member: Address = view(self.client.as_ref(), timelock, call, "getRoleMember").await?;
            members.push(member.to_string());
        }
        debug!(%timelock, %role, members = members.len(), "Fetched role members");
        Ok(members)
    }
}

#[async_trait]
impl TimelockInspector for EvmTimelockInspector {
    async fn get_proposers(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, *PROPOSER_ROLE).await
    }

    async fn get_executors(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, *EXECUTOR_ROLE).await
    }

    async fn get_bypassers(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, *BYPASSER_ROLE).await
    }

    async fn get_cancellers(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, *CANCELLER_ROLE).await
    }

    async fn is_operation(&self, address: &str, id: B256) -> Result<bool> {
        view(self.client.as_ref(), parse_address(address)?, isOperationCall { id }, "isOperation").await
    }

    async fn is_operation_pending(&self, address: &str, id: B256) -> Result<bool> {
        view(self.client.as_ref(), parse_address(address)?, isOperationPendingCall { id }, "isOperationPending").await
    }

    async fn is_operation_ready(&self, address: &str, id: B256) -> Result<bool> {
        view(self.client.as_ref(), parse_address(address)?, isOperationReadyCall { id }, "isOperationReady").await
    }

    async fn is_operation_done(&self, address: &str, id: B256) -> Result<bool> {
        view(self.client.as_ref(), parse_address(address)?, isOperationDoneCall { id }, "isOperationDone").await
    }

    async fn get_min_delay(&self, address: &str) -> Result<u64> {
        let delay = view(self.client.as_ref(), parse_address(address)?, getMinDelayCall {}, "getMinDelay").await?;
        u64::try_from(delay).map_err(|err| Error::decode("getMinDelay", err))
    }
}
