use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use mcms_core::{Result, TimelockInspector};
use tracing::debug;

use crate::{
    accounts::{AccessController, Operation, OperationStatus, TimelockConfig},
    address::ContractAddress,
    client::{SolanaReader, clock, read_account, require_account},
    pubkey::Pubkey,
};

/// Role of a timelock instance, named after its access-controller field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Proposer,
    Executor,
    Canceller,
    Bypasser,
}

impl Role {
    const fn controller(self, config: &TimelockConfig) -> Pubkey {
        match self {
            Self::Proposer => config.proposer_role_access_controller,
            Self::Executor => config.executor_role_access_controller,
            Self::Canceller => config.canceller_role_access_controller,
            Self::Bypasser => config.bypasser_role_access_controller,
        }
    }
}

/// Reads timelock roles and operation accounts.
///
/// Readiness is evaluated against the cluster clock sysvar.
#[derive(Clone)]
pub struct SolanaTimelockInspector {
    reader: Arc<dyn SolanaReader>,
}

impl SolanaTimelockInspector {
    pub fn new(reader: Arc<dyn SolanaReader>) -> Self {
        Self { reader }
    }

    pub(crate) async fn config(&self, address: &str) -> Result<TimelockConfig> {
        let address: ContractAddress = address.parse()?;
        require_account(self.reader.as_ref(), &address.timelock_config()?, "timelock_config").await
    }

    /// The access controller account that gates `role`.
    pub async fn role_controller(&self, address: &str, role: Role) -> Result<Pubkey> {
        Ok(role.controller(&self.config(address).await?))
    }

    async fn role_members(&self, address: &str, role: Role) -> Result<Vec<String>> {
        let controller = self.role_controller(address, role).await?;
        let controller: AccessController =
            require_account(self.reader.as_ref(), &controller, "access_controller").await?;
        let members: Vec<String> = controller.members()?.iter().map(ToString::to_string).collect();
        debug!(address, ?role, members = members.len(), "Fetched role members");
        Ok(members)
    }

    async fn operation(&self, address: &str, id: B256) -> Result<Option<Operation>> {
        let address: ContractAddress = address.parse()?;
        read_account(self.reader.as_ref(), &address.timelock_operation(id)?, "timelock_operation").await
    }
}

#[async_trait]
impl TimelockInspector for SolanaTimelockInspector {
    async fn get_proposers(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, Role::Proposer).await
    }

    async fn get_executors(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, Role::Executor).await
    }

    async fn get_bypassers(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, Role::Bypasser).await
    }

    async fn get_cancellers(&self, address: &str) -> Result<Vec<String>> {
        self.role_members(address, Role::Canceller).await
    }

    async fn is_operation(&self, address: &str, id: B256) -> Result<bool> {
        Ok(self.operation(address, id).await?.is_some())
    }

    async fn is_operation_pending(&self, address: &str, id: B256) -> Result<bool> {
        Ok(self.operation(address, id).await?.is_some_and(|op| op.state == OperationStatus::Scheduled))
    }

    async fn is_operation_ready(&self, address: &str, id: B256) -> Result<bool> {
        let Some(op) = self.operation(address, id).await? else {
            return Ok(false);
        };
        if op.state != OperationStatus::Scheduled {
            return Ok(false);
        }
        let now = clock(self.reader.as_ref()).await?;
        Ok(i64::try_from(op.timestamp).is_ok_and(|at| at <= now))
    }

    async fn is_operation_done(&self, address: &str, id: B256) -> Result<bool> {
        Ok(self.operation(address, id).await?.is_some_and(|op| op.state == OperationStatus::Done))
    }

    async fn get_min_delay(&self, address: &str) -> Result<u64> {
        Ok(self.config(address).await?.min_delay)
    }
}
