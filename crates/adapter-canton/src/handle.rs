//! Move-only references to a live MCMS contract.

use mcms_core::{ContractIdentity, TransactionResult};

use crate::contract::MCMS_TEMPLATE_ID;

/// The active MCMS contract.
///
/// Consuming choices archive the contract, so every mutation takes the handle
/// by value and hands back the successor's. The type is not `Clone`: once a
/// handle has been spent on a mutation it cannot address the archived id.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "the contract behind a handle is archived by the next mutation; keep the returned handle"]
pub struct McmsHandle {
    identity: ContractIdentity,
}

impl McmsHandle {
    /// A handle on `contract_id`, referenced through the package-name template id.
    pub fn new(contract_id: impl Into<String>) -> Self {
        Self { identity: ContractIdentity { contract_id: contract_id.into(), template_id: MCMS_TEMPLATE_ID.to_owned() } }
    }

    pub fn contract_id(&self) -> &str {
        &self.identity.contract_id
    }

    pub fn template_id(&self) -> &str {
        &self.identity.template_id
    }

    pub fn into_identity(self) -> ContractIdentity {
        self.identity
    }
}

impl From<ContractIdentity> for McmsHandle {
    fn from(identity: ContractIdentity) -> Self {
        Self { identity }
    }
}

/// A committed mutation and the handle on the contract it created.
#[derive(Debug)]
#[must_use]
pub struct Mutation {
    pub result: TransactionResult,
    pub next: McmsHandle,
}

impl Mutation {
    /// The result alone, with the successor recorded in
    /// [`TransactionResult::recreated`].
    pub fn into_result(self) -> TransactionResult {
        let Self { mut result, next } = self;
        result.recreated = Some(next.into_identity());
        result
    }
}
