//! Error taxonomy shared by every chain adapter.
//!
//! Validation variants are raised before anything is sent to a chain. Transport
//! failures surface as [`Error::SubmissionFailed`] (mutations, tagged with the
//! failing pipeline step) or [`Error::Query`] (reads).

use alloy_primitives::B256;

use crate::chain::{ChainFamily, ChainSelector};

/// Boxed error used as the source of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias defaulting to the crate [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tree flattens to more groups than the on-chain arrays hold.
    #[error("config flattens to {nodes} groups, at most {max} are supported", max = crate::config::MAX_GROUPS)]
    ConfigTooLarge { nodes: usize },

    #[error("signer group index {index} is out of range, the highest group index is 31")]
    GroupIndexOutOfRange { index: u8 },

    #[error("invalid quorum config: {0}")]
    InvalidConfig(String),

    #[error("too many signers: {count}, max number is {max}")]
    TooManySigners { count: usize, max: usize },

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid additional fields: {0}")]
    InvalidAdditionalFields(String),

    #[error("signatures are not sorted by ascending signer address")]
    UnsortedSignatures,

    /// The recovered signers cannot set a root under the chain's on-chain config.
    #[error("signatures do not reach quorum on chain {0}")]
    QuorumNotReached(ChainSelector),

    /// A mutating call on a re-creating ledger did not produce the next contract.
    #[error("transaction had no created {template} event, refusing to continue with stale contract {contract_id}")]
    NoCreatedEvent { template: String, contract_id: String },

    #[error("operation {0} is not ready")]
    OperationNotReady(B256),

    #[error("operation {0} not found")]
    OperationNotFound(B256),

    #[error("step {step} ({name}) failed: {source}")]
    SubmissionFailed {
        step: usize,
        name: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{query} is not supported on {family}")]
    UnsupportedOnChain { family: ChainFamily, query: &'static str },

    #[error("invalid address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unknown chain selector {0}")]
    UnknownChainSelector(ChainSelector),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("{query} failed: {source}")]
    Query {
        query: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },
}

impl Error {
    /// Wraps a transport failure of a single-step submission.
    pub fn submission(name: &'static str, source: impl Into<BoxError>) -> Self {
        Self::SubmissionFailed { step: 0, name, source: source.into() }
    }

    /// Wraps a transport failure at `step` of a multi-step pipeline.
    pub fn submission_step(step: usize, name: &'static str, source: impl Into<BoxError>) -> Self {
        Self::SubmissionFailed { step, name, source: source.into() }
    }

    pub fn query(query: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Query { query, source: source.into() }
    }

    pub fn invalid_address(address: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidAddress { address: address.into(), reason: reason.to_string() }
    }

    pub fn decode(what: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Decode { what, reason: reason.to_string() }
    }

    /// Whether the error was raised locally, before anything reached the chain.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ConfigTooLarge { .. }
                | Self::GroupIndexOutOfRange { .. }
                | Self::InvalidConfig(_)
                | Self::TooManySigners { .. }
                | Self::MissingField(_)
                | Self::InvalidAdditionalFields(_)
                | Self::UnsortedSignatures
                | Self::InvalidAddress { .. }
                | Self::InvalidSignature(_)
                | Self::InvalidProposal(_)
        )
    }
}
