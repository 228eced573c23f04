//! Counters recorded by the chain adapters.

use crate::chain::ChainFamily;

/// Metric handles scoped to one chain family.
#[derive(Clone, Copy, Debug)]
pub struct AdapterMetrics {
    family: ChainFamily,
}

impl AdapterMetrics {
    pub const fn new(family: ChainFamily) -> Self {
        Self { family }
    }

    /// Record a transaction that the chain accepted.
    #[inline]
    pub fn record_submission(&self, step: &'static str) {
        metrics::counter!("mcms_transactions_submitted_total", "family" => self.family.as_str(), "step" => step)
            .increment(1);
    }

    /// Record a transaction that the chain or transport rejected.
    #[inline]
    pub fn record_failure(&self, step: &'static str) {
        metrics::counter!("mcms_transaction_failures_total", "family" => self.family.as_str(), "step" => step)
            .increment(1);
    }

    /// Record a computed leaf or operation id.
    #[inline]
    pub fn record_hash(&self, kind: &'static str) {
        metrics::counter!("mcms_hashes_computed_total", "family" => self.family.as_str(), "kind" => kind)
            .increment(1);
    }
}
