//! Per-address cache of raw contract state for inspectors.

use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;

use crate::error::Result;

/// Holds the last state read for a single contract address.
///
/// Looking up a different address drops the cached entry instead of keeping
/// both, and mutating adapters invalidate the address they wrote to.
#[derive(Debug)]
pub struct ContractCache<T> {
    entry: Mutex<Option<(String, T)>>,
    /// Bumped on every invalidation; a fetch that straddles one is not stored.
    generation: AtomicU64,
}

impl<T> Default for ContractCache<T> {
    fn default() -> Self {
        Self { entry: Mutex::new(None), generation: AtomicU64::new(0) }
    }
}

impl<T: Clone> ContractCache<T> {
    pub fn get(&self, address: &str) -> Option<T> {
        let mut entry = self.entry.lock();
        match entry.as_ref() {
            Some((cached, value)) if cached == address => Some(value.clone()),
            Some(_) => {
                *entry = None;
                None
            }
            None => None,
        }
    }

    pub fn store(&self, address: &str, value: T) {
        *self.entry.lock() = Some((address.to_owned(), value));
    }

    /// Drops the entry if it belongs to `address`.
    pub fn invalidate(&self, address: &str) {
        let mut entry = self.entry.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if entry.as_ref().is_some_and(|(cached, _)| cached == address) {
            *entry = None;
        }
    }

    /// Returns the cached state for `address`, fetching it on a miss.
    ///
    /// The lock is not held while `fetch` runs. A result fetched across an
    /// invalidation is returned but not cached.
    pub async fn get_or_fetch<F, Fut>(&self, address: &str, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(address) {
            return Ok(value);
        }
        let generation = self.generation.load(Ordering::Acquire);
        let value = fetch().await?;

        let mut entry = self.entry.lock();
        if self.generation.load(Ordering::Acquire) == generation {
            *entry = Some((address.to_owned(), value.clone()));
        }
        Ok(value)
    }
}
