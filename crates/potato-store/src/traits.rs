use std::sync::Arc;

use potato_types::Potato;

use crate::error::StoreResult;

/// Durable collection of potato records.
///
/// All implementations must satisfy these invariants:
/// - `load` returns `Ok(vec![])` when no backing state exists yet.
/// - `save` replaces the prior contents all-or-nothing; a concurrent `load`
///   sees either the old collection or the new one, never a mix.
/// - Collection order and every field (including chain order) survive a
///   `load` -> `save` -> `load` round trip unchanged.
/// - Data that cannot be decoded is reported as `StoreError::Corrupt`.
///
/// The store does not serialize read-modify-write sequences on its own;
/// callers that mutate must hold a single exclusion boundary around
/// load -> mutate -> save.
pub trait ChainStore: Send + Sync {
    /// Load the full collection.
    fn load(&self) -> StoreResult<Vec<Potato>>;

    /// Persist the full collection, replacing prior contents atomically.
    fn save(&self, potatoes: &[Potato]) -> StoreResult<()>;
}

impl<T: ChainStore + ?Sized> ChainStore for Box<T> {
    fn load(&self) -> StoreResult<Vec<Potato>> {
        (**self).load()
    }

    fn save(&self, potatoes: &[Potato]) -> StoreResult<()> {
        (**self).save(potatoes)
    }
}

impl<T: ChainStore + ?Sized> ChainStore for Arc<T> {
    fn load(&self) -> StoreResult<Vec<Potato>> {
        (**self).load()
    }

    fn save(&self, potatoes: &[Potato]) -> StoreResult<()> {
        (**self).save(potatoes)
    }
}
