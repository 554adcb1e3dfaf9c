use std::sync::{PoisonError, RwLock};

use potato_types::Potato;
use tracing::debug;

use crate::error::StoreResult;
use crate::traits::ChainStore;

/// In-memory chain store.
///
/// Intended for tests and embedding. The collection lives behind a `RwLock`
/// and is replaced wholesale on `save`, so readers always clone a complete
/// snapshot. Data is lost when the store is dropped.
pub struct InMemoryChainStore {
    potatoes: RwLock<Vec<Potato>>,
}

impl InMemoryChainStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::with_potatoes(Vec::new())
    }

    /// Create a store seeded with an existing collection.
    pub fn with_potatoes(potatoes: Vec<Potato>) -> Self {
        Self {
            potatoes: RwLock::new(potatoes),
        }
    }

    /// Number of potatoes currently stored.
    pub fn len(&self) -> usize {
        self.potatoes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryChainStore {
    fn default() -> Self {
        Self::new()
    }
}

// The guarded value is only ever replaced whole, so a poisoned lock still
// holds a complete collection and is safe to recover.
impl ChainStore for InMemoryChainStore {
    fn load(&self) -> StoreResult<Vec<Potato>> {
        let potatoes = self.potatoes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(potatoes.clone())
    }

    fn save(&self, potatoes: &[Potato]) -> StoreResult<()> {
        let replacement = potatoes.to_vec();
        let mut current = self.potatoes.write().unwrap_or_else(PoisonError::into_inner);
        *current = replacement;
        debug!(count = current.len(), "in-memory chain store replaced");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryChainStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChainStore")
            .field("potato_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use potato_types::ActorId;

    fn potato(creator: &str) -> Potato {
        Potato::new(ActorId::new(creator).unwrap(), None)
    }

    #[test]
    fn empty_store_loads_empty_collection() {
        let store = InMemoryChainStore::new();
        assert!(store.load().unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn save_replaces_collection() {
        let store = InMemoryChainStore::new();
        store.save(&[potato("alice"), potato("bob")]).unwrap();
        assert_eq!(store.len(), 2);

        let only = potato("carol");
        store.save(std::slice::from_ref(&only)).unwrap();
        assert_eq!(store.load().unwrap(), vec![only]);
    }

    #[test]
    fn load_returns_independent_snapshot() {
        let store = InMemoryChainStore::with_potatoes(vec![potato("alice")]);
        let mut snapshot = store.load().unwrap();
        snapshot[0].record_handoff(ActorId::new("bob").unwrap());

        let fresh = store.load().unwrap();
        assert_eq!(fresh[0].chain().len(), 1);
    }

    #[test]
    fn preserves_order_and_chains() {
        let mut first = potato("alice");
        first.record_handoff(ActorId::new("bob").unwrap());
        first.record_handoff(ActorId::new("carol").unwrap());
        let second = potato("dave");

        let store = InMemoryChainStore::new();
        store.save(&[first.clone(), second.clone()]).unwrap();
        assert_eq!(store.load().unwrap(), vec![first, second]);
    }

    #[test]
    fn boxed_store_delegates() {
        let store: Box<dyn ChainStore> = Box::new(InMemoryChainStore::new());
        store.save(&[potato("alice")]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
