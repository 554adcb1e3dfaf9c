use std::sync::{Mutex, MutexGuard, PoisonError};

use potato_store::ChainStore;
use potato_types::{ActorId, Potato, PotatoId};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditReport, ChainAuditor};
use crate::error::{CustodyError, CustodyResult};
use crate::resolver::{ReceiverResolver, Resolution};
use crate::validator::{TransferRequest, TransferValidator};

/// Potatoes related to one actor.
///
/// A potato the actor both created and still holds appears in both lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActorPotatoes {
    pub created: Vec<Potato>,
    pub held: Vec<Potato>,
}

/// The single entry point for creating, passing, and querying potatoes.
///
/// Every mutation runs load -> validate -> mutate -> save while holding one
/// commit lock, so two writers can never interleave on the persisted
/// collection. Reads take a store snapshot without the lock.
///
/// Receiver resolution runs before the lock is taken, so a slow resolver
/// never stalls other writers. Once the lock is held the critical section is
/// synchronous and runs to completion: either the whole new collection is
/// saved or nothing is.
///
/// The service must be the only writer of its store.
pub struct OwnershipService<S, R> {
    store: S,
    resolver: R,
    validator: TransferValidator,
    commit_lock: Mutex<()>,
}

impl<S: ChainStore, R: ReceiverResolver> OwnershipService<S, R> {
    pub fn new(store: S, resolver: R) -> Self {
        Self {
            store,
            resolver,
            validator: TransferValidator::new(),
            commit_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a potato held by `creator`.
    pub fn create(&self, creator: &str) -> CustodyResult<Potato> {
        self.create_with_score(creator, None)
    }

    /// Create a potato held by `creator`, recording an externally computed score.
    pub fn create_with_score(&self, creator: &str, score: Option<u64>) -> CustodyResult<Potato> {
        let creator = ActorId::new(creator).map_err(|e| CustodyError::InvalidActor {
            reason: e.to_string(),
        })?;
        let potato = Potato::new(creator, score);

        let _guard = self.lock();
        let mut potatoes = self.load_for_write()?;
        potatoes.push(potato.clone());
        self.store.save(&potatoes)?;

        info!(
            potato_id = %potato.id(),
            creator = %potato.creator(),
            total = potatoes.len(),
            "potato created"
        );
        Ok(potato)
    }

    /// Pass potato `potato_id` from `sender` to the actor `receiver` resolves to.
    ///
    /// On rejection nothing is saved and the validator's reason is returned.
    pub fn transfer(
        &self,
        potato_id: &PotatoId,
        sender: &str,
        receiver: &str,
    ) -> CustodyResult<Potato> {
        let resolution = Resolution::resolve_with(&self.resolver, receiver);
        if let Resolution::Unresolved { reason } = &resolution {
            warn!(receiver, reason = %reason, "receiver resolution failed");
        }

        let _guard = self.lock();
        let mut potatoes = self.load_for_write()?;
        if let Some(potato) = potatoes.iter().find(|p| p.id() == potato_id) {
            Self::ensure_extendable(potato)?;
        }

        let request = TransferRequest {
            potato_id,
            sender,
            receiver,
            resolution: &resolution,
        };
        let approval = self.validator.validate(&potatoes, &request).map_err(|rejection| {
            warn!(
                potato_id = %potato_id,
                sender,
                receiver,
                code = rejection.code(),
                "transfer rejected"
            );
            rejection
        })?;

        let position = approval.position();
        potatoes[position].record_handoff(approval.into_receiver());
        self.store.save(&potatoes)?;

        let updated = potatoes.swap_remove(position);
        info!(
            potato_id = %potato_id,
            sender,
            receiver = %updated.current_holder(),
            chain_len = updated.chain().len(),
            "potato transferred"
        );
        Ok(updated)
    }

    /// Partition the collection into potatoes `actor` created and holds.
    pub fn query_by_actor(&self, actor: &str) -> CustodyResult<ActorPotatoes> {
        let potatoes = self.store.load()?;
        let mut result = ActorPotatoes::default();
        for potato in potatoes {
            match (potato.is_created_by(actor), potato.is_held_by(actor)) {
                (true, true) => {
                    result.created.push(potato.clone());
                    result.held.push(potato);
                }
                (true, false) => result.created.push(potato),
                (false, true) => result.held.push(potato),
                (false, false) => {}
            }
        }
        debug!(
            actor,
            created = result.created.len(),
            held = result.held.len(),
            "actor query"
        );
        Ok(result)
    }

    /// Look up a single potato.
    pub fn get(&self, potato_id: &PotatoId) -> CustodyResult<Option<Potato>> {
        Ok(self
            .store
            .load()?
            .into_iter()
            .find(|potato| potato.id() == potato_id))
    }

    /// Snapshot of the whole collection.
    pub fn list(&self) -> CustodyResult<Vec<Potato>> {
        Ok(self.store.load()?)
    }

    /// Check every stored record against the custody invariants.
    pub fn audit(&self) -> CustodyResult<AuditReport> {
        let potatoes = self.store.load()?;
        let report = ChainAuditor::audit(&potatoes);
        if !report.is_valid() {
            warn!(violations = report.violations.len(), "chain audit found violations");
        }
        Ok(report)
    }

    // The lock guards no data of its own; the persisted collection is
    // replaced whole, so a panic in another writer cannot leave it half done.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The transfer rules read the chain endpoints, so a record whose
    /// endpoints disagree with its fields is never extended.
    fn ensure_extendable(potato: &Potato) -> CustodyResult<()> {
        let damage: Vec<String> = ChainAuditor::audit_record(potato)
            .into_iter()
            .filter(|v| v.kind.is_structural())
            .map(|v| v.description)
            .collect();
        if damage.is_empty() {
            return Ok(());
        }
        let err = CustodyError::StorageCorrupt(format!(
            "potato {}: {}",
            potato.id(),
            damage.join("; ")
        ));
        error!(error = %err, "refusing to extend a damaged custody chain");
        Err(err)
    }

    fn load_for_write(&self) -> CustodyResult<Vec<Potato>> {
        self.store.load().map_err(|e| {
            let err = CustodyError::from(e);
            if matches!(err, CustodyError::StorageCorrupt(_)) {
                error!(error = %err, "refusing to write over corrupt chain store");
            }
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    use potato_store::{InMemoryChainStore, JsonFileChainStore, StoreError, StoreResult};
    use proptest::prelude::*;

    use super::*;
    use crate::resolver::{DirectoryResolver, PassthroughResolver, ResolveError};
    use crate::validator::Rejection;

    type MemoryService = OwnershipService<InMemoryChainStore, PassthroughResolver>;

    fn service() -> MemoryService {
        OwnershipService::new(InMemoryChainStore::new(), PassthroughResolver)
    }

    fn rejection(err: CustodyError) -> Rejection {
        match err {
            CustodyError::Rejected(rejection) => rejection,
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    /// Counts saves and can be told to fail them.
    #[derive(Default)]
    struct InstrumentedStore {
        inner: InMemoryChainStore,
        saves: AtomicUsize,
        fail_saves: bool,
    }

    impl ChainStore for InstrumentedStore {
        fn load(&self) -> StoreResult<Vec<Potato>> {
            self.inner.load()
        }

        fn save(&self, potatoes: &[Potato]) -> StoreResult<()> {
            if self.fail_saves {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "simulated write failure",
                )));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save(potatoes)
        }
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    #[test]
    fn create_starts_chain_with_creator() {
        let svc = service();
        let potato = svc.create("alice").unwrap();
        assert_eq!(potato.chain(), &[ActorId::new("alice").unwrap()]);
        assert_eq!(potato.current_holder().as_str(), "alice");
        assert_eq!(svc.list().unwrap(), vec![potato]);
    }

    #[test]
    fn create_rejects_empty_creator() {
        let svc = service();
        let err = svc.create("  ").unwrap_err();
        assert!(matches!(err, CustodyError::InvalidActor { .. }));
        assert_eq!(err.code(), "invalid_actor");
        assert!(svc.list().unwrap().is_empty());
    }

    #[test]
    fn create_appends_to_existing_collection() {
        let svc = service();
        let first = svc.create("alice").unwrap();
        let second = svc.create_with_score("bob", Some(77)).unwrap();
        let all = svc.list().unwrap();
        assert_eq!(all, vec![first, second]);
        assert_eq!(all[1].score(), Some(77));
    }

    // -----------------------------------------------------------------------
    // Transfer scenarios
    // -----------------------------------------------------------------------

    #[test]
    fn transfer_appends_receiver() {
        let svc = service();
        let potato = svc.create("alice").unwrap();
        let updated = svc.transfer(potato.id(), "alice", "bob").unwrap();
        let names: Vec<&str> = updated.chain().iter().map(ActorId::as_str).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(updated.current_holder().as_str(), "bob");
        assert_eq!(svc.get(potato.id()).unwrap(), Some(updated));
    }

    #[test]
    fn transfer_back_to_previous_holder_is_rejected() {
        let svc = service();
        let potato = svc.create("alice").unwrap();
        svc.transfer(potato.id(), "alice", "bob").unwrap();
        let err = svc.transfer(potato.id(), "bob", "alice").unwrap_err();
        assert_eq!(
            rejection(err),
            Rejection::ImmediateReturn {
                receiver: "alice".into()
            }
        );
    }

    #[test]
    fn transfer_to_self_is_rejected() {
        let svc = service();
        let potato = svc.create("alice").unwrap();
        svc.transfer(potato.id(), "alice", "bob").unwrap();
        let err = svc.transfer(potato.id(), "bob", "bob").unwrap_err();
        assert_eq!(rejection(err).code(), "self_transfer");
    }

    #[test]
    fn transfer_by_non_holder_leaves_state_unchanged() {
        let svc = service();
        let potato = svc.create("alice").unwrap();
        let before = svc.list().unwrap();
        let err = svc.transfer(potato.id(), "mallory", "bob").unwrap_err();
        assert_eq!(rejection(err).code(), "not_holder");
        assert_eq!(svc.list().unwrap(), before);
    }

    #[test]
    fn transfer_of_unknown_potato_is_not_found() {
        let svc = service();
        svc.create("alice").unwrap();
        let err = svc.transfer(&PotatoId::new(), "alice", "bob").unwrap_err();
        assert_eq!(rejection(err).code(), "not_found");
    }

    #[test]
    fn unresolved_receiver_is_rejected() {
        let resolver = DirectoryResolver::new([("bob", "0xB0B")]).unwrap();
        let svc = OwnershipService::new(InMemoryChainStore::new(), resolver);
        let potato = svc.create("0xA11CE").unwrap();

        let err = svc.transfer(potato.id(), "0xA11CE", "ghost").unwrap_err();
        assert_eq!(rejection(err).code(), "unresolved_receiver");

        let updated = svc.transfer(potato.id(), "0xA11CE", "@bob").unwrap();
        assert_eq!(updated.current_holder().as_str(), "0xB0B");
    }

    #[test]
    fn resolver_outage_fails_closed() {
        struct Offline;

        impl ReceiverResolver for Offline {
            fn resolve(&self, _handle: &str) -> Result<Option<ActorId>, ResolveError> {
                Err(ResolveError::Transport("directory unreachable".into()))
            }
        }

        let svc = OwnershipService::new(InstrumentedStore::default(), Offline);
        let potato = svc.create("alice").unwrap();
        let err = svc.transfer(potato.id(), "alice", "bob").unwrap_err();
        assert_eq!(rejection(err).code(), "unresolved_receiver");
        assert_eq!(svc.store().saves.load(Ordering::SeqCst), 1);
        assert_eq!(svc.get(potato.id()).unwrap(), Some(potato));
    }

    #[test]
    fn longer_cycle_is_allowed() {
        let svc = service();
        let potato = svc.create("alice").unwrap();
        svc.transfer(potato.id(), "alice", "bob").unwrap();
        svc.transfer(potato.id(), "bob", "carol").unwrap();
        let updated = svc.transfer(potato.id(), "carol", "alice").unwrap();
        assert_eq!(updated.chain().len(), 4);
    }

    #[test]
    fn rejected_transfer_never_saves() {
        let svc = OwnershipService::new(InstrumentedStore::default(), PassthroughResolver);
        let potato = svc.create("alice").unwrap();
        assert_eq!(svc.store().saves.load(Ordering::SeqCst), 1);

        svc.transfer(potato.id(), "bob", "carol").unwrap_err();
        svc.transfer(potato.id(), "alice", "alice").unwrap_err();
        svc.transfer(potato.id(), "alice", "").unwrap_err();
        assert_eq!(svc.store().saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_save_is_retryable_and_changes_nothing() {
        let seeded = Potato::new(ActorId::new("alice").unwrap(), None);
        let store = InstrumentedStore {
            inner: InMemoryChainStore::with_potatoes(vec![seeded.clone()]),
            saves: AtomicUsize::new(0),
            fail_saves: true,
        };
        let svc = OwnershipService::new(store, PassthroughResolver);

        let err = svc.transfer(seeded.id(), "alice", "bob").unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(svc.list().unwrap(), vec![seeded]);
    }

    #[test]
    fn corrupt_store_blocks_writes_and_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("potatoes.json");
        std::fs::write(&path, "{ not json").unwrap();
        let svc = OwnershipService::new(JsonFileChainStore::new(&path), PassthroughResolver);

        assert_eq!(svc.create("alice").unwrap_err().code(), "storage_corrupt");
        let err = svc.transfer(&PotatoId::new(), "alice", "bob").unwrap_err();
        assert_eq!(err.code(), "storage_corrupt");
        assert!(!err.is_retryable());
        assert_eq!(svc.query_by_actor("alice").unwrap_err().code(), "storage_corrupt");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    fn seeded(creator: &str, holder: &str, chain: &[&str]) -> Potato {
        serde_json::from_value(serde_json::json!({
            "id": PotatoId::new().to_string(),
            "creator": creator,
            "currentHolder": holder,
            "createdAt": "2025-06-01T08:00:00Z",
            "chain": chain,
        }))
        .unwrap()
    }

    #[test]
    fn damaged_record_is_never_extended() {
        let holder_mismatch = seeded("alice", "carol", &["alice", "bob"]);
        let empty_chain = seeded("alice", "alice", &[]);
        let wrong_creator = seeded("alice", "bob", &["mallory", "bob"]);
        let collection = vec![holder_mismatch.clone(), empty_chain.clone(), wrong_creator.clone()];
        let svc = OwnershipService::new(
            InstrumentedStore {
                inner: InMemoryChainStore::with_potatoes(collection.clone()),
                saves: AtomicUsize::new(0),
                fail_saves: false,
            },
            PassthroughResolver,
        );

        let err = svc.transfer(holder_mismatch.id(), "carol", "bob").unwrap_err();
        assert_eq!(err.code(), "storage_corrupt");
        assert!(!err.is_retryable());
        let err = svc.transfer(empty_chain.id(), "alice", "bob").unwrap_err();
        assert_eq!(err.code(), "storage_corrupt");
        let err = svc.transfer(wrong_creator.id(), "bob", "carol").unwrap_err();
        assert_eq!(err.code(), "storage_corrupt");

        assert_eq!(svc.store().saves.load(Ordering::SeqCst), 0);
        assert_eq!(svc.list().unwrap(), collection);
    }

    #[test]
    fn damaged_record_does_not_block_healthy_ones() {
        let damaged = seeded("alice", "carol", &["alice", "bob"]);
        let healthy = seeded("dave", "dave", &["dave"]);
        let svc = OwnershipService::new(
            InMemoryChainStore::with_potatoes(vec![damaged, healthy.clone()]),
            PassthroughResolver,
        );
        let updated = svc.transfer(healthy.id(), "dave", "erin").unwrap();
        assert_eq!(updated.current_holder().as_str(), "erin");
    }

    #[test]
    fn file_backed_service_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("potatoes.json");

        let potato_id = {
            let svc = OwnershipService::new(JsonFileChainStore::new(&path), PassthroughResolver);
            let potato = svc.create("alice").unwrap();
            svc.transfer(potato.id(), "alice", "bob").unwrap();
            *potato.id()
        };

        let svc = OwnershipService::new(JsonFileChainStore::new(&path), PassthroughResolver);
        let potato = svc.get(&potato_id).unwrap().unwrap();
        assert_eq!(potato.current_holder().as_str(), "bob");
        let err = svc.transfer(&potato_id, "bob", "alice").unwrap_err();
        assert_eq!(err.code(), "immediate_return");
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[test]
    fn query_partitions_created_and_held() {
        let svc = service();
        let kept = svc.create("alice").unwrap();
        let given = svc.create("alice").unwrap();
        let received = svc.create("bob").unwrap();
        svc.transfer(given.id(), "alice", "bob").unwrap();
        svc.transfer(received.id(), "bob", "alice").unwrap();

        let alice = svc.query_by_actor("alice").unwrap();
        let created: Vec<_> = alice.created.iter().map(|p| *p.id()).collect();
        let held: Vec<_> = alice.held.iter().map(|p| *p.id()).collect();
        assert_eq!(created, vec![*kept.id(), *given.id()]);
        assert_eq!(held, vec![*kept.id(), *received.id()]);

        let nobody = svc.query_by_actor("zed").unwrap();
        assert_eq!(nobody, ActorPotatoes::default());
    }

    #[test]
    fn audit_of_service_written_data_is_clean() {
        let svc = service();
        let potato = svc.create("alice").unwrap();
        svc.transfer(potato.id(), "alice", "bob").unwrap();
        svc.transfer(potato.id(), "bob", "carol").unwrap();
        let report = svc.audit().unwrap();
        assert!(report.is_valid());
        assert_eq!(report.handoff_count, 2);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn racing_transfers_of_one_potato_have_one_winner() {
        const RACERS: usize = 8;
        let svc = service();
        let potato = svc.create("alice").unwrap();
        let barrier = Barrier::new(RACERS);

        let results: Vec<CustodyResult<Potato>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..RACERS)
                .map(|n| {
                    let svc = &svc;
                    let barrier = &barrier;
                    let id = *potato.id();
                    scope.spawn(move || {
                        barrier.wait();
                        svc.transfer(&id, "alice", &format!("racer-{n}"))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        for result in results.into_iter().filter_map(Result::err) {
            assert_eq!(result.code(), "not_holder");
        }
        let stored = svc.get(potato.id()).unwrap().unwrap();
        assert_eq!(stored.chain().len(), 2);
    }

    #[test]
    fn concurrent_transfers_of_different_potatoes_are_all_kept() {
        const POTATOES: usize = 16;
        let dir = tempfile::tempdir().unwrap();
        let svc = OwnershipService::new(
            JsonFileChainStore::new(dir.path().join("potatoes.json")),
            PassthroughResolver,
        );
        let ids: Vec<PotatoId> = (0..POTATOES)
            .map(|_| *svc.create("alice").unwrap().id())
            .collect();
        let barrier = Barrier::new(POTATOES);

        thread::scope(|scope| {
            for (n, id) in ids.iter().enumerate() {
                let svc = &svc;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    svc.transfer(id, "alice", &format!("friend-{n}")).unwrap();
                });
            }
        });

        let stored = svc.list().unwrap();
        assert_eq!(stored.len(), POTATOES);
        for (n, id) in ids.iter().enumerate() {
            let potato = stored.iter().find(|p| p.id() == id).unwrap();
            assert_eq!(potato.current_holder().as_str(), format!("friend-{n}"));
            assert_eq!(potato.chain().len(), 2);
        }
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    #[derive(Clone, Debug)]
    enum Op {
        Create { creator: usize },
        Transfer { potato: usize, sender: usize, receiver: usize },
    }

    const ACTORS: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            1 => (0..ACTORS.len()).prop_map(|creator| Op::Create { creator }),
            4 => (0..8usize, 0..ACTORS.len(), 0..ACTORS.len()).prop_map(
                |(potato, sender, receiver)| Op::Transfer { potato, sender, receiver }
            ),
        ]
    }

    proptest! {
        #[test]
        fn custody_invariants_hold_for_any_operation_sequence(
            ops in proptest::collection::vec(op_strategy(), 1..60)
        ) {
            let svc = service();
            let mut ids: Vec<PotatoId> = Vec::new();

            for op in ops {
                match op {
                    Op::Create { creator } => {
                        let potato = svc.create(ACTORS[creator]).unwrap();
                        ids.push(*potato.id());
                    }
                    Op::Transfer { potato, sender, receiver } => {
                        if ids.is_empty() {
                            continue;
                        }
                        let id = ids[potato % ids.len()];
                        let before = svc.get(&id).unwrap().unwrap();
                        let result = svc.transfer(&id, ACTORS[sender], ACTORS[receiver]);
                        let after = svc.get(&id).unwrap().unwrap();
                        match result {
                            Ok(updated) => {
                                prop_assert_eq!(&updated, &after);
                                prop_assert_eq!(after.chain().len(), before.chain().len() + 1);
                                prop_assert_eq!(&after.chain()[..before.chain().len()], before.chain());
                                prop_assert_ne!(Some(after.current_holder()), before.previous_holder());
                                prop_assert_ne!(after.current_holder(), before.current_holder());
                            }
                            Err(err) => {
                                prop_assert!(err.rejection().is_some());
                                prop_assert_eq!(&after, &before);
                            }
                        }
                    }
                }

                let report = svc.audit().unwrap();
                prop_assert!(report.is_valid(), "violations: {:?}", report.violations);
            }

            let all = svc.list().unwrap();
            for actor in ACTORS {
                let expected_created: Vec<PotatoId> =
                    all.iter().filter(|p| p.creator() == &actor).map(|p| *p.id()).collect();
                let expected_held: Vec<PotatoId> =
                    all.iter().filter(|p| p.current_holder() == &actor).map(|p| *p.id()).collect();
                let got = svc.query_by_actor(actor).unwrap();
                let created: Vec<PotatoId> = got.created.iter().map(|p| *p.id()).collect();
                let held: Vec<PotatoId> = got.held.iter().map(|p| *p.id()).collect();
                prop_assert_eq!(created, expected_created);
                prop_assert_eq!(held, expected_held);
            }

            let holders: HashMap<PotatoId, String> = all
                .iter()
                .map(|p| (*p.id(), p.current_holder().to_string()))
                .collect();
            prop_assert_eq!(holders.len(), ids.len());
        }
    }
}
