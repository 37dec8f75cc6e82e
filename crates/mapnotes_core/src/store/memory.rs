//! In-process document store with live snapshots.
//!
//! # Responsibility
//! - Provide the reference `DocumentStore` used by tests and local runs in
//!   place of the vendor SDK.
//! - Deliver snapshot callbacks with the same observable ordering the
//!   remote store guarantees: one immediate snapshot per registration, one
//!   per matching-set change afterwards.
//! - Offer scripted fault injection so every transport error path is
//!   reachable from tests.
//!
//! # Invariants
//! - `delete_batch` mutates nothing when it fails.
//! - Listeners are never invoked while internal locks are held.
//! - Assigned timestamps are strictly increasing per store instance.

use super::{
    Document, DocumentId, DocumentStore, FieldFilter, FieldValue, Fields, SnapshotListener,
    StoreError, StoreResult, SubscriptionHandle,
};
use log::{debug, error};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Reference in-memory implementation of [`DocumentStore`].
///
/// Documents live in one collection, matching the single `notes` collection
/// the repository layer uses. Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<StoreState>,
}

#[derive(Default)]
struct StoreState {
    documents: Mutex<BTreeMap<DocumentId, Fields>>,
    listeners: Mutex<BTreeMap<u64, Arc<ListenerEntry>>>,
    next_listener_id: AtomicU64,
    last_timestamp_ms: Mutex<i64>,
    planned_fault: Mutex<Option<PlannedFault>>,
    next_snapshot_fault: Mutex<Option<StoreError>>,
}

struct PlannedFault {
    /// Operations to let through before the fault fires.
    skip: usize,
    error: StoreError,
}

struct ListenerEntry {
    filter: FieldFilter,
    listener: SnapshotListener,
    last_delivered: Mutex<Option<Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.lock_documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arms the store so the next operation fails with `error` without
    /// touching state. The fault is consumed by exactly one operation.
    pub fn fail_next(&self, error: StoreError) {
        self.fail_call_after(0, error);
    }

    /// Arms the store so the operation after `skip` further successful
    /// calls fails with `error`. Used to hit a specific step inside a
    /// multi-call sequence.
    pub fn fail_call_after(&self, skip: usize, error: StoreError) {
        *self
            .state
            .planned_fault
            .lock()
            .expect("store fault lock poisoned") = Some(PlannedFault { skip, error });
    }

    /// Arms the store so the next snapshot round delivers `error` to every
    /// registered listener instead of a document set.
    pub fn fail_next_snapshot(&self, error: StoreError) {
        *self
            .state
            .next_snapshot_fault
            .lock()
            .expect("store snapshot fault lock poisoned") = Some(error);
    }

    fn take_fault(&self) -> Option<StoreError> {
        let mut planned = self
            .state
            .planned_fault
            .lock()
            .expect("store fault lock poisoned");
        let fire = match planned.as_mut() {
            Some(fault) if fault.skip == 0 => true,
            Some(fault) => {
                fault.skip -= 1;
                false
            }
            None => false,
        };
        if fire {
            planned.take().map(|fault| fault.error)
        } else {
            None
        }
    }

    fn lock_documents(&self) -> std::sync::MutexGuard<'_, BTreeMap<DocumentId, Fields>> {
        self.state
            .documents
            .lock()
            .expect("store document lock poisoned")
    }

    /// Strictly increasing millisecond clock for server-assigned timestamps.
    fn next_timestamp_ms(&self) -> i64 {
        let system_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0);
        let mut last = self
            .state
            .last_timestamp_ms
            .lock()
            .expect("store clock lock poisoned");
        let next = system_ms.max(*last + 1);
        *last = next;
        next
    }

    fn resolve_write_sentinels(&self, fields: &mut Fields) {
        let stamp = self.next_timestamp_ms();
        for value in fields.values_mut() {
            if matches!(value, FieldValue::ServerTimestamp) {
                *value = FieldValue::Integer(stamp);
            }
        }
    }

    fn matching_documents(
        documents: &BTreeMap<DocumentId, Fields>,
        filter: &FieldFilter,
    ) -> Vec<Document> {
        documents
            .iter()
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .filter(|document| filter.matches(document))
            .collect()
    }

    /// Recomputes and delivers snapshots after one committed mutation.
    ///
    /// Listeners run on the mutating caller's stack with no store lock
    /// held, so a callback may issue further store calls.
    fn notify_listeners(&self) {
        let entries: Vec<Arc<ListenerEntry>> = self
            .state
            .listeners
            .lock()
            .expect("store listener lock poisoned")
            .values()
            .cloned()
            .collect();
        if entries.is_empty() {
            return;
        }

        let snapshot_fault = self
            .state
            .next_snapshot_fault
            .lock()
            .expect("store snapshot fault lock poisoned")
            .take();
        if let Some(fault) = snapshot_fault {
            error!(
                "event=store_snapshot module=store status=error listeners={} error={fault}",
                entries.len()
            );
            for entry in entries {
                (entry.listener)(Err(fault.clone()));
            }
            return;
        }

        let snapshots: Vec<(Arc<ListenerEntry>, Vec<Document>)> = {
            let documents = self.lock_documents();
            entries
                .into_iter()
                .map(|entry| {
                    let matching = Self::matching_documents(&documents, &entry.filter);
                    (entry, matching)
                })
                .collect()
        };

        for (entry, matching) in snapshots {
            let changed = {
                let mut last = entry
                    .last_delivered
                    .lock()
                    .expect("store listener state lock poisoned");
                if last.as_ref() == Some(&matching) {
                    false
                } else {
                    *last = Some(matching.clone());
                    true
                }
            };
            if changed {
                (entry.listener)(Ok(matching));
            }
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn add(&self, mut fields: Fields) -> StoreResult<DocumentId> {
        if let Some(fault) = self.take_fault() {
            error!("event=store_add module=store status=error error={fault}");
            return Err(fault);
        }

        self.resolve_write_sentinels(&mut fields);
        let id = DocumentId::new(Uuid::new_v4().simple().to_string());
        self.lock_documents().insert(id.clone(), fields);
        debug!("event=store_add module=store status=ok id={id}");

        self.notify_listeners();
        Ok(id)
    }

    fn update(&self, id: &DocumentId, mut fields: Fields) -> StoreResult<()> {
        if let Some(fault) = self.take_fault() {
            error!("event=store_update module=store status=error id={id} error={fault}");
            return Err(fault);
        }

        self.resolve_write_sentinels(&mut fields);
        {
            let mut documents = self.lock_documents();
            let Some(existing) = documents.get_mut(id) else {
                return Err(StoreError::NotFound(id.clone()));
            };
            existing.extend(fields);
        }
        debug!("event=store_update module=store status=ok id={id}");

        self.notify_listeners();
        Ok(())
    }

    fn delete(&self, id: &DocumentId) -> StoreResult<()> {
        if let Some(fault) = self.take_fault() {
            error!("event=store_delete module=store status=error id={id} error={fault}");
            return Err(fault);
        }

        if self.lock_documents().remove(id).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }
        debug!("event=store_delete module=store status=ok id={id}");

        self.notify_listeners();
        Ok(())
    }

    fn query(&self, filter: &FieldFilter) -> StoreResult<Vec<Document>> {
        if let Some(fault) = self.take_fault() {
            error!("event=store_query module=store status=error error={fault}");
            return Err(fault);
        }

        let documents = self.lock_documents();
        Ok(Self::matching_documents(&documents, filter))
    }

    fn subscribe(
        &self,
        filter: FieldFilter,
        listener: SnapshotListener,
    ) -> StoreResult<SubscriptionHandle> {
        if let Some(fault) = self.take_fault() {
            error!("event=store_subscribe module=store status=error error={fault}");
            return Err(fault);
        }

        let initial = {
            let documents = self.lock_documents();
            Self::matching_documents(&documents, &filter)
        };

        let entry = Arc::new(ListenerEntry {
            filter,
            listener,
            last_delivered: Mutex::new(Some(initial.clone())),
        });
        let listener_id = self.state.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.state
            .listeners
            .lock()
            .expect("store listener lock poisoned")
            .insert(listener_id, Arc::clone(&entry));
        debug!("event=store_subscribe module=store status=ok listener_id={listener_id}");

        // First snapshot is delivered synchronously, before the handle is
        // handed back to the caller.
        (entry.listener)(Ok(initial));

        let weak_state: Weak<StoreState> = Arc::downgrade(&self.state);
        Ok(SubscriptionHandle::new(move || {
            if let Some(state) = weak_state.upgrade() {
                state
                    .listeners
                    .lock()
                    .expect("store listener lock poisoned")
                    .remove(&listener_id);
                debug!("event=store_unsubscribe module=store status=ok listener_id={listener_id}");
            }
        }))
    }

    fn delete_batch(&self, ids: &[DocumentId]) -> StoreResult<()> {
        // Fault check happens before any removal so a failed batch leaves
        // every document in place.
        if let Some(fault) = self.take_fault() {
            error!(
                "event=store_delete_batch module=store status=error count={} error={fault}",
                ids.len()
            );
            return Err(fault);
        }

        let removed = {
            let mut documents = self.lock_documents();
            ids.iter()
                .filter(|id| documents.remove(id).is_some())
                .count()
        };
        debug!(
            "event=store_delete_batch module=store status=ok requested={} removed={removed}",
            ids.len()
        );

        if removed > 0 {
            self.notify_listeners();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryDocumentStore;
    use crate::store::{
        DocumentId, DocumentStore, FieldFilter, FieldValue, Fields, StoreError, StoreResult,
    };
    use std::sync::{Arc, Mutex};

    fn owner_filter(owner: &str) -> FieldFilter {
        FieldFilter::field_equals("userId", FieldValue::Text(owner.to_string()))
    }

    fn note_fields(owner: &str, title: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("userId".to_string(), FieldValue::Text(owner.to_string()));
        fields.insert("title".to_string(), FieldValue::Text(title.to_string()));
        fields.insert("timestamp".to_string(), FieldValue::ServerTimestamp);
        fields
    }

    fn collect_snapshots(
        store: &MemoryDocumentStore,
        owner: &str,
    ) -> (
        Arc<Mutex<Vec<StoreResult<usize>>>>,
        crate::store::SubscriptionHandle,
    ) {
        let seen: Arc<Mutex<Vec<StoreResult<usize>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = store
            .subscribe(
                owner_filter(owner),
                Box::new(move |snapshot| {
                    sink.lock()
                        .unwrap()
                        .push(snapshot.map(|documents| documents.len()));
                }),
            )
            .unwrap();
        (seen, handle)
    }

    #[test]
    fn add_assigns_id_and_replaces_timestamp_sentinel() {
        let store = MemoryDocumentStore::new();
        let id = store.add(note_fields("u1", "Park")).unwrap();

        let documents = store.query(&owner_filter("u1")).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, id);
        assert!(documents[0].integer("timestamp").unwrap() > 0);
    }

    #[test]
    fn assigned_timestamps_strictly_increase() {
        let store = MemoryDocumentStore::new();
        store.add(note_fields("u1", "a")).unwrap();
        store.add(note_fields("u1", "b")).unwrap();

        let documents = store.query(&owner_filter("u1")).unwrap();
        let mut stamps: Vec<i64> = documents
            .iter()
            .map(|d| d.integer("timestamp").unwrap())
            .collect();
        stamps.sort_unstable();
        assert_ne!(stamps[0], stamps[1]);
    }

    #[test]
    fn update_merges_fields_and_rejects_unknown_id() {
        let store = MemoryDocumentStore::new();
        let id = store.add(note_fields("u1", "Park")).unwrap();

        let mut patch = Fields::new();
        patch.insert("title".to_string(), FieldValue::Text("Park2".to_string()));
        store.update(&id, patch).unwrap();

        let documents = store.query(&owner_filter("u1")).unwrap();
        assert_eq!(documents[0].text("title"), Some("Park2"));
        assert_eq!(documents[0].text("userId"), Some("u1"));

        let missing = DocumentId::new("missing");
        let err = store.update(&missing, Fields::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == missing));
    }

    #[test]
    fn subscribe_delivers_immediate_snapshot_then_changes() {
        let store = MemoryDocumentStore::new();
        store.add(note_fields("u1", "existing")).unwrap();

        let (seen, _handle) = collect_snapshots(&store, "u1");
        assert_eq!(*seen.lock().unwrap(), vec![Ok(1)]);

        store.add(note_fields("u1", "second")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Ok(1), Ok(2)]);
    }

    #[test]
    fn unrelated_mutation_does_not_fire_listener() {
        let store = MemoryDocumentStore::new();
        let (seen, _handle) = collect_snapshots(&store, "u1");

        store.add(note_fields("someone_else", "other")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Ok(0)]);
    }

    #[test]
    fn cancelled_subscription_receives_nothing() {
        let store = MemoryDocumentStore::new();
        let (seen, handle) = collect_snapshots(&store, "u1");
        handle.cancel();

        store.add(note_fields("u1", "after cancel")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Ok(0)]);
    }

    #[test]
    fn dropped_handle_releases_subscription() {
        let store = MemoryDocumentStore::new();
        let (seen, handle) = collect_snapshots(&store, "u1");
        drop(handle);

        store.add(note_fields("u1", "after drop")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Ok(0)]);
    }

    #[test]
    fn injected_fault_fails_exactly_one_operation() {
        let store = MemoryDocumentStore::new();
        store.fail_next(StoreError::Unavailable("offline".to_string()));

        let err = store.add(note_fields("u1", "Park")).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.is_empty());

        store.add(note_fields("u1", "Park")).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn failed_batch_removes_nothing() {
        let store = MemoryDocumentStore::new();
        let a = store.add(note_fields("u1", "a")).unwrap();
        let b = store.add(note_fields("u1", "b")).unwrap();

        store.fail_next(StoreError::Unavailable("offline".to_string()));
        let err = store.delete_batch(&[a, b]).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn batch_skips_unknown_ids() {
        let store = MemoryDocumentStore::new();
        let a = store.add(note_fields("u1", "a")).unwrap();

        store
            .delete_batch(&[a, DocumentId::new("already-gone")])
            .unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_fault_reaches_listener_as_error() {
        let store = MemoryDocumentStore::new();
        let (seen, _handle) = collect_snapshots(&store, "u1");

        store.fail_next_snapshot(StoreError::PermissionDenied("rules".to_string()));
        store.add(note_fields("u1", "Park")).unwrap();

        let snapshots = seen.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(matches!(snapshots[1], Err(StoreError::PermissionDenied(_))));
    }

    #[test]
    fn listener_may_call_back_into_the_store() {
        let store = MemoryDocumentStore::new();
        let probe = store.clone();
        let observed: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);

        let _handle = store
            .subscribe(
                owner_filter("u1"),
                Box::new(move |snapshot| {
                    if snapshot.is_ok() {
                        // Re-entrant query while a snapshot is in flight.
                        let count = probe.query(&owner_filter("u1")).unwrap().len();
                        sink.lock().unwrap().push(count);
                    }
                }),
            )
            .unwrap();

        store.add(note_fields("u1", "Park")).unwrap();
        assert_eq!(*observed.lock().unwrap(), vec![0, 1]);
    }
}
