//! Document store contract consumed by the note repository.
//!
//! # Responsibility
//! - Define the collection-scoped document interface the remote store
//!   exposes: add/update/delete, equality queries, live snapshots, atomic
//!   batched deletes.
//! - Keep vendor transport details out of repository and service layers.
//!
//! # Invariants
//! - Document ids are store-assigned and never reused.
//! - `delete_batch` is all-or-nothing; a failed batch mutates nothing.
//! - Snapshot listeners fire once immediately on registration and again
//!   after every mutation that changes their matching set.
//!
//! # See also
//! - `crate::repo::note_repo` for the owner-scoped boundary on top.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

mod memory;

pub use memory::MemoryDocumentStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Opaque, store-assigned document identity.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wraps an identity value minted by a store implementation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scalar value stored in one document field.
///
/// `ServerTimestamp` is a write-side sentinel: the store replaces it with
/// its own clock at commit time, so clients never invent creation times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Double(f64),
    Integer(i64),
    ServerTimestamp,
}

/// Unordered field map of one document.
pub type Fields = BTreeMap<String, FieldValue>;

/// One stored document: identity plus current field state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

impl Document {
    /// Returns one text field, if present and of text type.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns one numeric field widened to `f64`, if present.
    pub fn double(&self, field: &str) -> Option<f64> {
        match self.fields.get(field) {
            Some(FieldValue::Double(value)) => Some(*value),
            Some(FieldValue::Integer(value)) => Some(*value as f64),
            _ => None,
        }
    }

    /// Returns one integer field, if present and of integer type.
    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.fields.get(field) {
            Some(FieldValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }
}

/// Single-field equality filter, the only query shape this layer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub equals: FieldValue,
}

impl FieldFilter {
    /// Builds a `field == value` filter.
    pub fn field_equals(field: impl Into<String>, equals: FieldValue) -> Self {
        Self {
            field: field.into(),
            equals,
        }
    }

    /// Returns whether one document matches this filter.
    pub fn matches(&self, document: &Document) -> bool {
        document.fields.get(self.field.as_str()) == Some(&self.equals)
    }
}

/// Transport-level store error taxonomy surfaced upward unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Network or service failure; the call never reached durable state.
    Unavailable(String),
    /// Security-rule or auth rejection.
    PermissionDenied(String),
    /// Target document does not exist (stale id).
    NotFound(DocumentId),
    /// Persisted document violates the expected shape.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(details) => write!(f, "store unavailable: {details}"),
            Self::PermissionDenied(details) => write!(f, "store permission denied: {details}"),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidData(details) => write!(f, "invalid persisted document: {details}"),
        }
    }
}

impl Error for StoreError {}

/// Callback invoked with every snapshot of a live query.
pub type SnapshotListener = Box<dyn Fn(StoreResult<Vec<Document>>) + Send + Sync>;

/// Cancellation handle for one live-query registration.
///
/// The registration is released on explicit `cancel()` and, as a safety
/// net, when the handle is dropped. After release no further snapshot is
/// delivered to the listener.
pub struct SubscriptionHandle {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    /// Wraps the release action of one registration.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Releases the registration now.
    pub fn cancel(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Collection-scoped document store interface.
///
/// Production deployments back this with the vendor SDK; tests and local
/// runs use [`MemoryDocumentStore`]. Implementations never retry; they
/// report the transport outcome of exactly one attempt.
pub trait DocumentStore: Send + Sync {
    /// Inserts one document and returns its assigned id.
    fn add(&self, fields: Fields) -> StoreResult<DocumentId>;

    /// Merges fields into an existing document.
    fn update(&self, id: &DocumentId, fields: Fields) -> StoreResult<()>;

    /// Removes one document.
    fn delete(&self, id: &DocumentId) -> StoreResult<()>;

    /// Returns all documents matching the filter, ordered by id.
    fn query(&self, filter: &FieldFilter) -> StoreResult<Vec<Document>>;

    /// Registers a live query. The listener fires once immediately with the
    /// current matching set.
    fn subscribe(
        &self,
        filter: FieldFilter,
        listener: SnapshotListener,
    ) -> StoreResult<SubscriptionHandle>;

    /// Deletes the given documents as one atomic batch. Unknown ids are
    /// skipped; any failure leaves every document in place.
    fn delete_batch(&self, ids: &[DocumentId]) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::{Document, DocumentId, FieldFilter, FieldValue, Fields, SubscriptionHandle};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn doc(id: &str, owner: &str) -> Document {
        let mut fields = Fields::new();
        fields.insert("userId".to_string(), FieldValue::Text(owner.to_string()));
        fields.insert("lat".to_string(), FieldValue::Double(51.1));
        Document {
            id: DocumentId::new(id),
            fields,
        }
    }

    #[test]
    fn filter_matches_on_field_equality() {
        let filter = FieldFilter::field_equals("userId", FieldValue::Text("u1".to_string()));
        assert!(filter.matches(&doc("a", "u1")));
        assert!(!filter.matches(&doc("a", "u2")));
    }

    #[test]
    fn filter_does_not_match_missing_field() {
        let filter = FieldFilter::field_equals("missing", FieldValue::Text("x".to_string()));
        assert!(!filter.matches(&doc("a", "u1")));
    }

    #[test]
    fn document_accessors_check_value_type() {
        let document = doc("a", "u1");
        assert_eq!(document.text("userId"), Some("u1"));
        assert_eq!(document.double("lat"), Some(51.1));
        assert_eq!(document.text("lat"), None);
        assert_eq!(document.integer("userId"), None);
    }

    #[test]
    fn subscription_handle_releases_once_on_cancel_and_drop() {
        let released = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&released);
        let handle = SubscriptionHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();
        assert_eq!(released.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&released);
        drop(SubscriptionHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }
}
