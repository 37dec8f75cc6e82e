//! Note repository contract and document-store implementation.
//!
//! # Responsibility
//! - Provide owner-scoped note persistence APIs on top of the raw document
//!   store: create, edit, delete, live subscription, batched owner wipe.
//! - Own the wire schema mapping between `Note` and store documents.
//!
//! # Invariants
//! - Every query and subscription is constrained to one `userId`.
//! - Write paths validate caller-enforced constraints before any remote
//!   call; the store itself enforces nothing about note shape.
//! - The edit path rewrites only `title`/`description`; position and owner
//!   are never touched after creation.
//! - No operation retries; a failed call leaves store state untouched.

use crate::model::note::{
    validate_note_edit, GeoPoint, Note, NoteDraft, NoteId, NoteValidationError,
};
use crate::store::{
    Document, DocumentStore, FieldFilter, FieldValue, Fields, StoreError, SubscriptionHandle,
};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Wire field names, matching the original document schema.
pub const FIELD_TITLE: &str = "title";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_LAT: &str = "lat";
pub const FIELD_LNG: &str = "lng";
pub const FIELD_OWNER: &str = "userId";
pub const FIELD_TIMESTAMP: &str = "timestamp";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error taxonomy surfaced to services and UI glue.
#[derive(Debug, Clone, PartialEq)]
pub enum RepoError {
    /// Caller-side payload violated note constraints; nothing was sent.
    Validation(NoteValidationError),
    /// Transport-level failure reported by the store, unchanged.
    Store(StoreError),
    /// Target note does not exist (stale id on update).
    NotFound(NoteId),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Callback invoked with every owner-scoped note snapshot.
pub type NoteSnapshotListener = Box<dyn Fn(RepoResult<Vec<Note>>) + Send + Sync>;

/// Repository interface for owner-scoped note operations.
pub trait NoteRepository {
    /// Creates one note and returns its store-assigned id.
    fn create(&self, owner_id: &str, draft: &NoteDraft) -> RepoResult<NoteId>;
    /// Rewrites title/description of one existing note.
    fn update(&self, note_id: &NoteId, title: &str, description: &str) -> RepoResult<()>;
    /// Deletes one note. Deleting an already-deleted id is success.
    fn delete(&self, note_id: &NoteId) -> RepoResult<()>;
    /// Returns the owner's notes as a one-off query.
    fn list_for_owner(&self, owner_id: &str) -> RepoResult<Vec<Note>>;
    /// Registers an owner-scoped live query. The listener fires once
    /// immediately with the current set and again on every change to it.
    fn subscribe(
        &self,
        owner_id: &str,
        listener: NoteSnapshotListener,
    ) -> RepoResult<SubscriptionHandle>;
    /// Deletes all of the owner's notes as one atomic batch and returns the
    /// removed count. Notes of other owners are untouched.
    fn delete_all_for_owner(&self, owner_id: &str) -> RepoResult<u32>;
}

/// Document-store-backed note repository.
pub struct StoreNoteRepository {
    store: Arc<dyn DocumentStore>,
}

impl StoreNoteRepository {
    /// Constructs a repository over one store collection.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

impl NoteRepository for StoreNoteRepository {
    fn create(&self, owner_id: &str, draft: &NoteDraft) -> RepoResult<NoteId> {
        draft.validate()?;

        match self.store.add(encode_draft(owner_id, draft)) {
            Ok(id) => {
                info!("event=note_create module=repo status=ok id={id}");
                Ok(id)
            }
            Err(err) => {
                error!("event=note_create module=repo status=error error={err}");
                Err(err.into())
            }
        }
    }

    fn update(&self, note_id: &NoteId, title: &str, description: &str) -> RepoResult<()> {
        validate_note_edit(title, description)?;

        let mut fields = Fields::new();
        fields.insert(
            FIELD_TITLE.to_string(),
            FieldValue::Text(title.trim().to_string()),
        );
        fields.insert(
            FIELD_DESCRIPTION.to_string(),
            FieldValue::Text(description.trim().to_string()),
        );
        self.store.update(note_id, fields)?;
        debug!("event=note_update module=repo status=ok id={note_id}");
        Ok(())
    }

    fn delete(&self, note_id: &NoteId) -> RepoResult<()> {
        match self.store.delete(note_id) {
            // A stale id means the note is already gone; the caller asked
            // for absence and absence is what the store has.
            Ok(()) | Err(StoreError::NotFound(_)) => {
                debug!("event=note_delete module=repo status=ok id={note_id}");
                Ok(())
            }
            Err(err) => {
                error!("event=note_delete module=repo status=error id={note_id} error={err}");
                Err(err.into())
            }
        }
    }

    fn list_for_owner(&self, owner_id: &str) -> RepoResult<Vec<Note>> {
        let documents = self.store.query(&owner_filter(owner_id))?;
        Ok(documents.iter().map(decode_note).collect())
    }

    fn subscribe(
        &self,
        owner_id: &str,
        listener: NoteSnapshotListener,
    ) -> RepoResult<SubscriptionHandle> {
        let handle = self.store.subscribe(
            owner_filter(owner_id),
            Box::new(move |snapshot| {
                let mapped = snapshot
                    .map(|documents| documents.iter().map(decode_note).collect())
                    .map_err(RepoError::from);
                listener(mapped);
            }),
        )?;
        debug!("event=note_subscribe module=repo status=ok");
        Ok(handle)
    }

    fn delete_all_for_owner(&self, owner_id: &str) -> RepoResult<u32> {
        let ids: Vec<NoteId> = self
            .store
            .query(&owner_filter(owner_id))?
            .into_iter()
            .map(|document| document.id)
            .collect();

        match self.store.delete_batch(&ids) {
            Ok(()) => {
                info!(
                    "event=note_delete_all module=repo status=ok count={}",
                    ids.len()
                );
                Ok(ids.len() as u32)
            }
            Err(err) => {
                error!("event=note_delete_all module=repo status=error error={err}");
                Err(err.into())
            }
        }
    }
}

fn owner_filter(owner_id: &str) -> FieldFilter {
    FieldFilter::field_equals(FIELD_OWNER, FieldValue::Text(owner_id.to_string()))
}

fn encode_draft(owner_id: &str, draft: &NoteDraft) -> Fields {
    let mut fields = Fields::new();
    fields.insert(
        FIELD_TITLE.to_string(),
        FieldValue::Text(draft.title.clone()),
    );
    fields.insert(
        FIELD_DESCRIPTION.to_string(),
        FieldValue::Text(draft.description.clone()),
    );
    fields.insert(
        FIELD_LAT.to_string(),
        FieldValue::Double(draft.position.latitude),
    );
    fields.insert(
        FIELD_LNG.to_string(),
        FieldValue::Double(draft.position.longitude),
    );
    fields.insert(
        FIELD_OWNER.to_string(),
        FieldValue::Text(owner_id.to_string()),
    );
    fields.insert(FIELD_TIMESTAMP.to_string(), FieldValue::ServerTimestamp);
    fields
}

/// Decodes one store document into the domain record.
///
/// Read paths are tolerant: missing text fields decode to empty strings and
/// a missing coordinate decodes to `position: None`, so one malformed
/// document can never take down the whole snapshot.
fn decode_note(document: &Document) -> Note {
    let position = match (document.double(FIELD_LAT), document.double(FIELD_LNG)) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => None,
    };

    Note {
        id: document.id.clone(),
        owner_id: document.text(FIELD_OWNER).unwrap_or_default().to_string(),
        title: document.text(FIELD_TITLE).unwrap_or_default().to_string(),
        description: document
            .text(FIELD_DESCRIPTION)
            .unwrap_or_default()
            .to_string(),
        position,
        created_at_ms: document.integer(FIELD_TIMESTAMP),
    }
}
