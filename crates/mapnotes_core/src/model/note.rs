//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical note record projected from store documents.
//! - Provide creation-side validation for caller-enforced constraints.
//!
//! # Invariants
//! - `id` is store-assigned, stable and never reused for another note.
//! - Every note has exactly one `owner_id`, immutable after creation.
//! - `latitude`/`longitude` are only ever written together as one `GeoPoint`.

use crate::store::DocumentId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier for every note.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NoteId = DocumentId;

/// WGS84 coordinate pair.
///
/// Latitude and longitude travel together; a half-written position is never
/// representable in the domain model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Degrees north, in `[-90.0, 90.0]`.
    pub latitude: f64,
    /// Degrees east, in `[-180.0, 180.0]`.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a coordinate pair without range checks.
    ///
    /// Range enforcement happens in `NoteDraft::validate()` on the write
    /// path; read paths tolerate whatever the store returns.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns whether both components are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Canonical note record decoded from one store document.
///
/// `position` is optional only to tolerate malformed documents: the store
/// should never produce a note without coordinates, but the client must not
/// fail when it does. Such notes are skipped by the marker synchronizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned stable ID.
    pub id: NoteId,
    /// Owning user's identifier. Immutable.
    pub owner_id: String,
    /// Non-empty display title.
    pub title: String,
    /// Non-empty body text.
    pub description: String,
    /// Geographic position; `None` only for malformed documents.
    pub position: Option<GeoPoint>,
    /// Server-assigned creation time in epoch milliseconds; set once.
    pub created_at_ms: Option<i64>,
}

/// Validation error for note write payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Title is empty after trimming.
    EmptyTitle,
    /// Description is empty after trimming.
    EmptyDescription,
    /// Coordinates are non-finite or outside WGS84 bounds.
    InvalidPosition,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "note title must not be empty"),
            Self::EmptyDescription => write!(f, "note description must not be empty"),
            Self::InvalidPosition => write!(f, "note position is outside valid WGS84 bounds"),
        }
    }
}

impl Error for NoteValidationError {}

/// Caller-side payload for creating one note.
///
/// The store does not enforce these constraints; write paths must call
/// `validate()` before issuing the remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    /// Non-empty display title.
    pub title: String,
    /// Non-empty body text.
    pub description: String,
    /// Position the note is pinned to.
    pub position: GeoPoint,
}

impl NoteDraft {
    /// Creates a draft from raw UI input. Title/description are trimmed.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        position: GeoPoint,
    ) -> Self {
        Self {
            title: title.into().trim().to_string(),
            description: description.into().trim().to_string(),
            position,
        }
    }

    /// Checks caller-enforced constraints before persistence.
    ///
    /// # Invariants
    /// - Title and description are non-empty after trimming.
    /// - Position is a finite, in-range WGS84 coordinate.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.title.trim().is_empty() {
            return Err(NoteValidationError::EmptyTitle);
        }
        if self.description.trim().is_empty() {
            return Err(NoteValidationError::EmptyDescription);
        }
        if !self.position.is_valid() {
            return Err(NoteValidationError::InvalidPosition);
        }
        Ok(())
    }
}

/// Validates an edit payload (title/description only).
///
/// The edit path never rewrites position; the store keeps whatever the note
/// was created with.
pub fn validate_note_edit(title: &str, description: &str) -> Result<(), NoteValidationError> {
    if title.trim().is_empty() {
        return Err(NoteValidationError::EmptyTitle);
    }
    if description.trim().is_empty() {
        return Err(NoteValidationError::EmptyDescription);
    }
    Ok(())
}
