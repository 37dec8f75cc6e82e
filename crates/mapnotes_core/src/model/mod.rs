//! Domain model for map-pinned notes.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one note-centric shape shared by repository and marker projection.
//!
//! # Invariants
//! - Every note is identified by a stable, store-assigned `NoteId`.
//! - Deletion is a hard remote delete; the store snapshot is the only truth.

pub mod note;
