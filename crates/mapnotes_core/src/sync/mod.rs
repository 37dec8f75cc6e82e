//! Live view synchronization.
//!
//! # Responsibility
//! - Project the repository's live note snapshots onto a rendered marker
//!   set, one marker per note.
//!
//! # Invariants
//! - The remote store is the only source of truth; the marker set is a
//!   pure projection rebuilt wholesale on every snapshot.

pub mod marker_sync;
