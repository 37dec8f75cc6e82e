//! Repository layer over the remote document store.
//!
//! # Responsibility
//! - Define the owner-scoped data access contract for notes.
//! - Isolate wire schema and store transport details from service and
//!   synchronizer layers.
//!
//! # Invariants
//! - Repository writes validate note constraints before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   transport errors, and never retry.

pub mod note_repo;
