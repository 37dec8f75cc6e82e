//! Core domain logic for MapNotes.
//! This crate is the single source of truth for business invariants; the
//! remote store itself stays authoritative for data.

pub mod auth;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod sync;

pub use auth::{
    is_valid_email, validate_password_change, validate_registration, validate_sign_in, AuthError,
    AuthResult, AuthService, AuthUser, CredentialError, MemoryAuthService, MIN_PASSWORD_LEN,
};
pub use config::{AppConfig, ThemePreference};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{GeoPoint, Note, NoteDraft, NoteId, NoteValidationError};
pub use repo::note_repo::{
    NoteRepository, NoteSnapshotListener, RepoError, RepoResult, StoreNoteRepository,
};
pub use service::account_service::{
    AccountDeletionError, AccountDeletionReport, AccountError, AccountService,
};
pub use store::{
    DocumentStore, MemoryDocumentStore, StoreError, StoreResult, SubscriptionHandle,
};
pub use sync::marker_sync::{rebuild_markers, Marker, MarkerSynchronizer, SyncError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
