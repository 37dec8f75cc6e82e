//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB: session
//!   flows, note CRUD and the map marker projection.
//! - Keep error semantics simple for early-stage UI integration.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every fallible call returns an envelope with `ok` and a message; no
//!   error is thrown into Dart.
//! - All note operations are scoped to the signed-in user.

use log::info;
use mapnotes_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    rebuild_markers, AccountService, GeoPoint, MemoryAuthService, MemoryDocumentStore, NoteDraft,
    NoteId, NoteRepository, StoreNoteRepository,
};
use std::sync::{Arc, OnceLock};

static RUNTIME: OnceLock<AppRuntime> = OnceLock::new();

/// Process-global collaborators backing the early-integration surface.
///
/// The in-process store and auth service stand in for the vendor SDKs
/// until the Dart shell wires the real ones.
struct AppRuntime {
    account: AccountService<MemoryAuthService, StoreNoteRepository>,
    notes: StoreNoteRepository,
}

fn runtime() -> &'static AppRuntime {
    RUNTIME.get_or_init(|| {
        let auth = MemoryAuthService::new();
        let store = MemoryDocumentStore::new();
        AppRuntime {
            account: AccountService::new(
                auth,
                StoreNoteRepository::new(Arc::new(store.clone())),
            ),
            notes: StoreNoteRepository::new(Arc::new(store)),
        }
    })
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on
///   failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope for command flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Session response envelope carrying the signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResponse {
    pub ok: bool,
    /// Stable user id; note queries are scoped by this value.
    pub uid: Option<String>,
    pub display_name: Option<String>,
    pub message: String,
}

impl SessionResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            uid: None,
            display_name: None,
            message: message.into(),
        }
    }
}

/// Note action response carrying the created/affected note id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteActionResponse {
    pub ok: bool,
    pub note_id: Option<String>,
    pub message: String,
}

/// One rendered map marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerItem {
    /// Note id, kept by the map surface as the marker tag.
    pub note_id: String,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Marker list envelope for the map screen.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerListResponse {
    pub items: Vec<MarkerItem>,
    pub message: String,
}

/// Signs an existing user in.
///
/// # FFI contract
/// - Sync call; validation errors and auth failures land in the envelope.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn session_sign_in(email: String, password: String) -> SessionResponse {
    match runtime().account.sign_in(email.trim(), &password) {
        Ok(user) => {
            info!("event=ffi_sign_in module=ffi status=ok");
            SessionResponse {
                ok: true,
                uid: Some(user.uid),
                display_name: user.display_name,
                message: "Signed in.".to_string(),
            }
        }
        Err(err) => SessionResponse::failure(format!("session_sign_in failed: {err}")),
    }
}

/// Registers a new user and stores the display name.
///
/// # FFI contract
/// - Sync call; validation errors and auth failures land in the envelope.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn session_register(
    name: String,
    email: String,
    password: String,
    confirm_password: String,
) -> SessionResponse {
    match runtime()
        .account
        .register(name.trim(), email.trim(), &password, &confirm_password)
    {
        Ok(user) => {
            info!("event=ffi_register module=ffi status=ok");
            SessionResponse {
                ok: true,
                uid: Some(user.uid),
                display_name: user.display_name,
                message: "Registration successful.".to_string(),
            }
        }
        Err(err) => SessionResponse::failure(format!("session_register failed: {err}")),
    }
}

/// Changes the current user's password after re-authentication.
///
/// # FFI contract
/// - Sync call; requires a signed-in user.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn session_change_password(old_password: String, new_password: String) -> ActionResponse {
    match runtime()
        .account
        .change_password(&old_password, &new_password)
    {
        Ok(()) => ActionResponse::success("Password changed."),
        Err(err) => ActionResponse::failure(format!("session_change_password failed: {err}")),
    }
}

/// Ends the current session.
///
/// # FFI contract
/// - Sync call; always succeeds.
#[flutter_rust_bridge::frb(sync)]
pub fn session_sign_out() -> ActionResponse {
    runtime().account.sign_out();
    ActionResponse::success("Signed out.")
}

/// Deletes the current user's notes and account, strictly in that order.
///
/// # FFI contract
/// - Sync call; partial-failure states are reported in the message.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn session_delete_account() -> ActionResponse {
    match runtime().account.delete_account() {
        Ok(report) => ActionResponse::success(format!(
            "Account and {} note(s) deleted.",
            report.notes_removed
        )),
        Err(err) => ActionResponse::failure(format!("session_delete_account failed: {err}")),
    }
}

/// Creates a note at the given position for the signed-in user.
///
/// # FFI contract
/// - Sync call; requires a signed-in user.
/// - Never panics; returns the created note id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn note_create(
    title: String,
    description: String,
    latitude: f64,
    longitude: f64,
) -> NoteActionResponse {
    let Some(user) = runtime().account.current_user() else {
        return NoteActionResponse {
            ok: false,
            note_id: None,
            message: "note_create failed: no user is signed in".to_string(),
        };
    };

    let draft = NoteDraft::new(title, description, GeoPoint::new(latitude, longitude));
    match runtime().notes.create(&user.uid, &draft) {
        Ok(id) => NoteActionResponse {
            ok: true,
            note_id: Some(id.to_string()),
            message: "Note saved.".to_string(),
        },
        Err(err) => NoteActionResponse {
            ok: false,
            note_id: None,
            message: format!("note_create failed: {err}"),
        },
    }
}

/// Rewrites title/description of one note.
///
/// # FFI contract
/// - Sync call; position is never touched by this path.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn note_update(note_id: String, title: String, description: String) -> ActionResponse {
    let id: NoteId = NoteId::new(note_id);
    match runtime().notes.update(&id, &title, &description) {
        Ok(()) => ActionResponse::success("Note updated."),
        Err(err) => ActionResponse::failure(format!("note_update failed: {err}")),
    }
}

/// Deletes one note. Deleting an already-deleted id succeeds.
///
/// # FFI contract
/// - Sync call; never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn note_delete(note_id: String) -> ActionResponse {
    let id: NoteId = NoteId::new(note_id);
    match runtime().notes.delete(&id) {
        Ok(()) => ActionResponse::success("Note deleted."),
        Err(err) => ActionResponse::failure(format!("note_delete failed: {err}")),
    }
}

/// Current user's markers for the map screen.
///
/// # FFI contract
/// - Sync call; one-off query projection, notes without coordinates are
///   skipped.
/// - Never panics; returns an empty list with a message when no user is
///   signed in or the query fails.
#[flutter_rust_bridge::frb(sync)]
pub fn map_markers() -> MarkerListResponse {
    let Some(user) = runtime().account.current_user() else {
        return MarkerListResponse {
            items: Vec::new(),
            message: "map_markers failed: no user is signed in".to_string(),
        };
    };

    match runtime().notes.list_for_owner(&user.uid) {
        Ok(notes) => {
            let items = rebuild_markers(&notes)
                .into_values()
                .map(|marker| MarkerItem {
                    note_id: marker.note_id.to_string(),
                    title: marker.title,
                    description: marker.description,
                    latitude: marker.position.latitude,
                    longitude: marker.position.longitude,
                })
                .collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No markers.".to_string()
            } else {
                format!("{} marker(s).", items.len())
            };
            MarkerListResponse { items, message }
        }
        Err(err) => MarkerListResponse {
            items: Vec::new(),
            message: format!("map_markers failed: {err}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, map_markers, note_create, note_delete, note_update, ping,
        session_change_password, session_delete_account, session_register, session_sign_in,
        session_sign_out,
    };

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    // The runtime session is process-global, so the whole session-dependent
    // flow runs in one test to keep ordering deterministic.
    #[test]
    fn session_flow_covers_notes_and_account_lifecycle() {
        // No session yet: note and marker calls fail soft.
        let denied = note_create("Park".to_string(), "Bench".to_string(), 51.1, 10.4);
        assert!(!denied.ok);
        assert!(denied.message.contains("no user is signed in"));
        assert!(!map_markers().message.is_empty());

        let rejected = session_register(
            "Ann".to_string(),
            "ann@example.com".to_string(),
            "secret1".to_string(),
            "different".to_string(),
        );
        assert!(!rejected.ok);

        let session = session_register(
            "Ann".to_string(),
            "ann@example.com".to_string(),
            "secret1".to_string(),
            "secret1".to_string(),
        );
        assert!(session.ok, "{}", session.message);
        assert_eq!(session.display_name.as_deref(), Some("Ann"));

        let created = note_create("Park".to_string(), "Bench here".to_string(), 51.1, 10.4);
        assert!(created.ok, "{}", created.message);
        let note_id = created.note_id.expect("created note should return id");

        let markers = map_markers();
        assert_eq!(markers.items.len(), 1);
        assert_eq!(markers.items[0].note_id, note_id);
        assert_eq!(markers.items[0].title, "Park");

        let updated = note_update(note_id.clone(), "Park2".to_string(), "Bench here".to_string());
        assert!(updated.ok, "{}", updated.message);
        assert_eq!(map_markers().items[0].title, "Park2");

        let changed = session_change_password("secret1".to_string(), "secret2".to_string());
        assert!(changed.ok, "{}", changed.message);

        let deleted = note_delete(note_id.clone());
        assert!(deleted.ok, "{}", deleted.message);
        assert!(map_markers().items.is_empty());
        // Idempotent from the caller's perspective.
        assert!(note_delete(note_id).ok);

        session_sign_out();
        let back = session_sign_in("ann@example.com".to_string(), "secret2".to_string());
        assert!(back.ok, "{}", back.message);

        let removed = session_delete_account();
        assert!(removed.ok, "{}", removed.message);
        let gone = session_sign_in("ann@example.com".to_string(), "secret2".to_string());
        assert!(!gone.ok);
    }
}
