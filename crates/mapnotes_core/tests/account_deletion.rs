use mapnotes_core::{
    AccountDeletionError, AccountService, AuthError, AuthService, GeoPoint, MemoryAuthService,
    MemoryDocumentStore, NoteDraft, NoteRepository, StoreError, StoreNoteRepository,
};
use std::sync::Arc;

struct Fixture {
    service: AccountService<MemoryAuthService, StoreNoteRepository>,
    repo: StoreNoteRepository,
    auth: MemoryAuthService,
    store: MemoryDocumentStore,
    uid: String,
}

/// Signed-in user with two notes, plus one note of another owner.
fn fixture() -> Fixture {
    let auth = MemoryAuthService::new();
    let store = MemoryDocumentStore::new();
    let repo = StoreNoteRepository::new(Arc::new(store.clone()));

    let user = auth.sign_up("ann@example.com", "secret1").unwrap();
    repo.create(&user.uid, &NoteDraft::new("a", "d", GeoPoint::new(1.0, 1.0)))
        .unwrap();
    repo.create(&user.uid, &NoteDraft::new("b", "d", GeoPoint::new(2.0, 2.0)))
        .unwrap();
    repo.create("someone-else", &NoteDraft::new("c", "d", GeoPoint::new(3.0, 3.0)))
        .unwrap();

    Fixture {
        service: AccountService::new(auth.clone(), StoreNoteRepository::new(Arc::new(store.clone()))),
        repo,
        auth,
        store,
        uid: user.uid,
    }
}

#[test]
fn deletes_notes_then_account_in_order() {
    let fx = fixture();

    let report = fx.service.delete_account().unwrap();
    assert_eq!(report.notes_removed, 2);

    assert!(fx.repo.list_for_owner(&fx.uid).unwrap().is_empty());
    assert_eq!(fx.repo.list_for_owner("someone-else").unwrap().len(), 1);
    assert!(fx.auth.current_user().is_none());
    assert_eq!(
        fx.auth.sign_in("ann@example.com", "secret1").unwrap_err(),
        AuthError::InvalidCredential
    );
}

#[test]
fn requires_a_signed_in_user() {
    let fx = fixture();
    fx.auth.sign_out();

    let err = fx.service.delete_account().unwrap_err();
    assert_eq!(err, AccountDeletionError::NoCurrentUser);
    assert_eq!(fx.repo.list_for_owner(&fx.uid).unwrap().len(), 2);
}

#[test]
fn query_failure_stops_the_sequence_before_any_deletion() {
    let fx = fixture();
    fx.store
        .fail_next(StoreError::Unavailable("offline".to_string()));

    let err = fx.service.delete_account().unwrap_err();
    assert!(matches!(err, AccountDeletionError::NotesQuery(_)));

    // Nothing was deleted: notes and account are intact.
    assert_eq!(fx.repo.list_for_owner(&fx.uid).unwrap().len(), 2);
    assert!(fx.auth.current_user().is_some());
}

#[test]
fn failed_batch_leaves_every_note_and_the_account() {
    let fx = fixture();
    // Let the sequencer's gate query and the wipe's internal query pass,
    // fail the atomic batch itself.
    fx.store
        .fail_call_after(2, StoreError::Unavailable("offline".to_string()));

    let err = fx.service.delete_account().unwrap_err();
    assert!(matches!(err, AccountDeletionError::NotesDelete(_)));

    // All-or-nothing: zero of the owner's notes were removed.
    assert_eq!(fx.repo.list_for_owner(&fx.uid).unwrap().len(), 2);
    assert!(fx.auth.current_user().is_some());
}

#[test]
fn user_delete_failure_after_notes_removed_is_reported_not_repaired() {
    let fx = fixture();
    fx.auth
        .fail_next(AuthError::Unavailable("offline".to_string()));

    let err = fx.service.delete_account().unwrap_err();
    let AccountDeletionError::UserDelete {
        notes_removed,
        source,
    } = err
    else {
        panic!("expected UserDelete, got {err:?}");
    };
    assert_eq!(notes_removed, 2);
    assert!(matches!(source, AuthError::Unavailable(_)));

    // Accepted inconsistency: notes are gone, the account still exists.
    assert!(fx.repo.list_for_owner(&fx.uid).unwrap().is_empty());
    assert!(fx.auth.current_user().is_some());
}

#[test]
fn deleting_an_account_with_no_notes_succeeds() {
    let auth = MemoryAuthService::new();
    let store = MemoryDocumentStore::new();
    auth.sign_up("empty@example.com", "secret1").unwrap();
    let service = AccountService::new(auth.clone(), StoreNoteRepository::new(Arc::new(store)));

    let report = service.delete_account().unwrap();
    assert_eq!(report.notes_removed, 0);
    assert!(auth.current_user().is_none());
}
