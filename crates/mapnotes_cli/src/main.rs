//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive the core note flow once against the in-process collaborators to
//!   verify `mapnotes_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use mapnotes_core::{
    AccountService, GeoPoint, MarkerSynchronizer, MemoryAuthService, MemoryDocumentStore,
    NoteDraft, NoteRepository, StoreNoteRepository,
};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("mapnotes_core ping={}", mapnotes_core::ping());
    println!("mapnotes_core version={}", mapnotes_core::core_version());

    let store = MemoryDocumentStore::new();
    let repo = StoreNoteRepository::new(Arc::new(store.clone()));
    let account = AccountService::new(
        MemoryAuthService::new(),
        StoreNoteRepository::new(Arc::new(store)),
    );

    let user = account.register("Smoke", "smoke@example.com", "secret1", "secret1")?;
    let mut sync = MarkerSynchronizer::new();
    sync.start(&repo, &user.uid)?;

    let id = repo.create(
        &user.uid,
        &NoteDraft::new("Park", "Bench here", GeoPoint::new(51.1, 10.4)),
    )?;
    println!("note created markers={}", sync.markers().len());

    repo.update(&id, "Park2", "Bench here")?;
    let title = sync
        .marker(&id)
        .map(|marker| marker.title)
        .unwrap_or_default();
    println!("note updated title={title}");

    repo.delete(&id)?;
    println!("note deleted markers={}", sync.markers().len());
    sync.stop();

    let report = account.delete_account()?;
    println!("account deleted notes_removed={}", report.notes_removed);
    Ok(())
}
