//! Live marker synchronization against the note subscription.
//!
//! # Responsibility
//! - Keep an in-memory marker set consistent with the repository's live
//!   snapshot: every snapshot discards all markers and rebuilds them.
//! - Own the two-state subscription lifecycle of the consuming view.
//!
//! # Invariants
//! - Rebuild is wholesale: no marker identity survives across snapshots.
//! - Notes without a coordinate are skipped, never rendered, never fatal.
//! - A snapshot error leaves the current marker set unchanged.
//! - After `stop()` no snapshot mutates the set; the subscription handle is
//!   released exactly once.

use crate::model::note::{GeoPoint, Note, NoteId};
use crate::repo::note_repo::{NoteRepository, RepoError};
use crate::store::SubscriptionHandle;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Rendered projection of one note on the map surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Id of the note this marker projects; the map surface keeps it as the
    /// marker tag so taps can resolve back to the note.
    pub note_id: NoteId,
    pub title: String,
    pub description: String,
    pub position: GeoPoint,
}

/// Builds the full marker set for one snapshot.
///
/// Notes missing a coordinate are skipped silently; the store should never
/// produce one, but the projection must not fail when it does. Feeding the
/// same snapshot twice yields an identical map.
pub fn rebuild_markers(notes: &[Note]) -> BTreeMap<NoteId, Marker> {
    let mut markers = BTreeMap::new();
    for note in notes {
        let Some(position) = note.position else {
            warn!(
                "event=marker_skip module=sync status=ok id={} reason=missing_position",
                note.id
            );
            continue;
        };
        markers.insert(
            note.id.clone(),
            Marker {
                note_id: note.id.clone(),
                title: note.title.clone(),
                description: note.description.clone(),
                position,
            },
        );
    }
    markers
}

/// Synchronizer lifecycle error.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// `start` was called while a subscription is already active.
    AlreadySubscribed,
    /// Subscription registration failed at the repository.
    Repo(RepoError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadySubscribed => write!(f, "marker synchronizer is already subscribed"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AlreadySubscribed => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[derive(Default)]
struct MarkerBoard {
    markers: BTreeMap<NoteId, Marker>,
    last_error: Option<RepoError>,
    snapshots_applied: u64,
}

enum SyncState {
    Unsubscribed,
    Subscribed(SubscriptionHandle),
}

/// Keeps the rendered marker set of one map view in step with the store.
///
/// Exactly two states: *Unsubscribed* and *Subscribed*. `start` transitions
/// forward once per view lifetime, `stop` transitions back on view teardown
/// and releases the subscription. Snapshot callbacks may arrive on the
/// mutating caller's stack at any time while subscribed; the marker set is
/// mutex-guarded for that reason.
pub struct MarkerSynchronizer {
    board: Arc<Mutex<MarkerBoard>>,
    state: SyncState,
}

impl Default for MarkerSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerSynchronizer {
    pub fn new() -> Self {
        Self {
            board: Arc::new(Mutex::new(MarkerBoard::default())),
            state: SyncState::Unsubscribed,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self.state, SyncState::Subscribed(_))
    }

    /// Subscribes to the owner's live note query.
    ///
    /// The first snapshot arrives synchronously during this call, so the
    /// marker set is populated when `start` returns `Ok`.
    pub fn start<R: NoteRepository>(&mut self, repo: &R, owner_id: &str) -> Result<(), SyncError> {
        if self.is_subscribed() {
            return Err(SyncError::AlreadySubscribed);
        }

        let board = Arc::clone(&self.board);
        let handle = repo.subscribe(
            owner_id,
            Box::new(move |snapshot| apply_snapshot(&board, snapshot)),
        )?;
        self.state = SyncState::Subscribed(handle);
        debug!("event=marker_sync_start module=sync status=ok");
        Ok(())
    }

    /// Releases the subscription. Idempotent; the marker set keeps its last
    /// rebuilt content for the caller to clear or drop.
    pub fn stop(&mut self) {
        if let SyncState::Subscribed(handle) =
            std::mem::replace(&mut self.state, SyncState::Unsubscribed)
        {
            handle.cancel();
            debug!("event=marker_sync_stop module=sync status=ok");
        }
    }

    /// Current marker set, ordered by note id.
    pub fn markers(&self) -> Vec<Marker> {
        self.lock_board().markers.values().cloned().collect()
    }

    /// Looks up one marker by the note it projects.
    pub fn marker(&self, note_id: &NoteId) -> Option<Marker> {
        self.lock_board().markers.get(note_id).cloned()
    }

    /// Error delivered by the most recent snapshot, if it failed.
    pub fn last_error(&self) -> Option<RepoError> {
        self.lock_board().last_error.clone()
    }

    /// Number of successful snapshot rebuilds since construction.
    pub fn snapshots_applied(&self) -> u64 {
        self.lock_board().snapshots_applied
    }

    fn lock_board(&self) -> std::sync::MutexGuard<'_, MarkerBoard> {
        self.board.lock().expect("marker board lock poisoned")
    }
}

fn apply_snapshot(board: &Mutex<MarkerBoard>, snapshot: Result<Vec<Note>, RepoError>) {
    let mut board = board.lock().expect("marker board lock poisoned");
    match snapshot {
        Ok(notes) => {
            board.markers = rebuild_markers(&notes);
            board.last_error = None;
            board.snapshots_applied += 1;
            debug!(
                "event=marker_rebuild module=sync status=ok markers={}",
                board.markers.len()
            );
        }
        Err(err) => {
            // The original listener bails out on error and keeps whatever
            // markers are on screen; mirror that.
            warn!("event=marker_rebuild module=sync status=error error={err}");
            board.last_error = Some(err);
        }
    }
}
