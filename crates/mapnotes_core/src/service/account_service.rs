//! Account use-case service.
//!
//! # Responsibility
//! - Orchestrate authentication flows: sign-in, registration with profile
//!   update, password change with re-authentication, sign-out.
//! - Run the account deletion sequence across store and auth collaborators
//!   as an explicit ordered pipeline with typed per-step results.
//!
//! # Invariants
//! - Credential validation happens before any remote call.
//! - Every deletion step is gated on the previous step's success; no step
//!   is retried and no step is compensated.
//! - A user-deletion failure after the notes batch succeeded is reported
//!   as exactly that state, never silently repaired.

use crate::auth::{
    validate_password_change, validate_registration, validate_sign_in, AuthError, AuthService,
    AuthUser, CredentialError,
};
use crate::repo::note_repo::{NoteRepository, RepoError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for the interactive account flows.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountError {
    /// Local validation rejected the input; nothing was sent remotely.
    Credential(CredentialError),
    /// Auth collaborator failure, surfaced verbatim.
    Auth(AuthError),
    /// Registration created the account but the profile update failed; the
    /// account exists with an incomplete profile.
    ProfileIncomplete { user: AuthUser, source: AuthError },
}

impl Display for AccountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credential(err) => write!(f, "{err}"),
            Self::Auth(err) => write!(f, "{err}"),
            Self::ProfileIncomplete { user, source } => write!(
                f,
                "account {} created but profile update failed: {source}",
                user.email
            ),
        }
    }
}

impl Error for AccountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Credential(err) => Some(err),
            Self::Auth(err) => Some(err),
            Self::ProfileIncomplete { source, .. } => Some(source),
        }
    }
}

impl From<CredentialError> for AccountError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

impl From<AuthError> for AccountError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

/// Typed failure of the account deletion sequence.
///
/// One variant per pipeline stage, so every partial-failure state the
/// sequence can reach is enumerable by callers and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountDeletionError {
    /// There is no signed-in user to delete; nothing happened.
    NoCurrentUser,
    /// Step 1 failed: the owner's notes could not be queried. Nothing was
    /// deleted.
    NotesQuery(RepoError),
    /// Step 2 failed: the atomic batch was rejected. All notes and the
    /// account are still in place.
    NotesDelete(RepoError),
    /// Step 3 failed after step 2 succeeded: the notes are gone but the
    /// account still exists. Accepted inconsistency, reported as-is.
    UserDelete { notes_removed: u32, source: AuthError },
}

impl Display for AccountDeletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCurrentUser => write!(f, "no user is signed in"),
            Self::NotesQuery(err) => write!(f, "failed to query notes for deletion: {err}"),
            Self::NotesDelete(err) => write!(f, "failed to delete notes: {err}"),
            Self::UserDelete {
                notes_removed,
                source,
            } => write!(
                f,
                "account deletion failed after removing {notes_removed} notes: {source}"
            ),
        }
    }
}

impl Error for AccountDeletionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoCurrentUser => None,
            Self::NotesQuery(err) | Self::NotesDelete(err) => Some(err),
            Self::UserDelete { source, .. } => Some(source),
        }
    }
}

/// Outcome of a fully successful account deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountDeletionReport {
    /// Notes removed by the atomic batch in step 2.
    pub notes_removed: u32,
}

/// Account service facade over the auth collaborator and note repository.
pub struct AccountService<A: AuthService, R: NoteRepository> {
    auth: A,
    notes: R,
}

impl<A: AuthService, R: NoteRepository> AccountService<A, R> {
    /// Creates a service over the provided collaborator implementations.
    pub fn new(auth: A, notes: R) -> Self {
        Self { auth, notes }
    }

    /// Signs an existing user in after local credential validation.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AccountError> {
        validate_sign_in(email, password)?;
        let user = self.auth.sign_in(email, password)?;
        info!("event=account_sign_in module=service status=ok");
        Ok(user)
    }

    /// Registers a new user, then stores the display name on the profile.
    ///
    /// The two remote calls are strictly sequenced; a profile-update
    /// failure leaves the created account in place and is reported as
    /// `ProfileIncomplete`.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<AuthUser, AccountError> {
        validate_registration(name, email, password, confirm_password)?;

        let user = self.auth.sign_up(email, password)?;
        if let Err(err) = self.auth.update_profile(name.trim()) {
            error!("event=account_register module=service status=error stage=profile error={err}");
            return Err(AccountError::ProfileIncomplete { user, source: err });
        }

        // Read the session back so the returned identity carries the
        // display name the profile update just wrote.
        let user = self
            .auth
            .current_user()
            .ok_or(AccountError::Auth(AuthError::NoCurrentUser))?;
        info!("event=account_register module=service status=ok");
        Ok(user)
    }

    /// Changes the current user's password after re-authentication with the
    /// old one.
    pub fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        validate_password_change(old_password, new_password)?;

        let current = self
            .auth
            .current_user()
            .ok_or(AccountError::Auth(AuthError::NoCurrentUser))?;
        // Fresh sign-in proves possession of the old password before the
        // sensitive update is attempted.
        self.auth.sign_in(&current.email, old_password)?;
        self.auth.update_password(new_password)?;
        info!("event=account_change_password module=service status=ok");
        Ok(())
    }

    /// Ends the current session.
    pub fn sign_out(&self) {
        self.auth.sign_out();
        info!("event=account_sign_out module=service status=ok");
    }

    /// Currently signed-in user, if any.
    pub fn current_user(&self) -> Option<AuthUser> {
        self.auth.current_user()
    }

    /// Deletes the current user's notes and account.
    ///
    /// Strict three-step sequence, each step gated on the previous one:
    /// query the owner's notes, delete them as one atomic batch, delete the
    /// authentication record. There is no local transaction spanning the
    /// collaborators, so a step-3 failure leaves notes gone and the account
    /// present; that state is reported, not compensated.
    pub fn delete_account(&self) -> Result<AccountDeletionReport, AccountDeletionError> {
        let user = self
            .auth
            .current_user()
            .ok_or(AccountDeletionError::NoCurrentUser)?;

        if let Err(err) = self.notes.list_for_owner(&user.uid) {
            error!("event=account_delete module=service status=error step=notes_query error={err}");
            return Err(AccountDeletionError::NotesQuery(err));
        }

        let notes_removed = match self.notes.delete_all_for_owner(&user.uid) {
            Ok(count) => count,
            Err(err) => {
                error!(
                    "event=account_delete module=service status=error step=notes_delete error={err}"
                );
                return Err(AccountDeletionError::NotesDelete(err));
            }
        };

        if let Err(err) = self.auth.delete_current_user() {
            error!(
                "event=account_delete module=service status=error step=user_delete notes_removed={notes_removed} error={err}"
            );
            return Err(AccountDeletionError::UserDelete {
                notes_removed,
                source: err,
            });
        }

        info!("event=account_delete module=service status=ok notes_removed={notes_removed}");
        Ok(AccountDeletionReport { notes_removed })
    }
}
