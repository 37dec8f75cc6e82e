//! In-process authentication service.
//!
//! # Responsibility
//! - Provide the reference `AuthService` used by tests and local runs in
//!   place of the vendor SDK.
//! - Enforce the same observable policy the remote service applies: unique
//!   emails, the weak-password floor, current-user session semantics.
//! - Offer scripted fault injection for transport failure paths.

use super::{AuthError, AuthResult, AuthService, AuthUser, MIN_PASSWORD_LEN};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Reference in-memory implementation of [`AuthService`].
///
/// Clones share the same underlying account registry and session.
#[derive(Clone, Default)]
pub struct MemoryAuthService {
    state: Arc<Mutex<AuthState>>,
}

#[derive(Default)]
struct AuthState {
    /// Keyed by email; emails are unique account handles.
    users: BTreeMap<String, UserRecord>,
    /// Email of the signed-in user, if any.
    current: Option<String>,
    planned_fault: Option<PlannedFault>,
}

struct PlannedFault {
    /// Calls to let through before the fault fires.
    skip: usize,
    error: AuthError,
}

struct UserRecord {
    uid: String,
    password: String,
    display_name: Option<String>,
}

impl MemoryAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the service so the next call fails with `error` without
    /// touching state. The fault is consumed by exactly one call.
    pub fn fail_next(&self, error: AuthError) {
        self.fail_call_after(0, error);
    }

    /// Arms the service so the call after `skip` further successful calls
    /// fails with `error`. Used to hit a specific step inside a multi-call
    /// sequence.
    pub fn fail_call_after(&self, skip: usize, error: AuthError) {
        self.lock_state().planned_fault = Some(PlannedFault { skip, error });
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, AuthState> {
        self.state.lock().expect("auth state lock poisoned")
    }
}

impl AuthState {
    fn take_fault(&mut self) -> Option<AuthError> {
        let fire = match self.planned_fault.as_mut() {
            Some(fault) if fault.skip == 0 => true,
            Some(fault) => {
                fault.skip -= 1;
                false
            }
            None => false,
        };
        if fire {
            self.planned_fault.take().map(|fault| fault.error)
        } else {
            None
        }
    }

    fn user_of(&self, email: &str) -> Option<AuthUser> {
        self.users.get(email).map(|record| AuthUser {
            uid: record.uid.clone(),
            email: email.to_string(),
            display_name: record.display_name.clone(),
        })
    }

    fn current_record_mut(&mut self) -> AuthResult<&mut UserRecord> {
        let email = self.current.clone().ok_or(AuthError::NoCurrentUser)?;
        self.users
            .get_mut(&email)
            .ok_or(AuthError::NoCurrentUser)
    }
}

impl AuthService for MemoryAuthService {
    fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        let mut state = self.lock_state();
        if let Some(fault) = state.take_fault() {
            return Err(fault);
        }

        let email = email.trim().to_string();
        let user = match state.users.get(&email) {
            Some(record) if record.password == password => AuthUser {
                uid: record.uid.clone(),
                email: email.clone(),
                display_name: record.display_name.clone(),
            },
            _ => return Err(AuthError::InvalidCredential),
        };

        state.current = Some(email);
        debug!("event=auth_sign_in module=auth status=ok");
        Ok(user)
    }

    fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        let mut state = self.lock_state();
        if let Some(fault) = state.take_fault() {
            return Err(fault);
        }

        let email = email.trim().to_string();
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if state.users.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }

        let uid = Uuid::new_v4().simple().to_string();
        state.users.insert(
            email.clone(),
            UserRecord {
                uid: uid.clone(),
                password: password.to_string(),
                display_name: None,
            },
        );
        state.current = Some(email.clone());
        debug!("event=auth_sign_up module=auth status=ok");
        Ok(AuthUser {
            uid,
            email,
            display_name: None,
        })
    }

    fn current_user(&self) -> Option<AuthUser> {
        let state = self.lock_state();
        let email = state.current.clone()?;
        state.user_of(&email)
    }

    fn update_password(&self, new_password: &str) -> AuthResult<()> {
        let mut state = self.lock_state();
        if let Some(fault) = state.take_fault() {
            return Err(fault);
        }
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let record = state.current_record_mut()?;
        record.password = new_password.to_string();
        debug!("event=auth_update_password module=auth status=ok");
        Ok(())
    }

    fn update_profile(&self, display_name: &str) -> AuthResult<()> {
        let mut state = self.lock_state();
        if let Some(fault) = state.take_fault() {
            return Err(fault);
        }

        let record = state.current_record_mut()?;
        record.display_name = Some(display_name.trim().to_string());
        debug!("event=auth_update_profile module=auth status=ok");
        Ok(())
    }

    fn delete_current_user(&self) -> AuthResult<()> {
        let mut state = self.lock_state();
        if let Some(fault) = state.take_fault() {
            return Err(fault);
        }

        let email = state.current.take().ok_or(AuthError::NoCurrentUser)?;
        state.users.remove(&email);
        debug!("event=auth_delete_user module=auth status=ok");
        Ok(())
    }

    fn sign_out(&self) {
        self.lock_state().current = None;
        debug!("event=auth_sign_out module=auth status=ok");
    }
}
