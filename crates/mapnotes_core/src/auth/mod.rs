//! Authentication collaborator contract and credential policy.
//!
//! # Responsibility
//! - Define the vendor-owned authentication interface the account service
//!   orchestrates.
//! - Enforce caller-side credential validation so the remote service is
//!   never invoked with input the UI already knows is bad.
//!
//! # Invariants
//! - Validation happens before any remote call; remote errors are surfaced
//!   verbatim and never retried.
//! - Passwords must be at least `MIN_PASSWORD_LEN` characters.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;

pub use memory::MemoryAuthService;

/// Minimum accepted password length, matching the remote policy floor.
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub type AuthResult<T> = Result<T, AuthError>;

/// Authenticated identity as reported by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Stable user identifier; notes are scoped by this value.
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Authentication error taxonomy surfaced verbatim from the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown account or wrong password.
    InvalidCredential,
    /// Password rejected by the remote strength policy.
    WeakPassword,
    /// Registration target email already has an account.
    EmailInUse,
    /// Operation requires a signed-in user and none is present.
    NoCurrentUser,
    /// Network or service failure.
    Unavailable(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredential => write!(f, "invalid email or password"),
            Self::WeakPassword => write!(
                f,
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ),
            Self::EmailInUse => write!(f, "an account with this email already exists"),
            Self::NoCurrentUser => write!(f, "no user is signed in"),
            Self::Unavailable(details) => write!(f, "auth service unavailable: {details}"),
        }
    }
}

impl Error for AuthError {}

/// Vendor-owned authentication interface.
///
/// Mutating calls act on the service's current-user session, mirroring the
/// remote SDK: `update_password`, `update_profile` and
/// `delete_current_user` all require a signed-in user.
pub trait AuthService: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthUser>;
    fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthUser>;
    fn current_user(&self) -> Option<AuthUser>;
    fn update_password(&self, new_password: &str) -> AuthResult<()>;
    fn update_profile(&self, display_name: &str) -> AuthResult<()>;
    fn delete_current_user(&self) -> AuthResult<()>;
    fn sign_out(&self);
}

/// Caller-side credential validation failure; nothing was sent remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    EmptyName,
    EmptyEmail,
    InvalidEmail,
    EmptyPassword,
    PasswordTooShort,
    PasswordMismatch,
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "please enter a name"),
            Self::EmptyEmail => write!(f, "please enter an email address"),
            Self::InvalidEmail => write!(f, "please enter a valid email address"),
            Self::EmptyPassword => write!(f, "please enter a password"),
            Self::PasswordTooShort => write!(
                f,
                "the password must be at least {MIN_PASSWORD_LEN} characters long"
            ),
            Self::PasswordMismatch => write!(f, "passwords do not match"),
        }
    }
}

impl Error for CredentialError {}

/// Returns whether the value has a plausible email shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Validates sign-in input: both fields present, email well-formed.
pub fn validate_sign_in(email: &str, password: &str) -> Result<(), CredentialError> {
    if email.trim().is_empty() {
        return Err(CredentialError::EmptyEmail);
    }
    if !is_valid_email(email) {
        return Err(CredentialError::InvalidEmail);
    }
    if password.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }
    Ok(())
}

/// Validates registration input: name, email shape, password floor and
/// confirmation match.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), CredentialError> {
    if name.trim().is_empty() {
        return Err(CredentialError::EmptyName);
    }
    if email.trim().is_empty() {
        return Err(CredentialError::EmptyEmail);
    }
    if !is_valid_email(email) {
        return Err(CredentialError::InvalidEmail);
    }
    if password.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(CredentialError::PasswordTooShort);
    }
    if password != confirm_password {
        return Err(CredentialError::PasswordMismatch);
    }
    Ok(())
}

/// Validates password-change input: both passwords present.
pub fn validate_password_change(
    old_password: &str,
    new_password: &str,
) -> Result<(), CredentialError> {
    if old_password.is_empty() || new_password.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }
    Ok(())
}
