//! Sessions and the `IdentityProvider` trait.
//!
//! A [`Session`] is handed out by the identity provider and passed explicitly
//! to every client operation; there is no ambient "current user".

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest password the identity provider accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// An authenticated identity. Immutable for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub uid:   String,
  pub email: String,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Failures reported by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("the email address is badly formatted")]
  InvalidEmail,

  #[error("the password must be at least {MIN_PASSWORD_LEN} characters")]
  WeakPassword,

  #[error("the email address is already in use by another account")]
  EmailAlreadyInUse,

  #[error("the email or password is incorrect")]
  InvalidCredentials,

  #[error("there is no account for this email address")]
  UserNotFound,

  #[error("identity backend error: {0}")]
  Backend(String),
}

/// Syntactic email check shared by providers: one `@`, a non-empty local
/// part, a dotted domain, no whitespace.
pub fn check_email(email: &str) -> Result<(), AuthError> {
  let (local, domain) = email.split_once('@').ok_or(AuthError::InvalidEmail)?;
  let well_formed = !local.is_empty()
    && !domain.contains('@')
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
    && !email.chars().any(char::is_whitespace);
  if well_formed { Ok(()) } else { Err(AuthError::InvalidEmail) }
}

pub fn check_password(password: &str) -> Result<(), AuthError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AuthError::WeakPassword);
  }
  Ok(())
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the hosted authentication service.
///
/// A successful `create_account` or `sign_in` also becomes the provider's
/// current session, which persists until `sign_out`.
pub trait IdentityProvider: Send + Sync {
  fn create_account<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Session, AuthError>> + Send + 'a;

  fn sign_in<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Session, AuthError>> + Send + 'a;

  /// The session left behind by a previous sign-in, if any.
  fn current_session(
    &self,
  ) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send + '_;

  fn send_password_reset<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<(), AuthError>> + Send + 'a;

  fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send + '_;
}
