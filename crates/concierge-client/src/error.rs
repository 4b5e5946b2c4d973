//! Client error type and its mapping onto the three failure classes a screen
//! distinguishes.

use std::fmt;

use concierge_core::{path::PushId, session::AuthError};
use thiserror::Error;

/// A form field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  Email,
  Password,
  FullName,
  BuildingCode,
  Content,
  Subject,
  Description,
  ReminderTime,
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Email => "email",
      Self::Password => "password",
      Self::FullName => "full name",
      Self::BuildingCode => "building code",
      Self::Content => "content",
      Self::Subject => "subject",
      Self::Description => "description",
      Self::ReminderTime => "reminder time",
    })
  }
}

/// How a screen should react to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// Bad input caught before any remote call. Shown inline; the flow does not
  /// advance.
  Validation,
  /// The signed-in user's data does not allow the operation.
  Consistency,
  /// The store or identity backend failed. Never retried automatically.
  Transport,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{field} {reason}")]
  InvalidField { field: Field, reason: &'static str },

  #[error("no user is signed in")]
  NotSignedIn,

  #[error("no profile exists for user {uid}")]
  ProfileNotFound { uid: String },

  #[error("the profile of user {uid} has no building code")]
  BuildingCodeMissing { uid: String },

  #[error("building code {0:?} does not exist")]
  InvalidBuildingCode(String),

  #[error("the building code does not match this account")]
  BuildingCodeMismatch,

  #[error("permission denied: {0}")]
  PermissionDenied(&'static str),

  #[error("no help request with key {0}")]
  RequestNotFound(PushId),

  #[error("{matches} help requests have timestamp {timestamp}; expected exactly one")]
  RequestNotUniquelyIdentifiable { timestamp: i64, matches: usize },

  #[error(transparent)]
  Schema(#[from] concierge_core::Error),

  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error("store unavailable: {source}")]
  StoreUnavailable {
    /// Set when the failure happened while resolving the user's building.
    resolving: bool,
    #[source]
    source:    Box<dyn std::error::Error + Send + Sync>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub(crate) fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::StoreUnavailable { resolving: false, source: Box::new(err) }
  }

  pub(crate) fn store_while_resolving(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::StoreUnavailable { resolving: true, source: Box::new(err) }
  }

  pub fn class(&self) -> ErrorClass {
    match self {
      Self::InvalidField { .. } => ErrorClass::Validation,
      Self::Auth(AuthError::Backend(_)) | Self::StoreUnavailable { .. } => ErrorClass::Transport,
      Self::Auth(AuthError::InvalidEmail | AuthError::WeakPassword) => ErrorClass::Validation,
      Self::Auth(_)
      | Self::NotSignedIn
      | Self::ProfileNotFound { .. }
      | Self::BuildingCodeMissing { .. }
      | Self::InvalidBuildingCode(_)
      | Self::BuildingCodeMismatch
      | Self::PermissionDenied(_)
      | Self::RequestNotFound(_)
      | Self::RequestNotUniquelyIdentifiable { .. }
      | Self::Schema(_) => ErrorClass::Consistency,
    }
  }

  /// Whether the screen that issued the operation must close.
  ///
  /// A user whose building cannot be resolved has nothing to look at, so
  /// resolution failures end the flow. A building-code mismatch at login keeps
  /// the screen open for another attempt, and failures of a single write or
  /// lookup end only that operation.
  pub fn ends_flow(&self) -> bool {
    match self {
      Self::NotSignedIn
      | Self::ProfileNotFound { .. }
      | Self::BuildingCodeMissing { .. }
      | Self::Schema(_) => true,
      Self::StoreUnavailable { resolving, .. } => *resolving,
      _ => false,
    }
  }
}

/// Trim `value` and reject it if nothing is left.
pub(crate) fn required(field: Field, value: &str) -> Result<&str> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::InvalidField { field, reason: "is required" });
  }
  Ok(trimmed)
}
