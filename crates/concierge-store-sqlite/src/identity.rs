//! [`SqliteIdentity`]: an email/password identity provider stored alongside
//! the documents.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use chrono::Utc;
use concierge_core::session::{
  AuthError, IdentityProvider, Session, check_email, check_password,
};
use rand_core::OsRng;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

fn backend(err: impl std::fmt::Display) -> AuthError { AuthError::Backend(err.to_string()) }

/// Accounts, the current session and password-reset requests, all in the
/// database of the [`crate::SqliteStore`] that created it.
#[derive(Clone)]
pub struct SqliteIdentity {
  conn: tokio_rusqlite::Connection,
}

impl SqliteIdentity {
  pub(crate) fn new(conn: tokio_rusqlite::Connection) -> Self { Self { conn } }

  async fn remember(&self, uid: String) -> Result<(), AuthError> {
    let at = Utc::now().to_rfc3339();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO current_session (slot, uid, signed_in_at) VALUES (0, ?1, ?2)
           ON CONFLICT(slot) DO UPDATE SET uid = excluded.uid, signed_in_at = excluded.signed_in_at",
          rusqlite::params![uid, at],
        )?;
        Ok(())
      })
      .await
      .map_err(backend)
  }

  /// Number of password resets requested for `email` so far.
  pub async fn reset_requests(&self, email: &str) -> Result<usize, AuthError> {
    let email = email.to_owned();
    self
      .conn
      .call(move |conn| {
        let count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM password_resets r JOIN accounts a ON a.uid = r.uid
           WHERE a.email = ?1",
          rusqlite::params![email],
          |row| row.get(0),
        )?;
        Ok(count as usize)
      })
      .await
      .map_err(backend)
  }
}

impl IdentityProvider for SqliteIdentity {
  async fn create_account(&self, email: &str, password: &str) -> Result<Session, AuthError> {
    check_email(email)?;
    check_password(password)?;

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(backend)?
      .to_string();

    let uid = Uuid::new_v4().simple().to_string();
    let session = Session { uid: uid.clone(), email: email.to_owned() };
    let email = email.to_owned();
    let created_at = Utc::now().to_rfc3339();

    let created = self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO accounts (uid, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![uid, email, hash, created_at],
        )?;
        Ok(true)
      })
      .await
      .map_err(backend)?;

    if !created {
      return Err(AuthError::EmailAlreadyInUse);
    }
    self.remember(session.uid.clone()).await?;
    Ok(session)
  }

  async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
    check_email(email)?;

    let lookup = email.to_owned();
    let account: Option<(String, String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT uid, email, password_hash FROM accounts WHERE email = ?1",
              rusqlite::params![lookup],
              |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?,
        )
      })
      .await
      .map_err(backend)?;

    let (uid, stored_email, phc) = account.ok_or(AuthError::UserNotFound)?;
    let parsed = PasswordHash::new(&phc).map_err(backend)?;
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .map_err(|_| AuthError::InvalidCredentials)?;

    self.remember(uid.clone()).await?;
    Ok(Session { uid, email: stored_email })
  }

  async fn current_session(&self) -> Result<Option<Session>, AuthError> {
    self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT a.uid, a.email FROM current_session s
               JOIN accounts a ON a.uid = s.uid
               WHERE s.slot = 0",
              [],
              |row| Ok(Session { uid: row.get(0)?, email: row.get(1)? }),
            )
            .optional()?,
        )
      })
      .await
      .map_err(backend)
  }

  async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
    check_email(email)?;

    let email = email.to_owned();
    let reset_id = Uuid::new_v4().simple().to_string();
    let at = Utc::now().to_rfc3339();

    let known = self
      .conn
      .call(move |conn| {
        let uid: Option<String> = conn
          .query_row(
            "SELECT uid FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            |row| row.get(0),
          )
          .optional()?;
        let Some(uid) = uid else { return Ok(false) };
        conn.execute(
          "INSERT INTO password_resets (reset_id, uid, requested_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![reset_id, uid, at],
        )?;
        Ok(true)
      })
      .await
      .map_err(backend)?;

    if known { Ok(()) } else { Err(AuthError::UserNotFound) }
  }

  async fn sign_out(&self) -> Result<(), AuthError> {
    self
      .conn
      .call(|conn| {
        conn.execute("DELETE FROM current_session", [])?;
        Ok(())
      })
      .await
      .map_err(backend)
  }
}
