//! [`SqliteStore`]: the SQLite implementation of [`DocumentStore`].

use std::{path::Path, sync::Arc, time::Duration};

use concierge_core::{
  path::{self as paths, PushId, StorePath},
  push_id::PushIdGenerator,
  query::{Child, Query},
  store::DocumentStore,
};
use rusqlite::OptionalExtension as _;
use serde_json::{Map, Value};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::warn;

use crate::{
  Result,
  encode::{assemble, decode_value, encode_value, merge_top_level, path_columns},
  identity::SqliteIdentity,
  schema::SCHEMA,
};

/// Capacity of the change feed; slower listeners observe a lag and re-query.
const CHANGE_BUFFER: usize = 256;

/// Strictly beneath `?1`. Segments never contain `/`, and `0` sorts right
/// after it, so this is a primary-key range scan.
const DESCENDANTS: &str = "(path >= ?1 || '/' AND path < ?1 || '0')";

/// Matches `?1` itself and everything beneath it.
const SUBTREE: &str = "(path = ?1 OR (path >= ?1 || '/' AND path < ?1 || '0'))";

const ROOTS: [&str; 5] = [
  paths::USERS,
  paths::BUILDINGS,
  paths::BUILDING_NOTIFICATIONS,
  paths::HELP_REQUESTS,
  paths::COMPLAINTS,
];

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document tree backed by a single SQLite file.
///
/// Cloning is cheap; the connection, key generator and change feed are
/// shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  keys:    Arc<PushIdGenerator>,
  changes: broadcast::Sender<StorePath>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    let (changes, _) = broadcast::channel(CHANGE_BUFFER);
    Ok(Self { conn, keys: Arc::new(PushIdGenerator::new()), changes })
  }

  /// The identity provider living in the same database file.
  pub fn identity(&self) -> SqliteIdentity { SqliteIdentity::new(self.conn.clone()) }

  /// Watch for commits made by other connections to the same file and
  /// announce them on the change feed as a change to every root.
  ///
  /// Writes made through this store are announced as they happen; this only
  /// matters when several processes share one database.
  pub fn follow_external_writes(&self, every: Duration) -> JoinHandle<()> {
    let store = self.clone();
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(every);
      let mut seen = None;
      loop {
        ticker.tick().await;
        let polled = store
          .conn
          .call(|conn| Ok(conn.query_row("PRAGMA data_version", [], |row| row.get::<_, i64>(0))?))
          .await;
        let version = match polled {
          Ok(version) => version,
          Err(e) => {
            warn!(error = %e, "stopped following external writes");
            return;
          }
        };
        if seen.is_some_and(|last| last != version) {
          for root in ROOTS {
            if let Ok(path) = StorePath::root(root) {
              store.publish(&path);
            }
          }
        }
        seen = Some(version);
      }
    })
  }

  /// Read, merge and write back the document at `path` in one transaction.
  /// Returns whether anything was written.
  async fn merge(
    &self,
    path: &StorePath,
    fields: Map<String, Value>,
    create: bool,
  ) -> Result<bool> {
    let (path_str, parent, key) = path_columns(path);

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let own: Option<String> = tx
          .query_row(
            "SELECT value_json FROM documents WHERE path = ?1",
            rusqlite::params![path_str],
            |row| row.get(0),
          )
          .optional()?;
        if own.is_none() && !create {
          return Ok(false);
        }

        let merged = merge_top_level(own.as_deref(), fields)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        tx.execute(
          "INSERT INTO documents (path, parent, key, value_json) VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(path) DO UPDATE SET value_json = excluded.value_json",
          rusqlite::params![path_str, parent, key, merged],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if written {
      self.publish(path);
    }
    Ok(written)
  }

  fn publish(&self, path: &StorePath) {
    // No subscribers is fine.
    let _ = self.changes.send(path.clone());
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = crate::Error;

  async fn get(&self, path: &StorePath) -> Result<Option<Value>> {
    let path_str = path.to_string();

    let (own, descendants): (Option<String>, Vec<(String, String)>) = self
      .conn
      .call(move |conn| {
        let own: Option<String> = conn
          .query_row(
            "SELECT value_json FROM documents WHERE path = ?1",
            rusqlite::params![path_str],
            |row| row.get(0),
          )
          .optional()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT path, value_json FROM documents WHERE {DESCENDANTS} ORDER BY path"
        ))?;
        let descendants = stmt
          .query_map(rusqlite::params![path_str], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((own, descendants))
      })
      .await?;

    assemble(path, own, descendants)
  }

  async fn set(&self, path: &StorePath, value: Value) -> Result<()> {
    let (path_str, parent, key) = path_columns(path);
    let value_str = (!value.is_null()).then(|| encode_value(&value));

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &format!("DELETE FROM documents WHERE {SUBTREE}"),
          rusqlite::params![path_str],
        )?;
        if let Some(value_str) = value_str {
          tx.execute(
            "INSERT INTO documents (path, parent, key, value_json) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![path_str, parent, key, value_str],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    self.publish(path);
    Ok(())
  }

  async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<()> {
    self.merge(path, fields, true).await?;
    Ok(())
  }

  async fn update_existing(
    &self,
    path: &StorePath,
    fields: Map<String, Value>,
  ) -> Result<bool> {
    self.merge(path, fields, false).await
  }

  async fn remove(&self, path: &StorePath) -> Result<()> {
    let path_str = path.to_string();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("DELETE FROM documents WHERE {SUBTREE}"),
          rusqlite::params![path_str],
        )?)
      })
      .await?;

    if removed > 0 {
      self.publish(path);
    }
    Ok(())
  }

  async fn query(&self, path: &StorePath, query: &Query) -> Result<Vec<Child>> {
    let parent = path.to_string();

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT key, value_json FROM documents WHERE parent = ?1")?;
        let rows = stmt
          .query_map(rusqlite::params![parent], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let children = rows
      .into_iter()
      .map(|(key, raw)| Ok(Child { key, value: decode_value(&raw)? }))
      .collect::<Result<Vec<_>>>()?;

    Ok(query.apply(children))
  }

  fn push_key(&self) -> PushId { self.keys.generate() }

  fn changes(&self) -> broadcast::Receiver<StorePath> { self.changes.subscribe() }
}
