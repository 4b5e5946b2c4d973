//! The `DocumentStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `concierge-store-sqlite`). The client depends on this abstraction, never on
//! a concrete backend.

use std::future::Future;

use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::{
  path::{PushId, StorePath},
  query::{Child, Query},
};

/// Abstraction over a hierarchical key-value document tree.
///
/// Each call is a single attempt; retrying is the caller's decision. All
/// methods return `Send` futures so the trait can be used from multi-threaded
/// runtimes.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Point read. A path with no value of its own but with children reads as
  /// an object keyed by child key. `None` if nothing lives there.
  fn get<'a>(
    &'a self,
    path: &'a StorePath,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + 'a;

  /// Overwrite everything at and beneath `path`.
  fn set<'a>(
    &'a self,
    path: &'a StorePath,
    value: Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Merge top-level `fields` into the document at `path`, creating it if
  /// absent. A `null` field removes that field. Other fields are untouched.
  fn update<'a>(
    &'a self,
    path: &'a StorePath,
    fields: Map<String, Value>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Like [`update`](Self::update), but never creates: if no document lives
  /// at `path` nothing is written and `false` is returned.
  fn update_existing<'a>(
    &'a self,
    path: &'a StorePath,
    fields: Map<String, Value>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete the subtree at `path`. Removing nothing is not an error.
  fn remove<'a>(
    &'a self,
    path: &'a StorePath,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Direct children of `path`, filtered and ordered by `query`.
  fn query<'a>(
    &'a self,
    path: &'a StorePath,
    query: &'a Query,
  ) -> impl Future<Output = Result<Vec<Child>, Self::Error>> + Send + 'a;

  /// Reserve a new, time-ordered key. No store round trip is made.
  fn push_key(&self) -> PushId;

  /// Every successful write publishes the written path here.
  fn changes(&self) -> broadcast::Receiver<StorePath>;
}
