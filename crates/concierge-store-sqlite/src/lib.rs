//! SQLite backend for the Concierge document tree and identity provider.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. [`SqliteStore`] and [`SqliteIdentity`]
//! share one connection, so a single file holds both the documents and the
//! accounts.

mod encode;
mod identity;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use identity::SqliteIdentity;
pub use store::SqliteStore;
