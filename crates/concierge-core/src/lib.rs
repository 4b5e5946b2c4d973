//! Core types and trait definitions for the Concierge building client.
//!
//! This crate is free of database and CLI dependencies. It knows
//! the shape of every record in the document tree, how to decode those records
//! strictly, and which principal may do what inside a building partition.

pub mod complaint;
pub mod error;
pub mod notification;
pub mod path;
pub mod policy;
pub mod profile;
pub mod push_id;
pub mod query;
pub mod request;
pub mod schema;
pub mod session;
pub mod stamp;
pub mod store;

pub use error::{Error, Result};
