//! The building client: every operation a resident or manager performs,
//! written against the [`DocumentStore`] and [`IdentityProvider`] traits.
//!
//! Each operation that needs an identity takes an explicit [`Session`]. The
//! user's building is resolved afresh on every call; there is no cache.
//!
//! ```rust,ignore
//! let client = Concierge::new(store.clone(), store.identity());
//! let signed_in = client.login(&form).await?;
//! client.submit_request(&signed_in.session, &request_form).await?;
//! ```

pub mod complaints;
pub mod error;
pub mod login;
pub mod notifications;
pub mod profile;
pub mod push_token;
pub mod registration;
pub mod reminder;
pub mod requests;
pub mod resolve;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use concierge_core::{session::IdentityProvider, store::DocumentStore};

pub use concierge_core::session::Session;
pub use error::{Error, ErrorClass, Field, Result};
pub use login::{Landing, LoginForm, SignedIn};
pub use notifications::{NotificationFeed, Order};
pub use registration::RegistrationForm;
pub use requests::{HelpRequestForm, RequestFeed, RequestView};
pub use resolve::BuildingScope;

/// Client handle over a document store `S` and identity provider `I`.
///
/// Cloning is cheap; both backends are shared.
pub struct Concierge<S, I> {
  store:    Arc<S>,
  identity: Arc<I>,
}

impl<S, I> Clone for Concierge<S, I> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), identity: Arc::clone(&self.identity) }
  }
}

impl<S, I> Concierge<S, I>
where
  S: DocumentStore + 'static,
  I: IdentityProvider,
{
  pub fn new(store: S, identity: I) -> Self {
    Self { store: Arc::new(store), identity: Arc::new(identity) }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn identity(&self) -> &I { &self.identity }
}
