//! Reading and renaming the signed-in user's profile.

use concierge_core::{
  path::StorePath,
  profile::{UserProfile, fields},
  schema::Schema,
  session::{IdentityProvider, Session},
  store::DocumentStore,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{Concierge, Error, Field, Result, error::required};

impl<S, I> Concierge<S, I>
where
  S: DocumentStore + 'static,
  I: IdentityProvider,
{
  pub async fn profile(&self, session: &Session) -> Result<UserProfile> {
    let path = StorePath::user(&session.uid)?;
    let value = self
      .store
      .get(&path)
      .await
      .map_err(Error::store_while_resolving)?
      .ok_or_else(|| Error::ProfileNotFound { uid: session.uid.clone() })?;
    debug!(uid = %session.uid, "read profile");
    Ok(UserProfile::decode(&value)?)
  }

  /// Change `fullName` only; every other profile field is left as it is.
  pub async fn update_full_name(&self, session: &Session, full_name: &str) -> Result<UserProfile> {
    let full_name = required(Field::FullName, full_name)?;
    let path = StorePath::user(&session.uid)?;

    let mut profile = self.profile(session).await?;

    let mut patch = Map::new();
    patch.insert(fields::FULL_NAME.to_owned(), Value::String(full_name.to_owned()));
    self.store.update(&path, patch).await.map_err(Error::store)?;

    info!(uid = %session.uid, "renamed");
    profile.full_name = full_name.to_owned();
    Ok(profile)
  }
}
