//! Resolving a session to the building partition it may touch.

use concierge_core::{
  path::StorePath,
  policy::{self, Action, Principal},
  profile::UserProfile,
  schema::Schema,
  session::{IdentityProvider, Session},
  store::DocumentStore,
};
use tracing::{debug, warn};

use crate::{Concierge, Error, Result};

/// A signed-in user together with their profile and building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingScope {
  pub uid:           String,
  pub profile:       UserProfile,
  /// Always non-empty.
  pub building_code: String,
}

impl BuildingScope {
  pub fn principal(&self) -> Principal<'_> {
    Principal {
      uid:           &self.uid,
      is_manager:    self.profile.is_manager,
      building_code: &self.building_code,
    }
  }

  pub fn is_manager(&self) -> bool { self.profile.is_manager }

  /// Run `action` through the access policy.
  pub fn authorize(&self, action: Action<'_>) -> Result<()> {
    match policy::evaluate(&self.principal(), &action) {
      policy::Decision::Allow => Ok(()),
      policy::Decision::Deny(reason) => {
        warn!(uid = %self.uid, building = %self.building_code, reason, "denied");
        Err(Error::PermissionDenied(reason))
      }
    }
  }

  /// Authorize a read of `partition`, a `{root}/{code}` path, by the building
  /// code it names.
  pub fn readable(&self, partition: StorePath) -> Result<StorePath> {
    self.authorize(Action::ReadPartition { building_code: partition.key() })?;
    Ok(partition)
  }
}

impl<S, I> Concierge<S, I>
where
  S: DocumentStore + 'static,
  I: IdentityProvider,
{
  /// Read `users/{uid}` and extract the building code.
  ///
  /// A single attempt: a store failure is reported as
  /// [`Error::StoreUnavailable`] with `resolving` set, and a missing profile or
  /// building code ends the calling flow.
  pub async fn resolve_building(&self, session: &Session) -> Result<BuildingScope> {
    let path = StorePath::user(&session.uid)?;
    let value = self
      .store
      .get(&path)
      .await
      .map_err(Error::store_while_resolving)?;

    let Some(value) = value else {
      warn!(uid = %session.uid, "profile not found");
      return Err(Error::ProfileNotFound { uid: session.uid.clone() });
    };
    let profile = UserProfile::decode(&value)?;

    let building_code = match profile.building_code.as_deref() {
      Some(code) if !code.is_empty() => code.to_owned(),
      _ => {
        warn!(uid = %session.uid, "profile has no building code");
        return Err(Error::BuildingCodeMissing { uid: session.uid.clone() });
      }
    };

    debug!(uid = %session.uid, building = %building_code, "resolved building");
    Ok(BuildingScope { uid: session.uid.clone(), profile, building_code })
  }
}
