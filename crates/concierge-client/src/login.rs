//! Sign-in, silent re-entry, sign-out and password reset.

use concierge_core::{
  profile::UserProfile,
  session::{IdentityProvider, Session},
  store::DocumentStore,
};
use tracing::{info, warn};

use crate::{BuildingScope, Concierge, Error, Field, Result, error::required};

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
  pub email:         String,
  pub password:      String,
  pub building_code: String,
}

/// Which landing screen a signed-in user is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
  Manager,
  Resident,
}

impl Landing {
  pub fn for_profile(profile: &UserProfile) -> Self {
    if profile.is_manager { Self::Manager } else { Self::Resident }
  }
}

/// The outcome of a successful login or re-entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
  pub session: Session,
  pub scope:   BuildingScope,
  pub landing: Landing,
}

impl<S, I> Concierge<S, I>
where
  S: DocumentStore + 'static,
  I: IdentityProvider,
{
  /// Authenticate and check the supplied building code against the profile.
  ///
  /// On [`Error::BuildingCodeMismatch`] the provider session stays live; a
  /// later [`Concierge::resume`] will pick it up.
  pub async fn login(&self, form: &LoginForm) -> Result<SignedIn> {
    let email = required(Field::Email, &form.email)?;
    let password = required(Field::Password, &form.password)?;
    let building_code = required(Field::BuildingCode, &form.building_code)?;

    let session = self.identity.sign_in(email, password).await?;
    let scope = self.resolve_building(&session).await?;

    if scope.building_code != building_code {
      warn!(uid = %session.uid, "building code mismatch at login");
      return Err(Error::BuildingCodeMismatch);
    }

    let landing = Landing::for_profile(&scope.profile);
    info!(uid = %session.uid, building = %scope.building_code, ?landing, "signed in");
    Ok(SignedIn { session, scope, landing })
  }

  /// Re-enter an existing provider session without prompting.
  ///
  /// The building code is not re-checked here.
  pub async fn resume(&self) -> Result<Option<SignedIn>> {
    let Some(session) = self.identity.current_session().await? else {
      return Ok(None);
    };
    let scope = self.resolve_building(&session).await?;
    let landing = Landing::for_profile(&scope.profile);
    info!(uid = %session.uid, ?landing, "resumed session");
    Ok(Some(SignedIn { session, scope, landing }))
  }

  /// The provider's current session, or [`Error::NotSignedIn`].
  pub async fn current_session(&self) -> Result<Session> {
    self.identity.current_session().await?.ok_or(Error::NotSignedIn)
  }

  pub async fn sign_out(&self) -> Result<()> {
    self.identity.sign_out().await?;
    info!("signed out");
    Ok(())
  }

  pub async fn send_password_reset(&self, email: &str) -> Result<()> {
    let email = required(Field::Email, email)?;
    self.identity.send_password_reset(email).await?;
    info!(email, "password reset requested");
    Ok(())
  }
}
