//! Account creation, gated on the building code existing.

use concierge_core::{
  path::StorePath,
  profile::UserProfile,
  schema::Schema,
  session::{IdentityProvider, MIN_PASSWORD_LEN, Session, check_email},
  store::DocumentStore,
};
use tracing::{info, warn};

use crate::{
  Concierge, Error, Field, Result,
  error::required,
};

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
  pub email:            String,
  pub password:         String,
  pub full_name:        String,
  pub building_code:    String,
  pub apartment_number: Option<String>,
}

/// The trimmed, checked contents of a [`RegistrationForm`].
struct Validated<'a> {
  email:            &'a str,
  password:         &'a str,
  full_name:        &'a str,
  building_code:    &'a str,
  apartment_number: Option<&'a str>,
}

impl RegistrationForm {
  /// Checks fields in screen order and stops at the first failure. No remote
  /// call is made.
  fn validate(&self) -> Result<Validated<'_>> {
    let email = required(Field::Email, &self.email)?;
    if check_email(email).is_err() {
      return Err(Error::InvalidField { field: Field::Email, reason: "is badly formatted" });
    }

    let password = required(Field::Password, &self.password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
      return Err(Error::InvalidField {
        field:  Field::Password,
        reason: "must be at least 6 characters",
      });
    }

    let full_name = required(Field::FullName, &self.full_name)?;
    let building_code = required(Field::BuildingCode, &self.building_code)?;
    let apartment_number =
      self.apartment_number.as_deref().map(str::trim).filter(|a| !a.is_empty());

    Ok(Validated { email, password, full_name, building_code, apartment_number })
  }
}

impl<S, I> Concierge<S, I>
where
  S: DocumentStore + 'static,
  I: IdentityProvider,
{
  /// Create an account and its profile.
  ///
  /// The building lookup strictly precedes identity creation, which strictly
  /// precedes the profile write, so an unknown building never yields an
  /// identity or a profile. A failed profile write is not rolled back: the
  /// identity exists without a profile and later resolution reports
  /// [`Error::ProfileNotFound`].
  pub async fn register(&self, form: &RegistrationForm) -> Result<Session> {
    let form = form.validate()?;

    let Ok(building) = StorePath::building(form.building_code) else {
      warn!(building = form.building_code, "malformed building code");
      return Err(Error::InvalidBuildingCode(form.building_code.to_owned()));
    };
    let exists = self.store.get(&building).await.map_err(Error::store)?.is_some();
    if !exists {
      warn!(building = form.building_code, "registration for unknown building");
      return Err(Error::InvalidBuildingCode(form.building_code.to_owned()));
    }

    let session = self.identity.create_account(form.email, form.password).await?;

    let profile = UserProfile {
      full_name:        form.full_name.to_owned(),
      building_code:    Some(form.building_code.to_owned()),
      email:            form.email.to_owned(),
      is_manager:       false,
      apartment_number: form.apartment_number.map(str::to_owned),
    };
    let path = StorePath::user(&session.uid)?;
    if let Err(e) = self.store.set(&path, profile.encode()?).await {
      warn!(uid = %session.uid, error = %e, "identity created but profile write failed");
      return Err(Error::store(e));
    }

    info!(uid = %session.uid, building = form.building_code, "registered");
    Ok(session)
  }
}
