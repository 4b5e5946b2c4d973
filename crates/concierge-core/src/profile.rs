//! User profiles and the building existence marker.

use serde::Serialize;
use serde_json::Value;

use crate::{
  Result,
  schema::{Fields, Schema},
};

/// The record at `users/{uid}`.
///
/// `building_code` is the only link between a user and their building's data.
/// It is written once at registration; nothing updates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub full_name:        String,
  /// Optional at the schema level so that a profile without one decodes and
  /// can be reported as missing its building, rather than as corrupt.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub building_code:    Option<String>,
  pub email:            String,
  pub is_manager:       bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub apartment_number: Option<String>,
}

impl Schema for UserProfile {
  const ENTITY: &'static str = "UserProfile";

  fn decode(value: &Value) -> Result<Self> {
    let f = Fields::of(Self::ENTITY, value)?;
    Ok(Self {
      full_name:        f.required_str("fullName")?,
      building_code:    f.optional_str("buildingCode")?,
      email:            f.required_str("email")?,
      is_manager:       f.optional_bool("isManager")?.unwrap_or(false),
      apartment_number: f.optional_str("apartmentNumber")?,
    })
  }
}

/// Field names written by partial profile updates.
pub mod fields {
  pub const FULL_NAME: &str = "fullName";
  pub const IS_MANAGER: &str = "isManager";
}

/// The value stored at `buildings/{code}`. Only its existence is consulted.
pub fn building_marker() -> Value { Value::Bool(true) }
