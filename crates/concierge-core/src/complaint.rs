//! Complaints filed with the building committee.

use serde::Serialize;
use serde_json::Value;

use crate::{
  Result,
  schema::{Fields, Schema},
};

/// The record at `complaints/{code}/{pushId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
  pub subject:      String,
  pub description:  String,
  pub publisher_id: String,
  pub timestamp:    i64,
}

impl Schema for Complaint {
  const ENTITY: &'static str = "Complaint";

  fn decode(value: &Value) -> Result<Self> {
    let f = Fields::of(Self::ENTITY, value)?;
    Ok(Self {
      subject:      f.required_str("subject")?,
      description:  f.required_str("description")?,
      publisher_id: f.required_str("publisherId")?,
      timestamp:    f.required_i64("timestamp")?,
    })
  }
}
