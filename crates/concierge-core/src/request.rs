//! Help requests. Each has one state transition: open, then closed (or
//! withdrawn by deleting it).

use serde::Serialize;
use serde_json::Value;

use crate::{
  Result,
  schema::{Fields, Schema},
  stamp::Stamp,
};

/// Placeholder name when neither the form nor the profile supplies one.
pub const ANONYMOUS: &str = "Anonymous";

/// Field names used by queries and partial updates.
pub mod fields {
  pub const IS_OPEN: &str = "isOpen";
  pub const TIMESTAMP: &str = "timestamp";
  pub const PUBLISHER_ID: &str = "publisherId";
}

/// The record at `help_requests/{code}/{pushId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
  pub content:          String,
  pub full_name:        String,
  /// Always written; empty when unknown.
  pub apartment_number: String,
  pub date:             String,
  pub time:             String,
  pub timestamp:        i64,
  pub is_open:          bool,
  pub publisher_id:     String,
  pub building_code:    String,
  /// Push token of the submitting device, when one could be obtained.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub device_token:     Option<String>,
}

impl HelpRequest {
  /// A freshly submitted, open request.
  pub fn open(
    content: String,
    full_name: String,
    apartment_number: String,
    publisher_id: String,
    building_code: String,
    stamp: Stamp,
  ) -> Self {
    Self {
      content,
      full_name,
      apartment_number,
      date: stamp.date,
      time: stamp.time,
      timestamp: stamp.timestamp,
      is_open: true,
      publisher_id,
      building_code,
      device_token: None,
    }
  }

  pub fn is_owned_by(&self, uid: &str) -> bool { self.publisher_id == uid }
}

impl Schema for HelpRequest {
  const ENTITY: &'static str = "HelpRequest";

  fn decode(value: &Value) -> Result<Self> {
    let f = Fields::of(Self::ENTITY, value)?;
    Ok(Self {
      content:          f.required_str("content")?,
      full_name:        f.required_str("fullName")?,
      apartment_number: f.required_str("apartmentNumber")?,
      date:             f.required_str("date")?,
      time:             f.required_str("time")?,
      timestamp:        f.required_i64(fields::TIMESTAMP)?,
      is_open:          f.required_bool(fields::IS_OPEN)?,
      publisher_id:     f.required_str(fields::PUBLISHER_ID)?,
      building_code:    f.required_str("buildingCode")?,
      device_token:     f.optional_str("deviceToken")?,
    })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn stamp() -> Stamp {
    Stamp { date: "01/01/2025".into(), time: "09:00".into(), timestamp: 7 }
  }

  #[test]
  fn new_requests_are_open() {
    let r = HelpRequest::open("Leak".into(), "A".into(), "4".into(), "u1".into(), "B1".into(), stamp());
    assert!(r.is_open);
    assert!(r.is_owned_by("u1"));
    assert!(!r.is_owned_by("u2"));
  }

  #[test]
  fn encodes_is_open_and_omits_missing_token() {
    let r = HelpRequest::open("Leak".into(), "A".into(), "".into(), "u1".into(), "B1".into(), stamp());
    let value = r.encode().unwrap();
    assert_eq!(value["isOpen"], json!(true));
    assert_eq!(value["buildingCode"], json!("B1"));
    assert!(value.get("deviceToken").is_none());
    assert_eq!(HelpRequest::decode(&value).unwrap(), r);
  }

  #[test]
  fn open_flag_is_required() {
    let value = json!({
      "content": "Leak", "fullName": "A", "apartmentNumber": "4",
      "date": "01/01/2025", "time": "09:00", "timestamp": 1,
      "publisherId": "u1", "buildingCode": "B1",
    });
    assert!(HelpRequest::decode(&value).is_err());
  }

  #[test]
  fn apartment_number_must_be_present() {
    let value = json!({
      "content": "Leak", "fullName": "A",
      "date": "01/01/2025", "time": "09:00", "timestamp": 1,
      "isOpen": true, "publisherId": "u1", "buildingCode": "B1",
    });
    assert!(matches!(
      HelpRequest::decode(&value),
      Err(crate::Error::SchemaViolation { field, .. }) if field == "apartmentNumber"
    ));

    let mut blank = value;
    blank["apartmentNumber"] = json!("");
    assert_eq!(HelpRequest::decode(&blank).unwrap().apartment_number, "");
  }
}
