//! Building notifications: append-only announcements scoped to one building.

use serde::Serialize;
use serde_json::Value;

use crate::{
  Result,
  schema::{Fields, Schema},
  stamp::Stamp,
};

/// The record at `building_notifications/{code}/{pushId}`. Never updated or
/// deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub publisher_id:     String,
  pub full_name:        String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub apartment_number: Option<String>,
  pub content:          String,
  pub date:             String,
  pub time:             String,
  pub timestamp:        i64,
}

impl Notification {
  pub fn new(
    publisher_id: String,
    full_name: String,
    apartment_number: Option<String>,
    content: String,
    stamp: Stamp,
  ) -> Self {
    Self {
      publisher_id,
      full_name,
      apartment_number,
      content,
      date: stamp.date,
      time: stamp.time,
      timestamp: stamp.timestamp,
    }
  }
}

impl Schema for Notification {
  const ENTITY: &'static str = "Notification";

  fn decode(value: &Value) -> Result<Self> {
    let f = Fields::of(Self::ENTITY, value)?;
    Ok(Self {
      publisher_id:     f.required_str("publisherId")?,
      full_name:        f.required_str("fullName")?,
      apartment_number: f.optional_str("apartmentNumber")?,
      content:          f.required_str("content")?,
      date:             f.required_str("date")?,
      time:             f.required_str("time")?,
      timestamp:        f.required_i64("timestamp")?,
    })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn decodes_the_wire_shape() {
    let value = json!({
      "publisherId": "u1",
      "fullName": "Building Manager",
      "content": "Water off Tuesday",
      "date": "01/01/2025",
      "time": "09:00",
      "timestamp": 1_735_722_000_000i64,
    });

    let n = Notification::decode(&value).unwrap();
    assert_eq!(n.apartment_number, None);
    assert_eq!(n.content, "Water off Tuesday");
    assert_eq!(n.encode().unwrap(), value);
  }

  #[test]
  fn string_timestamp_is_rejected() {
    let value = json!({
      "publisherId": "u1", "fullName": "M", "content": "C",
      "date": "01/01/2025", "time": "09:00", "timestamp": "soon",
    });
    assert!(Notification::decode(&value).is_err());
  }
}
