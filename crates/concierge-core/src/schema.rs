//! Explicit decoders from untyped documents to typed records.
//!
//! Records are encoded with serde (camelCase keys) but decoded by hand, field
//! by field, so that a missing or mistyped field surfaces as
//! [`Error::SchemaViolation`] instead of a silently defaulted value.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Error, Result, path::PushId, query::Child};

/// A record with a fixed document shape.
pub trait Schema: Serialize + Sized {
  /// Entity name used in error messages.
  const ENTITY: &'static str;

  fn decode(value: &Value) -> Result<Self>;

  fn encode(&self) -> Result<Value> { Ok(serde_json::to_value(self)?) }
}

// ─── Field reader ────────────────────────────────────────────────────────────

/// Typed accessors over the fields of one document.
pub struct Fields<'a> {
  entity: &'static str,
  map:    &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
  pub fn of(entity: &'static str, value: &'a Value) -> Result<Self> {
    match value {
      Value::Object(map) => Ok(Self { entity, map }),
      other => Err(violation(entity, "<root>", format!("expected an object, found {}", kind(other)))),
    }
  }

  fn present(&self, field: &str) -> Option<&'a Value> {
    self.map.get(field).filter(|v| !v.is_null())
  }

  fn missing(&self, field: &str) -> Error { violation(self.entity, field, "required field is missing") }

  fn mistyped(&self, field: &str, expected: &str, found: &Value) -> Error {
    violation(self.entity, field, format!("expected {expected}, found {}", kind(found)))
  }

  pub fn optional_str(&self, field: &str) -> Result<Option<String>> {
    match self.present(field) {
      None => Ok(None),
      Some(Value::String(s)) => Ok(Some(s.clone())),
      Some(other) => Err(self.mistyped(field, "a string", other)),
    }
  }

  pub fn required_str(&self, field: &str) -> Result<String> {
    self.optional_str(field)?.ok_or_else(|| self.missing(field))
  }

  pub fn optional_bool(&self, field: &str) -> Result<Option<bool>> {
    match self.present(field) {
      None => Ok(None),
      Some(Value::Bool(b)) => Ok(Some(*b)),
      Some(other) => Err(self.mistyped(field, "a boolean", other)),
    }
  }

  pub fn required_bool(&self, field: &str) -> Result<bool> {
    self.optional_bool(field)?.ok_or_else(|| self.missing(field))
  }

  pub fn required_i64(&self, field: &str) -> Result<i64> {
    match self.present(field) {
      None => Err(self.missing(field)),
      Some(Value::Number(n)) => n
        .as_i64()
        .ok_or_else(|| violation(self.entity, field, format!("expected an integer, found {n}"))),
      Some(other) => Err(self.mistyped(field, "an integer", other)),
    }
  }
}

fn violation(entity: &'static str, field: &str, reason: impl Into<String>) -> Error {
  Error::SchemaViolation { entity, field: field.to_owned(), reason: reason.into() }
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

/// A decoded record together with the key it lives under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry<T> {
  pub key:    PushId,
  pub record: T,
}

impl<T: Schema> Entry<T> {
  pub fn decode(child: &Child) -> Result<Self> {
    Ok(Self { key: PushId::parse(child.key.clone())?, record: T::decode(&child.value)? })
  }
}
