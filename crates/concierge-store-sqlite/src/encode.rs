//! Conversions between store paths, SQL rows and JSON document values.

use concierge_core::path::StorePath;
use serde_json::{Map, Value};

use crate::Result;

/// `(path, parent, key)` columns for a document row.
pub fn path_columns(path: &StorePath) -> (String, String, String) {
  let parent = path.parent().map(|p| p.to_string()).unwrap_or_default();
  (path.to_string(), parent, path.key().to_owned())
}

pub fn decode_value(raw: &str) -> Result<Value> { Ok(serde_json::from_str(raw)?) }

pub fn encode_value(value: &Value) -> String { value.to_string() }

/// Apply `fields` to the top level of the stored document `own`. A `null`
/// removes the field; any other value replaces it whole, nested objects
/// included. A missing or non-object document starts out empty.
pub fn merge_top_level(
  own: Option<&str>,
  fields: Map<String, Value>,
) -> serde_json::Result<String> {
  let mut map = match own.map(serde_json::from_str::<Value>).transpose()? {
    Some(Value::Object(map)) => map,
    _ => Map::new(),
  };
  for (name, value) in fields {
    if value.is_null() {
      map.remove(&name);
    } else {
      map.insert(name, value);
    }
  }
  Ok(encode_value(&Value::Object(map)))
}

/// Rebuild the value at `base` from its own row (if any) and the rows of its
/// descendants, nesting each descendant by its path relative to `base`.
pub fn assemble(
  base: &StorePath,
  own: Option<String>,
  descendants: Vec<(String, String)>,
) -> Result<Option<Value>> {
  let mut value = own.as_deref().map(decode_value).transpose()?;

  for (path, raw) in descendants {
    let relative: Vec<&str> =
      path.split('/').skip(base.segments().len()).collect();
    if relative.is_empty() {
      continue;
    }
    let root = value.get_or_insert_with(|| Value::Object(Map::new()));
    if !root.is_object() {
      *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
      insert_nested(map, &relative, decode_value(&raw)?);
    }
  }

  Ok(value)
}

fn insert_nested(map: &mut Map<String, Value>, relative: &[&str], value: Value) {
  match relative {
    [] => {}
    [last] => {
      map.insert((*last).to_owned(), value);
    }
    [head, rest @ ..] => {
      let entry = map
        .entry((*head).to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
      if !entry.is_object() {
        *entry = Value::Object(Map::new());
      }
      if let Value::Object(inner) = entry {
        insert_nested(inner, rest, value);
      }
    }
  }
}
