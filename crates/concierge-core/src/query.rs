//! Child queries over a single partition.
//!
//! The hosted store can only filter on one field at a time; here every
//! equality clause is honoured and the ordering field is independent of the
//! filters. Backends fetch the children of a path and hand them to
//! [`Query::apply`], so filtering and ordering behave the same everywhere.

use std::cmp::Ordering;

use serde_json::Value;

// ─── Child ───────────────────────────────────────────────────────────────────

/// A direct child of a queried path: its key and raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Child {
  pub key:   String,
  pub value: Value,
}

// ─── Query ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
  #[default]
  Ascending,
  Descending,
}

/// Parameters for [`crate::store::DocumentStore::query`].
#[derive(Debug, Clone, Default)]
pub struct Query {
  /// Every clause must match (`child(field) == value`).
  pub equals:    Vec<(String, Value)>,
  /// Child field to order by; `None` orders by key.
  pub order_by:  Option<String>,
  pub direction: Direction,
  pub limit:     Option<usize>,
}

impl Query {
  pub fn new() -> Self { Self::default() }

  pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.equals.push((field.into(), value.into()));
    self
  }

  pub fn order_by(mut self, field: impl Into<String>) -> Self {
    self.order_by = Some(field.into());
    self
  }

  pub fn descending(mut self) -> Self {
    self.direction = Direction::Descending;
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Whether `value` satisfies every equality clause.
  pub fn matches(&self, value: &Value) -> bool {
    self
      .equals
      .iter()
      .all(|(field, expected)| value.get(field).is_some_and(|v| values_equal(v, expected)))
  }

  /// Filter, then sort, then truncate.
  pub fn apply(&self, children: Vec<Child>) -> Vec<Child> {
    let mut hits: Vec<Child> =
      children.into_iter().filter(|c| self.matches(&c.value)).collect();

    match &self.order_by {
      Some(field) => hits.sort_by(|a, b| {
        compare_values(a.value.get(field), b.value.get(field))
          .then_with(|| a.key.cmp(&b.key))
      }),
      None => hits.sort_by(|a, b| a.key.cmp(&b.key)),
    }

    if self.direction == Direction::Descending {
      hits.reverse();
    }
    if let Some(limit) = self.limit {
      hits.truncate(limit);
    }
    hits
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Type rank used by the hosted store: missing, false, true, numbers,
/// strings, then objects.
fn rank(value: Option<&Value>) -> u8 {
  match value {
    None | Some(Value::Null) => 0,
    Some(Value::Bool(false)) => 1,
    Some(Value::Bool(true)) => 2,
    Some(Value::Number(_)) => 3,
    Some(Value::String(_)) => 4,
    Some(Value::Array(_) | Value::Object(_)) => 5,
  }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
    (Some(Value::Number(x)), Some(Value::Number(y))) => {
      let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
      x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
    (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
    _ => Ordering::Equal,
  })
}

/// Numbers compare by value, so `1` matches `1.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
      (Some(x), Some(y)) => x == y,
      _ => x.as_f64() == y.as_f64(),
    },
    _ => a == b,
  }
}
