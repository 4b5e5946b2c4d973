//! Paths into the document tree and the keys that name its records.
//!
//! Every segment is validated on construction, so a building code or uid that
//! would escape its partition (e.g. `"B1/../B2"`) never reaches a store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Roots ───────────────────────────────────────────────────────────────────

pub const USERS: &str = "users";
pub const BUILDINGS: &str = "buildings";
pub const BUILDING_NOTIFICATIONS: &str = "building_notifications";
pub const HELP_REQUESTS: &str = "help_requests";
pub const COMPLAINTS: &str = "complaints";

/// Characters the hosted store refuses inside a key.
const FORBIDDEN: &[char] = &['/', '.', '#', '$', '[', ']'];

fn check_segment(segment: &str) -> Result<()> {
  let invalid = |reason| Error::InvalidPath { path: segment.to_owned(), reason };

  if segment.is_empty() {
    return Err(invalid("empty segment"));
  }
  if segment.contains(FORBIDDEN) {
    return Err(invalid("segment contains one of / . # $ [ ]"));
  }
  if segment.chars().any(char::is_control) {
    return Err(invalid("segment contains a control character"));
  }
  Ok(())
}

// ─── StorePath ───────────────────────────────────────────────────────────────

/// An absolute, slash-separated location in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
  segments: Vec<String>,
}

impl StorePath {
  /// A single-segment path such as `users`.
  pub fn root(segment: &str) -> Result<Self> {
    check_segment(segment)?;
    Ok(Self { segments: vec![segment.to_owned()] })
  }

  /// Parse `a/b/c`; leading and trailing slashes are ignored.
  pub fn parse(raw: &str) -> Result<Self> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
      return Err(Error::InvalidPath { path: raw.to_owned(), reason: "empty path" });
    }
    let segments = trimmed
      .split('/')
      .map(|s| check_segment(s).map(|()| s.to_owned()))
      .collect::<Result<Vec<_>>>()?;
    Ok(Self { segments })
  }

  pub fn child(&self, segment: impl AsRef<str>) -> Result<Self> {
    let segment = segment.as_ref();
    check_segment(segment)?;
    let mut segments = self.segments.clone();
    segments.push(segment.to_owned());
    Ok(Self { segments })
  }

  pub fn parent(&self) -> Option<Self> {
    (self.segments.len() > 1).then(|| Self {
      segments: self.segments[..self.segments.len() - 1].to_vec(),
    })
  }

  /// The last segment.
  pub fn key(&self) -> &str {
    self.segments.last().map(String::as_str).unwrap_or_default()
  }

  pub fn segments(&self) -> &[String] { &self.segments }

  /// `true` if `self` equals `ancestor` or lies somewhere beneath it.
  pub fn is_within(&self, ancestor: &StorePath) -> bool {
    self.segments.starts_with(&ancestor.segments)
  }

  // ── Well-known locations ──────────────────────────────────────────────

  /// `users/{uid}`
  pub fn user(uid: &str) -> Result<Self> { Self::root(USERS)?.child(uid) }

  /// `buildings/{code}`
  pub fn building(code: &str) -> Result<Self> {
    Self::root(BUILDINGS)?.child(code)
  }

  /// `building_notifications/{code}`
  pub fn notifications(code: &str) -> Result<Self> {
    Self::root(BUILDING_NOTIFICATIONS)?.child(code)
  }

  /// `help_requests/{code}`
  pub fn help_requests(code: &str) -> Result<Self> {
    Self::root(HELP_REQUESTS)?.child(code)
  }

  /// `complaints/{code}`
  pub fn complaints(code: &str) -> Result<Self> {
    Self::root(COMPLAINTS)?.child(code)
  }
}

impl fmt::Display for StorePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.segments.join("/"))
  }
}

// ─── PushId ──────────────────────────────────────────────────────────────────

/// The key under which a pushed record lives. It is the record's only external
/// identifier, so list views carry it alongside the decoded record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PushId(String);

impl PushId {
  /// Accept any string that is a valid path segment.
  pub fn parse(raw: impl Into<String>) -> Result<Self> {
    let raw = raw.into();
    check_segment(&raw)?;
    Ok(Self(raw))
  }

  pub(crate) fn from_generated(raw: String) -> Self { Self(raw) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for PushId {
  type Error = Error;

  fn try_from(raw: String) -> Result<Self> { Self::parse(raw) }
}

impl From<PushId> for String {
  fn from(id: PushId) -> Self { id.0 }
}

impl AsRef<str> for PushId {
  fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for PushId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}
