//! Who may do what inside a building partition.
//!
//! [`evaluate`] is the single decision point. The client consults it both to
//! decide which controls to offer and again before every mutation;
//! [`server_rules`] renders the same checks as a declarative rule set for the
//! hosted store, which is where they must ultimately be enforced.

use serde_json::{Value, json};

use crate::request::HelpRequest;

/// The acting user, as resolved from their profile.
#[derive(Debug, Clone, Copy)]
pub struct Principal<'a> {
  pub uid:           &'a str,
  pub is_manager:    bool,
  pub building_code: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
  /// Read any record in a building partition.
  ReadPartition { building_code: &'a str },
  /// Append to `building_notifications/{code}`.
  PublishNotification { building_code: &'a str },
  /// Flip a request's `isOpen` to `false`.
  CloseRequest { request: &'a HelpRequest },
  /// Delete an open request outright.
  CancelRequest { request: &'a HelpRequest },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Deny(&'static str),
}

impl Decision {
  pub fn is_allowed(self) -> bool { matches!(self, Self::Allow) }
}

pub fn evaluate(principal: &Principal<'_>, action: &Action<'_>) -> Decision {
  let same_building = |code: &str| principal.building_code == code;

  match action {
    Action::ReadPartition { building_code } => {
      if same_building(*building_code) {
        Decision::Allow
      } else {
        Decision::Deny("partition belongs to another building")
      }
    }
    Action::PublishNotification { building_code } => {
      if !same_building(*building_code) {
        Decision::Deny("partition belongs to another building")
      } else if !principal.is_manager {
        Decision::Deny("only a building manager may publish notifications")
      } else {
        Decision::Allow
      }
    }
    Action::CloseRequest { request } => {
      if !same_building(request.building_code.as_str()) {
        Decision::Deny("request belongs to another building")
      } else if principal.is_manager || request.is_owned_by(principal.uid) {
        Decision::Allow
      } else {
        Decision::Deny("only the publisher or a manager may close a request")
      }
    }
    Action::CancelRequest { request } => {
      if !same_building(request.building_code.as_str()) {
        Decision::Deny("request belongs to another building")
      } else if !request.is_owned_by(principal.uid) {
        Decision::Deny("only the publisher may cancel a request")
      } else if !request.is_open {
        Decision::Deny("a closed request cannot be cancelled")
      } else {
        Decision::Allow
      }
    }
  }
}

/// The checks of [`evaluate`] expressed in the hosted store's rule language.
pub fn server_rules() -> Value {
  let member = "auth != null && root.child('users').child(auth.uid).child('buildingCode').val() === $code";
  let manager = "root.child('users').child(auth.uid).child('isManager').val() === true";

  json!({
    "rules": {
      "users": {
        "$uid": {
          ".read": "auth != null && auth.uid === $uid",
          ".write": "auth != null && auth.uid === $uid",
          "buildingCode": { ".validate": "!data.exists() || newData.val() === data.val()" },
          "isManager": { ".validate": "(!data.exists() && newData.val() === false) || newData.val() === data.val()" }
        }
      },
      "buildings": {
        "$code": { ".read": "auth != null", ".write": false }
      },
      "building_notifications": {
        "$code": {
          ".read": member,
          ".indexOn": ["timestamp"],
          "$id": {
            ".write": format!("{member} && {manager} && !data.exists()"),
            ".validate": "newData.child('publisherId').val() === auth.uid"
          }
        }
      },
      "help_requests": {
        "$code": {
          ".read": member,
          ".indexOn": ["timestamp", "isOpen", "publisherId"],
          "$id": {
            ".write": format!(
              "{member} && ((!data.exists() && newData.child('publisherId').val() === auth.uid && newData.child('isOpen').val() === true) \
               || (data.exists() && !newData.exists() && data.child('publisherId').val() === auth.uid && data.child('isOpen').val() === true) \
               || (data.exists() && newData.exists() && (data.child('publisherId').val() === auth.uid || {manager})))"
            ),
            "isOpen": { ".validate": "!data.exists() || data.val() === true || newData.val() === false" }
          }
        }
      },
      "complaints": {
        "$code": {
          ".read": format!("{member} && {manager}"),
          "$id": { ".write": format!("{member} && !data.exists()") }
        }
      }
    }
  })
}
