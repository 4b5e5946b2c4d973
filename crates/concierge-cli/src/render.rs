//! Plain-text rendering of client results.

use concierge_client::{BuildingScope, Landing, RequestView};
use concierge_core::{notification::Notification, schema::Entry};

pub fn landing(scope: &BuildingScope, landing: Landing) {
  let role = match landing {
    Landing::Manager => "manager",
    Landing::Resident => "resident",
  };
  println!("signed in as {} ({role}) in building {}", scope.profile.full_name, scope.building_code);
}

pub fn notifications(entries: &[Entry<Notification>]) {
  if entries.is_empty() {
    println!("no notifications");
    return;
  }
  for Entry { key, record: n } in entries {
    let apartment = n.apartment_number.as_deref().map(|a| format!(", apt {a}")).unwrap_or_default();
    println!("{} {}  {}{apartment}  [{key}]", n.date, n.time, n.full_name);
    println!("    {}", n.content);
  }
}

pub fn requests(views: &[RequestView]) {
  if views.is_empty() {
    println!("no help requests");
    return;
  }
  for view in views {
    let r = &view.request;
    let state = if r.is_open { "open" } else { "closed" };
    let mut actions = Vec::new();
    if view.can_close {
      actions.push("close");
    }
    if view.can_cancel {
      actions.push("cancel");
    }
    let actions = if actions.is_empty() { String::new() } else { format!("  ({})", actions.join(", ")) };
    let apartment = if r.apartment_number.is_empty() { String::new() } else { format!(", apt {}", r.apartment_number) };

    println!(
      "{} {}  {}{apartment}  {state}  [{}] ts={}{actions}",
      r.date, r.time, r.full_name, view.key, r.timestamp
    );
    println!("    {}", r.content);
  }
}
