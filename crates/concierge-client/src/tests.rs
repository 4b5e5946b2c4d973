//! End-to-end tests of the client against an in-memory SQLite backend.

use concierge_core::{
  notification::Notification,
  path::{PushId, StorePath},
  profile::{UserProfile, building_marker, fields as profile_fields},
  query::{Child, Query},
  schema::Schema,
  session::{AuthError, IdentityProvider},
  store::DocumentStore,
};
use concierge_store_sqlite::{SqliteIdentity, SqliteStore};
use serde_json::{Map, Value, json};
use tokio::sync::broadcast;

use crate::{
  Concierge, Error, Field, HelpRequestForm, Landing, LoginForm, Order, RegistrationForm, Session,
};

type Client = Concierge<SqliteStore, SqliteIdentity>;

async fn client() -> Client {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  for code in ["B1", "B2"] {
    store
      .set(&StorePath::building(code).unwrap(), building_marker())
      .await
      .unwrap();
  }
  let identity = store.identity();
  Concierge::new(store, identity)
}

fn form(email: &str, building: &str) -> RegistrationForm {
  RegistrationForm {
    email:            email.into(),
    password:         "secret1".into(),
    full_name:        format!("Resident {email}"),
    building_code:    building.into(),
    apartment_number: Some("4".into()),
  }
}

async fn resident(c: &Client, email: &str, building: &str) -> Session {
  c.register(&form(email, building)).await.unwrap()
}

async fn manager(c: &Client, email: &str, building: &str) -> Session {
  let session = resident(c, email, building).await;
  let mut patch = Map::new();
  patch.insert(profile_fields::IS_MANAGER.into(), Value::Bool(true));
  c.store()
    .update(&StorePath::user(&session.uid).unwrap(), patch)
    .await
    .unwrap();
  session
}

fn leak() -> HelpRequestForm {
  HelpRequestForm { content: "Leak in hallway".into(), ..Default::default() }
}

// ─── Registration ────────────────────────────────────────────────────────────

#[tokio::test]
async fn registration_writes_a_resident_profile() {
  let c = client().await;
  let session = resident(&c, "dana@example.com", "B1").await;

  let profile = c.profile(&session).await.unwrap();
  assert_eq!(profile.building_code.as_deref(), Some("B1"));
  assert_eq!(profile.apartment_number.as_deref(), Some("4"));
  assert!(!profile.is_manager);
}

#[tokio::test]
async fn unknown_building_creates_neither_identity_nor_profile() {
  let c = client().await;
  let err = c.register(&form("noa@example.com", "B3")).await.unwrap_err();
  assert!(matches!(err, Error::InvalidBuildingCode(code) if code == "B3"));

  let sign_in = c.identity().sign_in("noa@example.com", "secret1").await;
  assert_eq!(sign_in.unwrap_err(), AuthError::UserNotFound);
  assert_eq!(c.store().get(&StorePath::parse("users").unwrap()).await.unwrap(), None);
}

#[tokio::test]
async fn registration_validates_fields_in_order() {
  let c = client().await;

  let mut f = form("", "");
  f.password = "123".into();
  assert!(matches!(
    c.register(&f).await,
    Err(Error::InvalidField { field: Field::Email, .. })
  ));

  f.email = "dana@example.com".into();
  assert!(matches!(
    c.register(&f).await,
    Err(Error::InvalidField { field: Field::Password, .. })
  ));

  f.password = "secret1".into();
  assert!(matches!(
    c.register(&f).await,
    Err(Error::InvalidField { field: Field::BuildingCode, .. })
  ));
}

#[tokio::test]
async fn duplicate_email_surfaces_the_identity_error() {
  let c = client().await;
  resident(&c, "dana@example.com", "B1").await;
  let err = c.register(&form("dana@example.com", "B2")).await.unwrap_err();
  assert!(matches!(err, Error::Auth(AuthError::EmailAlreadyInUse)));
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_routes_by_role() {
  let c = client().await;
  resident(&c, "dana@example.com", "B1").await;
  manager(&c, "boss@example.com", "B1").await;

  let login = |email: &str| LoginForm {
    email:         email.into(),
    password:      "secret1".into(),
    building_code: "B1".into(),
  };

  assert_eq!(c.login(&login("dana@example.com")).await.unwrap().landing, Landing::Resident);
  assert_eq!(c.login(&login("boss@example.com")).await.unwrap().landing, Landing::Manager);
}

#[tokio::test]
async fn building_mismatch_leaves_a_live_session() {
  let c = client().await;
  let session = resident(&c, "dana@example.com", "B1").await;
  c.sign_out().await.unwrap();

  let err = c
    .login(&LoginForm {
      email:         "dana@example.com".into(),
      password:      "secret1".into(),
      building_code: "WRONG".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BuildingCodeMismatch));
  assert!(!err.ends_flow());

  // Silent re-entry does not look at the building code again.
  let resumed = c.resume().await.unwrap().expect("session survives the mismatch");
  assert_eq!(resumed.session, session);
  assert_eq!(resumed.landing, Landing::Resident);
}

#[tokio::test]
async fn resume_without_a_session_is_none() {
  let c = client().await;
  resident(&c, "dana@example.com", "B1").await;
  c.sign_out().await.unwrap();
  assert!(c.resume().await.unwrap().is_none());
  assert!(matches!(c.current_session().await, Err(Error::NotSignedIn)));
}

#[tokio::test]
async fn password_reset_needs_an_email() {
  let c = client().await;
  resident(&c, "dana@example.com", "B1").await;

  assert!(matches!(
    c.send_password_reset("  ").await,
    Err(Error::InvalidField { field: Field::Email, .. })
  ));
  c.send_password_reset("dana@example.com").await.unwrap();
  assert_eq!(c.identity().reset_requests("dana@example.com").await.unwrap(), 1);
}

// ─── Resolution and profile ──────────────────────────────────────────────────

#[tokio::test]
async fn resolution_fails_closed() {
  let c = client().await;
  let ghost = Session { uid: "ghost".into(), email: "ghost@example.com".into() };
  let err = c.resolve_building(&ghost).await.unwrap_err();
  assert!(matches!(err, Error::ProfileNotFound { .. }));
  assert!(err.ends_flow());

  c.store()
    .set(
      &StorePath::user("ghost").unwrap(),
      json!({ "fullName": "Ghost", "email": "ghost@example.com", "isManager": false }),
    )
    .await
    .unwrap();
  assert!(matches!(
    c.resolve_building(&ghost).await,
    Err(Error::BuildingCodeMissing { .. })
  ));
}

#[tokio::test]
async fn rename_touches_only_the_full_name() {
  let c = client().await;
  let session = resident(&c, "dana@example.com", "B1").await;

  let renamed = c.update_full_name(&session, "  Dana Levi ").await.unwrap();
  assert_eq!(renamed.full_name, "Dana Levi");

  let stored = c.store().get(&StorePath::user(&session.uid).unwrap()).await.unwrap().unwrap();
  let stored = UserProfile::decode(&stored).unwrap();
  assert_eq!(stored, renamed);
  assert_eq!(stored.building_code.as_deref(), Some("B1"));
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn only_managers_publish() {
  let c = client().await;
  let boss = manager(&c, "boss@example.com", "B1").await;
  let dana = resident(&c, "dana@example.com", "B1").await;

  assert!(matches!(
    c.publish_notification(&dana, "Party tonight").await,
    Err(Error::PermissionDenied(_))
  ));
  assert!(matches!(
    c.publish_notification(&boss, "   ").await,
    Err(Error::InvalidField { field: Field::Content, .. })
  ));

  let entry = c.publish_notification(&boss, "Water off Tuesday").await.unwrap();
  assert_eq!(entry.record.publisher_id, boss.uid);
  assert_eq!(entry.record.content, "Water off Tuesday");

  let listed = c.notifications(&dana, Order::NewestFirst).await.unwrap();
  assert_eq!(listed, vec![entry]);
}

#[tokio::test]
async fn notifications_are_scoped_to_the_building() {
  let c = client().await;
  let b1 = manager(&c, "one@example.com", "B1").await;
  let b2 = manager(&c, "two@example.com", "B2").await;

  c.publish_notification(&b1, "For B1").await.unwrap();
  c.publish_notification(&b2, "For B2").await.unwrap();

  let seen: Vec<_> = c
    .notifications(&b1, Order::OldestFirst)
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.record.content)
    .collect();
  assert_eq!(seen, ["For B1"]);
}

#[tokio::test]
async fn notifications_order_by_timestamp() {
  let c = client().await;
  let boss = manager(&c, "boss@example.com", "B1").await;
  for n in ["first", "second", "third"] {
    c.publish_notification(&boss, n).await.unwrap();
  }

  let keys = |entries: Vec<concierge_core::schema::Entry<Notification>>| {
    entries.into_iter().map(|e| e.key).collect::<Vec<_>>()
  };
  let oldest = keys(c.notifications(&boss, Order::OldestFirst).await.unwrap());
  let mut newest = keys(c.notifications(&boss, Order::NewestFirst).await.unwrap());
  newest.reverse();

  assert_eq!(oldest.len(), 3);
  assert_eq!(oldest, newest);
}

#[tokio::test]
async fn stored_notifications_read_back_field_for_field() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;

  let written = json!({
    "publisherId": "m1",
    "fullName": "Building Manager",
    "content": "C",
    "date": "01/01/2025",
    "time": "09:00",
    "timestamp": 1_735_722_000_000i64,
  });
  let path = StorePath::notifications("B1").unwrap().child("-Nfixed").unwrap();
  c.store().set(&path, written.clone()).await.unwrap();

  let listed = c.notifications(&dana, Order::NewestFirst).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].key.as_str(), "-Nfixed");
  assert_eq!(listed[0].record, Notification::decode(&written).unwrap());
  assert_eq!(listed[0].record.encode().unwrap(), written);
}

#[tokio::test]
async fn undecodable_records_are_skipped_not_defaulted() {
  let c = client().await;
  let boss = manager(&c, "boss@example.com", "B1").await;
  c.publish_notification(&boss, "Water off at noon").await.unwrap();
  let path = StorePath::notifications("B1").unwrap().child("-Nbad").unwrap();
  c.store().set(&path, json!({ "content": "no metadata" })).await.unwrap();

  let listed = c.notifications(&boss, Order::NewestFirst).await.unwrap();

  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].record.content, "Water off at noon");
}

#[tokio::test]
async fn notification_feed_redelivers_the_whole_list() {
  let c = client().await;
  let boss = manager(&c, "boss@example.com", "B1").await;
  let mut feed = c.watch_notifications(&boss, Order::OldestFirst).await.unwrap();

  assert!(feed.next().await.unwrap().unwrap().is_empty());

  c.publish_notification(&boss, "first").await.unwrap();
  assert_eq!(feed.next().await.unwrap().unwrap().len(), 1);

  c.publish_notification(&boss, "second").await.unwrap();
  let contents: Vec<_> =
    feed.next().await.unwrap().unwrap().into_iter().map(|e| e.record.content).collect();
  assert_eq!(contents, ["first", "second"]);
}

// ─── Help requests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_content_is_rejected_before_any_write() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;

  let blank = HelpRequestForm { content: " ".into(), ..Default::default() };
  assert!(matches!(
    c.submit_request(&dana, &blank).await,
    Err(Error::InvalidField { field: Field::Content, .. })
  ));
  assert_eq!(c.store().get(&StorePath::help_requests("B1").unwrap()).await.unwrap(), None);

  let entry = c.submit_request(&dana, &leak()).await.unwrap();
  assert!(entry.record.is_open);
  assert_eq!(entry.record.building_code, "B1");
  assert_eq!(entry.record.publisher_id, dana.uid);

  let open = c.open_requests(&dana).await.unwrap();
  assert_eq!(open.len(), 1);
  assert_eq!(open[0].key, entry.key);
}

#[tokio::test]
async fn attribution_prefers_form_then_profile_then_placeholder() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;

  let from_profile = c.submit_request(&dana, &leak()).await.unwrap().record;
  assert_eq!(from_profile.full_name, "Resident dana@example.com");
  assert_eq!(from_profile.apartment_number, "4");

  let explicit = HelpRequestForm {
    full_name: Some("Dana L.".into()),
    apartment_number: Some("12".into()),
    device_token: Some("tok".into()),
    ..leak()
  };
  let from_form = c.submit_request(&dana, &explicit).await.unwrap().record;
  assert_eq!(from_form.full_name, "Dana L.");
  assert_eq!(from_form.apartment_number, "12");
  assert_eq!(from_form.device_token.as_deref(), Some("tok"));

  let mut patch = Map::new();
  patch.insert("fullName".into(), json!(" "));
  patch.insert("apartmentNumber".into(), Value::Null);
  c.store().update(&StorePath::user(&dana.uid).unwrap(), patch).await.unwrap();

  let anonymous = c.submit_request(&dana, &leak()).await.unwrap().record;
  assert_eq!(anonymous.full_name, "Anonymous");
  assert_eq!(anonymous.apartment_number, "");
}

#[tokio::test]
async fn manager_closes_someone_elses_request() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;
  let noa = resident(&c, "noa@example.com", "B1").await;
  let boss = manager(&c, "boss@example.com", "B1").await;

  let entry = c.submit_request(&dana, &leak()).await.unwrap();

  let as_noa = c.open_requests(&noa).await.unwrap();
  assert!(!as_noa[0].can_close);
  assert!(!as_noa[0].can_cancel);
  assert!(matches!(
    c.close_request(&noa, &entry.key).await,
    Err(Error::PermissionDenied(_))
  ));

  let as_boss = c.open_requests(&boss).await.unwrap();
  assert!(as_boss[0].can_close);
  c.close_request(&boss, &entry.key).await.unwrap();

  assert!(c.open_requests(&boss).await.unwrap().is_empty());
  let all = c.all_requests(&boss).await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(!all[0].request.is_open);
  assert!(!all[0].can_close);
}

#[tokio::test]
async fn closing_twice_never_reopens() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;
  let entry = c.submit_request(&dana, &leak()).await.unwrap();

  c.close_request(&dana, &entry.key).await.unwrap();
  c.close_request(&dana, &entry.key).await.unwrap();

  let mine = c.my_requests(&dana).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert!(!mine[0].request.is_open);
  assert_eq!(mine[0].request.content, "Leak in hallway");
}

#[tokio::test]
async fn open_list_tracks_the_flag() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;
  let a = c.submit_request(&dana, &leak()).await.unwrap();
  let b = c.submit_request(&dana, &leak()).await.unwrap();
  let d = c.submit_request(&dana, &leak()).await.unwrap();

  c.close_request(&dana, &b.key).await.unwrap();

  let open: Vec<_> = c.open_requests(&dana).await.unwrap().into_iter().map(|v| v.key).collect();
  assert_eq!(open.len(), 2);
  assert!(open.contains(&a.key) && open.contains(&d.key));
  assert!(!open.contains(&b.key));
}

#[tokio::test]
async fn requests_in_another_building_are_invisible() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;
  let boss = manager(&c, "boss@example.com", "B2").await;
  let entry = c.submit_request(&dana, &leak()).await.unwrap();

  assert!(c.all_requests(&boss).await.unwrap().is_empty());
  assert!(matches!(
    c.close_request(&boss, &entry.key).await,
    Err(Error::RequestNotFound(_))
  ));
}

#[tokio::test]
async fn cancel_deletes_an_open_request_of_ones_own() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;
  let boss = manager(&c, "boss@example.com", "B1").await;
  let entry = c.submit_request(&dana, &leak()).await.unwrap();

  assert!(matches!(
    c.cancel_request(&boss, &entry.key).await,
    Err(Error::PermissionDenied(_))
  ));

  c.cancel_request(&dana, &entry.key).await.unwrap();
  assert!(c.all_requests(&dana).await.unwrap().is_empty());
  assert!(matches!(
    c.cancel_request(&dana, &entry.key).await,
    Err(Error::RequestNotFound(_))
  ));
}

#[tokio::test]
async fn closed_requests_cannot_be_cancelled() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;
  let entry = c.submit_request(&dana, &leak()).await.unwrap();
  c.close_request(&dana, &entry.key).await.unwrap();

  assert!(matches!(
    c.cancel_request(&dana, &entry.key).await,
    Err(Error::PermissionDenied(_))
  ));
}

/// Deletes the target just before every conditional update, as a
/// concurrent cancel would.
struct CancelledMidClose(SqliteStore);

impl DocumentStore for CancelledMidClose {
  type Error = concierge_store_sqlite::Error;

  async fn get(&self, path: &StorePath) -> Result<Option<Value>, Self::Error> {
    self.0.get(path).await
  }

  async fn set(&self, path: &StorePath, value: Value) -> Result<(), Self::Error> {
    self.0.set(path, value).await
  }

  async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), Self::Error> {
    self.0.update(path, fields).await
  }

  async fn update_existing(
    &self,
    path: &StorePath,
    fields: Map<String, Value>,
  ) -> Result<bool, Self::Error> {
    self.0.remove(path).await?;
    self.0.update_existing(path, fields).await
  }

  async fn remove(&self, path: &StorePath) -> Result<(), Self::Error> { self.0.remove(path).await }

  async fn query(&self, path: &StorePath, query: &Query) -> Result<Vec<Child>, Self::Error> {
    self.0.query(path, query).await
  }

  fn push_key(&self) -> PushId { self.0.push_key() }

  fn changes(&self) -> broadcast::Receiver<StorePath> { self.0.changes() }
}

#[tokio::test]
async fn closing_a_request_cancelled_meanwhile_leaves_no_orphan() {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  store.set(&StorePath::building("B1").unwrap(), building_marker()).await.unwrap();
  let identity = store.identity();
  let c = Concierge::new(CancelledMidClose(store), identity);
  let dana = c.register(&form("dana@example.com", "B1")).await.unwrap();
  let entry = c.submit_request(&dana, &leak()).await.unwrap();

  assert!(matches!(
    c.close_request(&dana, &entry.key).await,
    Err(Error::RequestNotFound(_))
  ));

  let path = StorePath::help_requests("B1").unwrap().child(&entry.key).unwrap();
  assert_eq!(c.store().get(&path).await.unwrap(), None);
  assert!(c.all_requests(&dana).await.unwrap().is_empty());
}

#[tokio::test]
async fn an_orphaned_flag_does_not_hide_the_other_requests() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;
  let entry = c.submit_request(&dana, &leak()).await.unwrap();
  let orphan = StorePath::help_requests("B1").unwrap().child("-Norphan").unwrap();
  c.store().set(&orphan, json!({ "isOpen": false })).await.unwrap();

  let all = c.all_requests(&dana).await.unwrap();

  assert_eq!(all.len(), 1);
  assert_eq!(all[0].key, entry.key);
}

#[tokio::test]
async fn close_by_timestamp_requires_exactly_one_match() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;
  let partition = StorePath::help_requests("B1").unwrap();

  let record = |ts: i64| {
    json!({
      "content": "Leak", "fullName": "Dana", "apartmentNumber": "4",
      "date": "01/01/2025", "time": "09:00", "timestamp": ts,
      "isOpen": true, "publisherId": dana.uid, "buildingCode": "B1",
    })
  };
  for (key, ts) in [("-Na", 100), ("-Nb", 200), ("-Nc", 200)] {
    c.store().set(&partition.child(key).unwrap(), record(ts)).await.unwrap();
  }

  assert!(matches!(
    c.close_request_at(&dana, 200).await,
    Err(Error::RequestNotUniquelyIdentifiable { timestamp: 200, matches: 2 })
  ));
  assert!(matches!(
    c.close_request_at(&dana, 300).await,
    Err(Error::RequestNotUniquelyIdentifiable { matches: 0, .. })
  ));

  let key = c.close_request_at(&dana, 100).await.unwrap();
  assert_eq!(key.as_str(), "-Na");

  let open = c.open_requests(&dana).await.unwrap();
  assert_eq!(open.len(), 2);
}

#[tokio::test]
async fn open_request_feed_follows_closes() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;
  let entry = c.submit_request(&dana, &leak()).await.unwrap();

  let mut feed = c.watch_open_requests(&dana).await.unwrap();
  let first = feed.next().await.unwrap().unwrap();
  assert_eq!(first.len(), 1);
  assert!(first[0].can_close);

  c.close_request(&dana, &entry.key).await.unwrap();
  assert!(feed.next().await.unwrap().unwrap().is_empty());
}

// ─── Complaints ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn complaints_are_filed_under_the_building() {
  let c = client().await;
  let dana = resident(&c, "dana@example.com", "B1").await;

  assert!(matches!(
    c.file_complaint(&dana, "Noise", "").await,
    Err(Error::InvalidField { field: Field::Description, .. })
  ));

  let entry = c.file_complaint(&dana, "Noise", "Drilling at night").await.unwrap();
  let path = StorePath::complaints("B1").unwrap().child(&entry.key).unwrap();
  let stored = c.store().get(&path).await.unwrap().unwrap();
  assert_eq!(stored["subject"], json!("Noise"));
  assert_eq!(stored["publisherId"], json!(dana.uid));
}
