//! The help-request lifecycle: submit, list, close, cancel.
//!
//! A request is written open and leaves that state at most once: a manager or
//! its publisher closes it (`isOpen` becomes `false`), or its publisher
//! cancels it while still open, which deletes the record. List views carry the
//! record's key so neither transition has to rediscover it.

use std::sync::Arc;

use concierge_core::{
  path::{PushId, StorePath},
  policy::{self, Action},
  query::{Child, Query},
  request::{ANONYMOUS, HelpRequest, fields},
  schema::{Entry, Schema},
  session::{IdentityProvider, Session},
  stamp::Stamp,
  store::DocumentStore,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
  BuildingScope, Concierge, Error, Field, Result,
  error::required,
  notifications::{PartitionWatch, decode_all},
};

#[derive(Debug, Clone, Default)]
pub struct HelpRequestForm {
  pub content:          String,
  /// Falls back to the profile, then to `"Anonymous"`.
  pub full_name:        Option<String>,
  /// Falls back to the profile, then to empty.
  pub apartment_number: Option<String>,
  /// Push token of this device, if one was obtained.
  pub device_token:     Option<String>,
}

/// A request as shown in a list, with the controls the viewer may use.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
  pub key:        PushId,
  pub request:    HelpRequest,
  pub can_close:  bool,
  pub can_cancel: bool,
}

impl RequestView {
  fn new(scope: &BuildingScope, entry: Entry<HelpRequest>) -> Self {
    let principal = scope.principal();
    let can_close = entry.record.is_open
      && policy::evaluate(&principal, &Action::CloseRequest { request: &entry.record }).is_allowed();
    let can_cancel =
      policy::evaluate(&principal, &Action::CancelRequest { request: &entry.record }).is_allowed();
    Self { key: entry.key, request: entry.record, can_close, can_cancel }
  }
}

fn views(scope: &BuildingScope, children: &[Child]) -> Vec<RequestView> {
  decode_all::<HelpRequest>(children)
    .into_iter()
    .map(|entry| RequestView::new(scope, entry))
    .collect()
}

/// First non-blank candidate, trimmed.
fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
  candidates.into_iter().flatten().map(str::trim).find(|s| !s.is_empty())
}

fn open_query() -> Query { Query::new().where_eq(fields::IS_OPEN, true).order_by(fields::TIMESTAMP) }

impl<S, I> Concierge<S, I>
where
  S: DocumentStore + 'static,
  I: IdentityProvider,
{
  /// File a new, open request in the caller's building.
  pub async fn submit_request(
    &self,
    session: &Session,
    form: &HelpRequestForm,
  ) -> Result<Entry<HelpRequest>> {
    let content = required(Field::Content, &form.content)?;
    let scope = self.resolve_building(session).await?;

    let full_name =
      first_present([form.full_name.as_deref(), Some(scope.profile.full_name.as_str())])
        .unwrap_or(ANONYMOUS);
    let apartment_number =
      first_present([form.apartment_number.as_deref(), scope.profile.apartment_number.as_deref()])
        .unwrap_or_default();

    let key = self.store.push_key();
    let path = StorePath::help_requests(&scope.building_code)?.child(&key)?;
    let mut record = HelpRequest::open(
      content.to_owned(),
      full_name.to_owned(),
      apartment_number.to_owned(),
      scope.uid.clone(),
      scope.building_code.clone(),
      Stamp::now(),
    );
    record.device_token = form.device_token.clone().filter(|t| !t.is_empty());

    self.store.set(&path, record.encode()?).await.map_err(Error::store)?;

    info!(building = %scope.building_code, %key, "submitted help request");
    Ok(Entry { key, record })
  }

  async fn list_requests(&self, session: &Session, query: Query) -> Result<Vec<RequestView>> {
    let scope = self.resolve_building(session).await?;
    let partition = scope.readable(StorePath::help_requests(&scope.building_code)?)?;

    let children = self.store.query(&partition, &query).await.map_err(Error::store)?;
    debug!(building = %scope.building_code, count = children.len(), "listed help requests");
    Ok(views(&scope, &children))
  }

  /// Requests with `isOpen == true`, oldest first.
  pub async fn open_requests(&self, session: &Session) -> Result<Vec<RequestView>> {
    self.list_requests(session, open_query()).await
  }

  /// Every request in the building, open or closed, oldest first.
  pub async fn all_requests(&self, session: &Session) -> Result<Vec<RequestView>> {
    self.list_requests(session, Query::new().order_by(fields::TIMESTAMP)).await
  }

  /// The caller's own requests, open or closed, oldest first.
  pub async fn my_requests(&self, session: &Session) -> Result<Vec<RequestView>> {
    let query = Query::new()
      .where_eq(fields::PUBLISHER_ID, session.uid.as_str())
      .order_by(fields::TIMESTAMP);
    self.list_requests(session, query).await
  }

  pub async fn watch_open_requests(&self, session: &Session) -> Result<RequestFeed<S>> {
    let scope = self.resolve_building(session).await?;
    let partition = scope.readable(StorePath::help_requests(&scope.building_code)?)?;
    Ok(RequestFeed {
      watch: PartitionWatch::new(Arc::clone(&self.store), partition, open_query()),
      scope,
    })
  }

  async fn load_request(&self, scope: &BuildingScope, key: &PushId) -> Result<(StorePath, HelpRequest)> {
    let path = StorePath::help_requests(&scope.building_code)?.child(key)?;
    let value = self
      .store
      .get(&path)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::RequestNotFound(key.clone()))?;
    Ok((path, HelpRequest::decode(&value)?))
  }

  async fn close_in(&self, scope: &BuildingScope, key: &PushId) -> Result<()> {
    let (path, request) = self.load_request(scope, key).await?;
    scope.authorize(Action::CloseRequest { request: &request })?;

    // Partial update: only the flag is written, and only ever to `false`.
    let mut patch = Map::new();
    patch.insert(fields::IS_OPEN.to_owned(), Value::Bool(false));
    // Never recreate a request deleted since it was read.
    let written = self.store.update_existing(&path, patch).await.map_err(Error::store)?;
    if !written {
      return Err(Error::RequestNotFound(key.clone()));
    }

    info!(building = %scope.building_code, %key, was_open = request.is_open, "closed help request");
    Ok(())
  }

  /// Mark a request closed. Allowed for its publisher and for managers;
  /// closing an already closed request leaves it closed.
  pub async fn close_request(&self, session: &Session, key: &PushId) -> Result<()> {
    let scope = self.resolve_building(session).await?;
    self.close_in(&scope, key).await
  }

  /// Close the single request carrying `timestamp`.
  ///
  /// For callers that did not keep the key. Aborts without writing unless
  /// exactly one request matches.
  pub async fn close_request_at(&self, session: &Session, timestamp: i64) -> Result<PushId> {
    let scope = self.resolve_building(session).await?;
    let partition = StorePath::help_requests(&scope.building_code)?;
    let query = Query::new().where_eq(fields::TIMESTAMP, timestamp);

    let hits = self.store.query(&partition, &query).await.map_err(Error::store)?;
    let [only] = hits.as_slice() else {
      warn!(building = %scope.building_code, timestamp, matches = hits.len(), "ambiguous timestamp");
      return Err(Error::RequestNotUniquelyIdentifiable { timestamp, matches: hits.len() });
    };
    let key = PushId::parse(only.key.clone())?;

    self.close_in(&scope, &key).await?;
    Ok(key)
  }

  /// Withdraw an open request by deleting it. Publisher only.
  pub async fn cancel_request(&self, session: &Session, key: &PushId) -> Result<()> {
    let scope = self.resolve_building(session).await?;
    let (path, request) = self.load_request(&scope, key).await?;
    scope.authorize(Action::CancelRequest { request: &request })?;

    self.store.remove(&path).await.map_err(Error::store)?;

    info!(building = %scope.building_code, %key, "cancelled help request");
    Ok(())
  }
}

/// A continuous listener over the open requests of the caller's building.
pub struct RequestFeed<S> {
  watch: PartitionWatch<S>,
  scope: BuildingScope,
}

impl<S: DocumentStore> RequestFeed<S> {
  pub async fn next(&mut self) -> Option<Result<Vec<RequestView>>> {
    let snapshot = self.watch.next().await?;
    Some(snapshot.map(|children| views(&self.scope, &children)))
  }
}
