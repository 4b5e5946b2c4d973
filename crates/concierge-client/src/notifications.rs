//! Publishing and listing building notifications.

use std::sync::Arc;

use concierge_core::{
  notification::Notification,
  path::StorePath,
  policy::Action,
  query::{Child, Query},
  request::fields::TIMESTAMP,
  schema::{Entry, Schema},
  session::{IdentityProvider, Session},
  stamp::Stamp,
  store::DocumentStore,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::{Concierge, Error, Field, Result, error::required};

/// Listing order by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
  #[default]
  NewestFirst,
  OldestFirst,
}

impl Order {
  fn query(self) -> Query {
    let query = Query::new().order_by(TIMESTAMP);
    match self {
      Self::NewestFirst => query.descending(),
      Self::OldestFirst => query,
    }
  }
}

/// Decode a listing. A record that fails its schema is logged and left out
/// so one bad record cannot hide the rest of the partition.
pub(crate) fn decode_all<T: Schema>(children: &[Child]) -> Vec<Entry<T>> {
  children
    .iter()
    .filter_map(|child| match Entry::<T>::decode(child) {
      Ok(entry) => Some(entry),
      Err(e) => {
        warn!(key = %child.key, error = %e, "skipping undecodable record");
        None
      }
    })
    .collect()
}

impl<S, I> Concierge<S, I>
where
  S: DocumentStore + 'static,
  I: IdentityProvider,
{
  /// Append a notification to the caller's building. Managers only.
  ///
  /// On a failed write the caller keeps its input for another attempt.
  pub async fn publish_notification(
    &self,
    session: &Session,
    content: &str,
  ) -> Result<Entry<Notification>> {
    let content = required(Field::Content, content)?;
    let scope = self.resolve_building(session).await?;
    scope.authorize(Action::PublishNotification { building_code: &scope.building_code })?;

    let key = self.store.push_key();
    let path = StorePath::notifications(&scope.building_code)?.child(&key)?;
    let record = Notification::new(
      scope.uid.clone(),
      scope.profile.full_name.clone(),
      scope.profile.apartment_number.clone(),
      content.to_owned(),
      Stamp::now(),
    );

    self.store.set(&path, record.encode()?).await.map_err(Error::store)?;

    info!(building = %scope.building_code, %key, "published notification");
    Ok(Entry { key, record })
  }

  pub async fn notifications(
    &self,
    session: &Session,
    order: Order,
  ) -> Result<Vec<Entry<Notification>>> {
    let scope = self.resolve_building(session).await?;
    let partition = scope.readable(StorePath::notifications(&scope.building_code)?)?;

    let children = self.store.query(&partition, &order.query()).await.map_err(Error::store)?;
    debug!(building = %scope.building_code, count = children.len(), "listed notifications");
    Ok(decode_all(&children))
  }

  /// A continuous listener over the caller's notification partition.
  pub async fn watch_notifications(
    &self,
    session: &Session,
    order: Order,
  ) -> Result<NotificationFeed<S>> {
    let scope = self.resolve_building(session).await?;
    let partition = scope.readable(StorePath::notifications(&scope.building_code)?)?;
    Ok(NotificationFeed {
      watch: PartitionWatch::new(Arc::clone(&self.store), partition, order.query()),
    })
  }
}

// ─── Feeds ───────────────────────────────────────────────────────────────────

/// Re-queries one partition whenever something inside it, or an ancestor of
/// it, changes.
///
/// The first call to `next` yields the current contents immediately. Each
/// delivery is the whole list; callers replace what they show.
pub(crate) struct PartitionWatch<S> {
  store:     Arc<S>,
  partition: StorePath,
  query:     Query,
  changes:   broadcast::Receiver<StorePath>,
  primed:    bool,
}

impl<S: DocumentStore> PartitionWatch<S> {
  pub(crate) fn new(store: Arc<S>, partition: StorePath, query: Query) -> Self {
    let changes = store.changes();
    Self { store, partition, query, changes, primed: false }
  }

  /// `None` once the store has shut down its change feed.
  pub(crate) async fn next(&mut self) -> Option<Result<Vec<Child>>> {
    if self.primed {
      loop {
        match self.changes.recv().await {
          Ok(path) if path.is_within(&self.partition) || self.partition.is_within(&path) => break,
          Ok(_) => continue,
          Err(RecvError::Lagged(skipped)) => {
            warn!(partition = %self.partition, skipped, "change feed lagged; re-reading");
            break;
          }
          Err(RecvError::Closed) => return None,
        }
      }
    }
    self.primed = true;

    let result = self.store.query(&self.partition, &self.query).await.map_err(Error::store);
    Some(result)
  }
}

pub struct NotificationFeed<S> {
  watch: PartitionWatch<S>,
}

impl<S: DocumentStore> NotificationFeed<S> {
  pub async fn next(&mut self) -> Option<Result<Vec<Entry<Notification>>>> {
    let snapshot = self.watch.next().await?;
    Some(snapshot.map(|children| decode_all(&children)))
  }
}
