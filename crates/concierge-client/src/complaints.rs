//! Complaints filed with the building committee.

use concierge_core::{
  complaint::Complaint,
  path::StorePath,
  schema::{Entry, Schema},
  session::{IdentityProvider, Session},
  stamp::Stamp,
  store::DocumentStore,
};
use tracing::info;

use crate::{Concierge, Error, Field, Result, error::required};

impl<S, I> Concierge<S, I>
where
  S: DocumentStore + 'static,
  I: IdentityProvider,
{
  pub async fn file_complaint(
    &self,
    session: &Session,
    subject: &str,
    description: &str,
  ) -> Result<Entry<Complaint>> {
    let subject = required(Field::Subject, subject)?;
    let description = required(Field::Description, description)?;
    let scope = self.resolve_building(session).await?;

    let key = self.store.push_key();
    let path = StorePath::complaints(&scope.building_code)?.child(&key)?;
    let record = Complaint {
      subject:      subject.to_owned(),
      description:  description.to_owned(),
      publisher_id: scope.uid.clone(),
      timestamp:    Stamp::now().timestamp,
    };

    self.store.set(&path, record.encode()?).await.map_err(Error::store)?;

    info!(building = %scope.building_code, %key, "filed complaint");
    Ok(Entry { key, record })
  }
}
