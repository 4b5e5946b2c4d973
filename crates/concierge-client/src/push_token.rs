//! Best-effort retrieval of the device's push token.
//!
//! A missing token never blocks a submission: [`fetch_push_token`] swallows
//! every failure and the request is written without one.

use std::{convert::Infallible, future::Future, time::Duration};

use tracing::{debug, warn};

/// Where push tokens come from (a platform messaging service in production).
pub trait PushTokenSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn token(&self) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}

/// A token fixed ahead of time, e.g. from configuration.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl PushTokenSource for StaticToken {
  type Error = Infallible;

  async fn token(&self) -> Result<String, Infallible> { Ok(self.0.clone()) }
}

/// Ask `source` for a token, giving up after `timeout`. Returns `None` on
/// error, timeout or an empty token.
pub async fn fetch_push_token<P: PushTokenSource>(source: &P, timeout: Duration) -> Option<String> {
  match tokio::time::timeout(timeout, source.token()).await {
    Ok(Ok(token)) if !token.is_empty() => {
      debug!("obtained push token");
      Some(token)
    }
    Ok(Ok(_)) => {
      warn!("push token source returned an empty token");
      None
    }
    Ok(Err(e)) => {
      warn!(error = %e, "could not obtain push token");
      None
    }
    Err(_) => {
      warn!(?timeout, "timed out waiting for push token");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io;

  use super::*;

  struct Failing;

  impl PushTokenSource for Failing {
    type Error = io::Error;

    async fn token(&self) -> Result<String, io::Error> { Err(io::Error::other("no service")) }
  }

  struct Stalled;

  impl PushTokenSource for Stalled {
    type Error = Infallible;

    async fn token(&self) -> Result<String, Infallible> {
      tokio::time::sleep(Duration::from_secs(3600)).await;
      Ok("late".into())
    }
  }

  #[tokio::test]
  async fn static_token_is_returned() {
    let token = fetch_push_token(&StaticToken("abc".into()), Duration::from_secs(1)).await;
    assert_eq!(token.as_deref(), Some("abc"));
  }

  #[tokio::test]
  async fn failures_and_blanks_yield_none() {
    assert_eq!(fetch_push_token(&Failing, Duration::from_secs(1)).await, None);
    assert_eq!(fetch_push_token(&StaticToken(String::new()), Duration::from_secs(1)).await, None);
  }

  #[tokio::test(start_paused = true)]
  async fn slow_sources_time_out() {
    assert_eq!(fetch_push_token(&Stalled, Duration::from_millis(50)).await, None);
  }
}
