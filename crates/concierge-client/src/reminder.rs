//! The once-a-day local reminder to check for new notifications.

use std::future::Future;

use chrono::{DateTime, Days, Local, TimeZone};
use tracing::{debug, info};

use crate::{Error, Field, Result};

pub const DEFAULT_HOUR: u32 = 16;
pub const DEFAULT_MINUTE: u32 = 0;

pub const TITLE: &str = "Daily reminder!";
pub const BODY: &str = "Don't forget to check for new messages from the building committee!";

/// Shows a notification on this device.
pub trait LocalNotifier: Send + Sync {
  fn notify<'a>(&'a self, title: &'a str, body: &'a str) -> impl Future<Output = ()> + Send + 'a;
}

/// Fires at a fixed local wall-clock time every day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReminder {
  hour:   u32,
  minute: u32,
}

impl Default for DailyReminder {
  fn default() -> Self { Self { hour: DEFAULT_HOUR, minute: DEFAULT_MINUTE } }
}

impl DailyReminder {
  pub fn new(hour: u32, minute: u32) -> Result<Self> {
    if hour > 23 || minute > 59 {
      return Err(Error::InvalidField {
        field:  Field::ReminderTime,
        reason: "must be a valid time of day",
      });
    }
    Ok(Self { hour, minute })
  }

  /// The first firing strictly after `now`, in `now`'s time zone.
  ///
  /// A day on which the wall-clock time does not exist (a DST gap) is skipped.
  pub fn next_fire_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
    let zone = now.timezone();
    let today = now.date_naive();

    (0..=2u64)
      .filter_map(|offset| today.checked_add_days(Days::new(offset)))
      .filter_map(|day| day.and_hms_opt(self.hour, self.minute, 0))
      .filter_map(|local| zone.from_local_datetime(&local).earliest())
      .find(|at| at > now)
      .unwrap_or_else(|| now.clone() + chrono::Duration::days(1))
  }

  /// Notify once a day, forever.
  pub async fn run<N: LocalNotifier>(&self, notifier: &N) {
    loop {
      let now = Local::now();
      let next = self.next_fire_after(&now);
      debug!(%next, "next reminder");
      tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

      notifier.notify(TITLE, BODY).await;
      info!("daily reminder fired");
    }
  }
}
