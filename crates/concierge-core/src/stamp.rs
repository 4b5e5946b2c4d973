//! Creation metadata shared by every pushed record.

use chrono::{DateTime, Local, TimeZone};

/// Display date, display time and sortable timestamp for one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
  /// `DD/MM/YYYY` in the zone of the source instant.
  pub date:      String,
  /// `HH:MM`, 24-hour clock.
  pub time:      String,
  /// Milliseconds since the Unix epoch.
  pub timestamp: i64,
}

impl Stamp {
  pub fn now() -> Self { Self::at(&Local::now()) }

  pub fn at<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self
  where
    Tz::Offset: std::fmt::Display,
  {
    Self {
      date:      instant.format("%d/%m/%Y").to_string(),
      time:      instant.format("%H:%M").to_string(),
      timestamp: instant.timestamp_millis(),
    }
  }
}
