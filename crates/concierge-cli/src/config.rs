//! Runtime configuration, deserialised from `config.toml` and `CONCIERGE_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use concierge_client::reminder::{DEFAULT_HOUR, DEFAULT_MINUTE};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
  /// SQLite file holding documents, accounts and the current session.
  pub store_path:            PathBuf,
  pub reminder_hour:         u32,
  pub reminder_minute:       u32,
  /// Push token attached to submitted help requests.
  pub push_token:            Option<String>,
  pub push_token_timeout_ms: u64,
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      store_path:            PathBuf::from("~/.local/share/concierge/concierge.db"),
      reminder_hour:         DEFAULT_HOUR,
      reminder_minute:       DEFAULT_MINUTE,
      push_token:            None,
      push_token_timeout_ms: 2_000,
    }
  }
}

impl CliConfig {
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("CONCIERGE").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn push_token_timeout(&self) -> Duration { Duration::from_millis(self.push_token_timeout_ms) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
