//! `concierge`: a command-line client for building notifications and help
//! requests.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store named there and runs one command against it. The signed-in account is
//! remembered in the store between invocations.
//!
//! ```text
//! concierge admin add-building B1
//! concierge register --email dana@example.com --full-name "Dana Levi" --building B1
//! concierge requests submit "Leak in hallway"
//! concierge requests open
//! ```

mod config;
mod render;

use std::{
  io::{self, BufRead, Write},
  path::PathBuf,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use concierge_client::{
  Concierge, HelpRequestForm, LoginForm, Order, RegistrationForm,
  push_token::{StaticToken, fetch_push_token},
  reminder::{DailyReminder, LocalNotifier},
};
use concierge_core::{
  path::{PushId, StorePath},
  policy,
  profile::{building_marker, fields as profile_fields},
  store::DocumentStore,
};
use concierge_store_sqlite::{SqliteIdentity, SqliteStore};
use serde_json::{Map, Value};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

type Client = Concierge<SqliteStore, SqliteIdentity>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "concierge", version, about = "Building notifications and help requests")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create an account in an existing building.
  Register {
    #[arg(long)]
    email:     String,
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    building:  String,
    #[arg(long)]
    apartment: Option<String>,
    /// Read from stdin when omitted.
    #[arg(long, env = "CONCIERGE_PASSWORD", hide_env_values = true)]
    password:  Option<String>,
  },
  /// Sign in and check the building code.
  Login {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    building: String,
    #[arg(long, env = "CONCIERGE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Re-enter the remembered session.
  Resume,
  Logout,
  /// Send a password-reset request.
  ResetPassword {
    #[arg(long)]
    email: String,
  },
  #[command(subcommand)]
  Profile(ProfileCommand),
  #[command(subcommand)]
  Notifications(NotificationCommand),
  #[command(subcommand)]
  Requests(RequestCommand),
  /// File a complaint with the building committee.
  Complaint {
    #[arg(long)]
    subject:     String,
    #[arg(long)]
    description: String,
  },
  /// Print the daily reminder at the configured time, forever.
  Remind,
  #[command(subcommand)]
  Admin(AdminCommand),
}

#[derive(Subcommand)]
enum ProfileCommand {
  Show,
  Rename { full_name: String },
}

#[derive(Subcommand)]
enum NotificationCommand {
  List {
    #[arg(long)]
    oldest_first: bool,
  },
  /// Managers only.
  Publish { content: String },
  /// Print the list again whenever it changes.
  Watch,
}

#[derive(Subcommand)]
enum RequestCommand {
  Submit {
    content:   String,
    /// Defaults to the profile name.
    #[arg(long)]
    name:      Option<String>,
    /// Defaults to the profile apartment.
    #[arg(long)]
    apartment: Option<String>,
  },
  /// Open requests; re-printed on change with `--watch`.
  Open {
    #[arg(long)]
    watch: bool,
  },
  All,
  Mine,
  Close { key: String },
  /// Close the request with this exact timestamp.
  CloseAt { timestamp: i64 },
  /// Delete one of your own open requests.
  Cancel { key: String },
}

/// Direct store maintenance; bypasses the access policy.
#[derive(Subcommand)]
enum AdminCommand {
  AddBuilding {
    code: String,
  },
  SetManager {
    uid:    String,
    #[arg(long)]
    revoke: bool,
  },
  /// Print the access rules for the hosted store.
  Rules,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;

  if let Some(dir) = cfg.store_path.parent().filter(|d| !d.as_os_str().is_empty()) {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let identity = store.identity();
  let client = Concierge::new(store, identity);

  run(&client, &cfg, cli.command).await
}

async fn run(client: &Client, cfg: &CliConfig, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Register { email, full_name, building, apartment, password } => {
      let password = password_or_stdin(password)?;
      let session = client
        .register(&RegistrationForm {
          email,
          password,
          full_name,
          building_code: building,
          apartment_number: apartment,
        })
        .await?;
      println!("registered {} ({})", session.email, session.uid);
    }

    Command::Login { email, building, password } => {
      let password = password_or_stdin(password)?;
      let signed_in = client
        .login(&LoginForm { email, password, building_code: building })
        .await?;
      render::landing(&signed_in.scope, signed_in.landing);
    }

    Command::Resume => match client.resume().await? {
      Some(signed_in) => render::landing(&signed_in.scope, signed_in.landing),
      None => println!("not signed in"),
    },

    Command::Logout => {
      client.sign_out().await?;
      println!("signed out");
    }

    Command::ResetPassword { email } => {
      client.send_password_reset(&email).await?;
      println!("password reset sent to {email}");
    }

    Command::Profile(cmd) => {
      let session = client.current_session().await?;
      let profile = match cmd {
        ProfileCommand::Show => client.profile(&session).await?,
        ProfileCommand::Rename { full_name } => client.update_full_name(&session, &full_name).await?,
      };
      println!("uid:       {}", session.uid);
      println!("{}", serde_json::to_string_pretty(&profile)?);
    }

    Command::Notifications(cmd) => {
      let session = client.current_session().await?;
      match cmd {
        NotificationCommand::List { oldest_first } => {
          let order = if oldest_first { Order::OldestFirst } else { Order::NewestFirst };
          render::notifications(&client.notifications(&session, order).await?);
        }
        NotificationCommand::Publish { content } => {
          let entry = client.publish_notification(&session, &content).await?;
          println!("published [{}]", entry.key);
        }
        NotificationCommand::Watch => {
          let _follower = client.store().follow_external_writes(POLL_INTERVAL);
          let mut feed = client.watch_notifications(&session, Order::NewestFirst).await?;
          while let Some(snapshot) = feed.next().await {
            render::notifications(&snapshot?);
            println!();
          }
        }
      }
    }

    Command::Requests(cmd) => requests(client, cfg, cmd).await?,

    Command::Complaint { subject, description } => {
      let session = client.current_session().await?;
      let entry = client.file_complaint(&session, &subject, &description).await?;
      println!("filed complaint [{}]", entry.key);
    }

    Command::Remind => {
      let reminder = DailyReminder::new(cfg.reminder_hour, cfg.reminder_minute)?;
      reminder.run(&Terminal).await;
    }

    Command::Admin(cmd) => admin(client, cmd).await?,
  }
  Ok(())
}

const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);

async fn requests(client: &Client, cfg: &CliConfig, cmd: RequestCommand) -> anyhow::Result<()> {
  let session = client.current_session().await?;
  match cmd {
    RequestCommand::Submit { content, name, apartment } => {
      let device_token = match &cfg.push_token {
        Some(token) => fetch_push_token(&StaticToken(token.clone()), cfg.push_token_timeout()).await,
        None => None,
      };
      let entry = client
        .submit_request(&session, &HelpRequestForm {
          content,
          full_name: name,
          apartment_number: apartment,
          device_token,
        })
        .await?;
      println!("submitted [{}] ts={}", entry.key, entry.record.timestamp);
    }
    RequestCommand::Open { watch: false } => render::requests(&client.open_requests(&session).await?),
    RequestCommand::Open { watch: true } => {
      let _follower = client.store().follow_external_writes(POLL_INTERVAL);
      let mut feed = client.watch_open_requests(&session).await?;
      while let Some(snapshot) = feed.next().await {
        render::requests(&snapshot?);
        println!();
      }
    }
    RequestCommand::All => render::requests(&client.all_requests(&session).await?),
    RequestCommand::Mine => render::requests(&client.my_requests(&session).await?),
    RequestCommand::Close { key } => {
      client.close_request(&session, &PushId::parse(key)?).await?;
      println!("closed");
    }
    RequestCommand::CloseAt { timestamp } => {
      let key = client.close_request_at(&session, timestamp).await?;
      println!("closed [{key}]");
    }
    RequestCommand::Cancel { key } => {
      client.cancel_request(&session, &PushId::parse(key)?).await?;
      println!("cancelled");
    }
  }
  Ok(())
}

async fn admin(client: &Client, cmd: AdminCommand) -> anyhow::Result<()> {
  match cmd {
    AdminCommand::AddBuilding { code } => {
      client.store().set(&StorePath::building(&code)?, building_marker()).await?;
      tracing::info!(building = %code, "added building");
      println!("added building {code}");
    }
    AdminCommand::SetManager { uid, revoke } => {
      let path = StorePath::user(&uid)?;
      if client.store().get(&path).await?.is_none() {
        anyhow::bail!("no profile for user {uid}");
      }
      let mut patch = Map::new();
      patch.insert(profile_fields::IS_MANAGER.to_owned(), Value::Bool(!revoke));
      client.store().update(&path, patch).await?;
      tracing::info!(%uid, manager = !revoke, "changed manager flag");
      println!("{uid} is {}a manager", if revoke { "no longer " } else { "" });
    }
    AdminCommand::Rules => println!("{}", serde_json::to_string_pretty(&policy::server_rules())?),
  }
  Ok(())
}

/// Prints reminders to the terminal.
struct Terminal;

impl LocalNotifier for Terminal {
  async fn notify(&self, title: &str, body: &str) {
    println!("{title} {body}");
  }
}

/// Use `given`, or read a password line from stdin.
fn password_or_stdin(given: Option<String>) -> anyhow::Result<String> {
  if let Some(password) = given {
    return Ok(password);
  }
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
