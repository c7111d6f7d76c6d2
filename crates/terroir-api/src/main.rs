//! terroir server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) overlaid with
//! `TERROIR_*` environment variables, opens the SQLite store and serves the
//! JSON API over HTTP.
//!
//! # First run
//!
//! An empty database has no account to log in with. Create the first
//! superadmin (the password is read from stdin):
//!
//! ```text
//! cargo run -p terroir-api --bin terroir-server -- --bootstrap-superadmin root
//! ```

use std::{
  io::{self, BufRead, Write},
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use terroir_api::{AppState, ServerConfig, auth::hash_password};
use terroir_core::{principal::Role, store::FieldStore, user::NewUser};
use terroir_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "terroir field-operations server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create the first superadmin account and exit. Refused once any account
  /// exists.
  #[arg(long, value_name = "USERNAME")]
  bootstrap_superadmin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "terroir.db")?
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TERROIR"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(username) = cli.bootstrap_superadmin {
    return bootstrap(&store, username).await;
  }

  let app = terroir_api::router(AppState::new(Arc::new(store)));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn bootstrap(store: &SqliteStore, username: String) -> anyhow::Result<()> {
  let existing = store.count_users().await?;
  if existing > 0 {
    anyhow::bail!("refusing to bootstrap: {existing} account(s) already exist");
  }

  let password = read_password()?;
  if password.is_empty() {
    anyhow::bail!("password must not be empty");
  }
  let password_hash =
    hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;

  let account = store
    .add_user(NewUser {
      display_name: username.clone(),
      username,
      role: Role::Superadmin,
      region_ids: Default::default(),
      password_hash,
    })
    .await
    .context("failed to create superadmin")?;

  tracing::info!(user = %account.user_id, username = %account.username, "superadmin created");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
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
