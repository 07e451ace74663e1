use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recency_lists_server::config::{AppConfig, CliConfig, FileConfig};
use recency_lists_server::{
    run_server, HttpIdentityResolver, ListManager, RequestsLoggingLevel, SqliteListStore,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the lists database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// URL of the account service endpoint resolving an access token into its owner.
    #[clap(long)]
    pub auth_url: Option<String>,

    /// Timeout in seconds for account service requests.
    #[clap(long, default_value_t = 5)]
    pub auth_timeout_sec: u64,

    /// Timeout in milliseconds for a single list operation.
    #[clap(long, default_value_t = 3000)]
    pub store_timeout_ms: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            auth_url: self.auth_url.clone(),
            auth_timeout_sec: self.auth_timeout_sec,
            store_timeout_ms: self.store_timeout_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening lists database at {:?}...", config.lists_db_path());
    let collections =
        SqliteListStore::open_collections(config.lists_db_path(), config.store_timeout)?;
    let list_manager = ListManager::new(collections);

    let identity_resolver = HttpIdentityResolver::new(&config.auth_url, config.auth_timeout)?;
    info!("Resolving tokens against {}", config.auth_url);

    info!("Ready to serve at port {}!", config.port);
    run_server(
        config.server_config(),
        list_manager,
        Arc::new(identity_resolver),
    )
    .await
}
