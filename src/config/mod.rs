mod file_config;

pub use file_config::FileConfig;

use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub auth_url: Option<String>,
    pub auth_timeout_sec: u64,
    pub store_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub auth_url: String,
    pub auth_timeout: Duration,
    pub store_timeout: Duration,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = match file.logging_level {
            Some(level) => parse_logging_level(&level)
                .ok_or_else(|| anyhow!("Unknown logging_level in config file: {}", level))?,
            None => cli.logging_level.clone(),
        };

        let auth_url = file
            .auth_url
            .or_else(|| cli.auth_url.clone())
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| anyhow!("auth_url must be specified via --auth-url or in config file"))?;

        let auth_timeout_sec = file.auth_timeout_sec.unwrap_or(cli.auth_timeout_sec);
        if auth_timeout_sec == 0 {
            bail!("auth_timeout_sec must be greater than zero");
        }

        let store_timeout_ms = file.store_timeout_ms.unwrap_or(cli.store_timeout_ms);
        if store_timeout_ms == 0 {
            bail!("store_timeout_ms must be greater than zero");
        }

        Ok(Self {
            db_dir,
            port,
            logging_level,
            auth_url,
            auth_timeout: Duration::from_secs(auth_timeout_sec),
            store_timeout: Duration::from_millis(store_timeout_ms),
        })
    }

    pub fn lists_db_path(&self) -> PathBuf {
        self.db_dir.join("lists.db")
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            store_timeout: self.store_timeout,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
