// groupsconnector/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_DATABASE_PATH: &str = "groups.db";
const DEFAULT_WATERMARK_PATH: &str = "lastuploadtime.bin";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 100;
const DEFAULT_LOG_LEVEL: &str = "warn";
pub const ACCESS_TOKEN_ENV: &str = "GRAPH_ACCESS_TOKEN";

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonSchemaPollOptions {
    pub interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub graph_base_url: Option<String>,
    pub access_token: Option<String>,
    pub database_path: Option<PathBuf>,
    pub watermark_path: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub schema_poll: Option<JsonSchemaPollOptions>,
    pub log_level: Option<String>,
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub base_url: String,
    pub access_token: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaPollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for SchemaPollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub graph: GraphConfig,
    pub database_path: PathBuf,
    pub watermark_path: PathBuf,
    pub schema_poll: SchemaPollConfig,
    pub log_level: String,
}

impl AppConfig {
    /// Reads `config_path`, falling back to `GRAPH_ACCESS_TOKEN` (from the
    /// environment or a `.env` file) when the file carries no token.
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;

        let _ = dotenv::dotenv();
        let env_token = env::var(ACCESS_TOKEN_ENV).ok();

        Self::from_raw(raw_json_config, env_token)
    }

    pub fn from_raw(raw: RawJsonConfig, env_token: Option<String>) -> Result<Self> {
        let base_url = raw
            .graph_base_url
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string());
        Url::parse(&base_url)
            .with_context(|| format!("graph_base_url in config.json is not a valid URL: {}", base_url))?;

        let access_token = raw
            .access_token
            .filter(|s| !s.trim().is_empty())
            .or(env_token.filter(|s| !s.trim().is_empty()))
            .with_context(|| {
                format!(
                    "access_token must be set in config.json or via the {} environment variable",
                    ACCESS_TOKEN_ENV
                )
            })?;

        let poll = raw.schema_poll.unwrap_or_default();
        let max_attempts = poll.max_attempts.unwrap_or(DEFAULT_POLL_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "schema_poll.max_attempts in config.json must be greater than zero."
            ));
        }

        let database_path = raw
            .database_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));
        if database_path.to_string_lossy().is_empty() {
            return Err(anyhow::anyhow!("database_path cannot be empty in config.json."));
        }
        let watermark_path = raw
            .watermark_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WATERMARK_PATH));
        if watermark_path.to_string_lossy().is_empty() {
            return Err(anyhow::anyhow!("watermark_path cannot be empty in config.json."));
        }

        Ok(AppConfig {
            graph: GraphConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                access_token,
                request_timeout: Duration::from_secs(
                    raw.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
                ),
            },
            database_path,
            watermark_path,
            schema_poll: SchemaPollConfig {
                interval: Duration::from_secs(
                    poll.interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
                ),
                max_attempts,
            },
            log_level: raw
                .log_level
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}
