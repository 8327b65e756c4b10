use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PATH: &str = "agora.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Database settings, read from the environment by [`DbConfig::from_env`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `:memory:` opens a private in-memory database.
    pub path: PathBuf,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

impl DbConfig {
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }

    /// Load `.env` if present, then read `AGORA_DB_PATH` and
    /// `AGORA_DB_BUSY_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let path = std::env::var("AGORA_DB_PATH").unwrap_or_else(|_| DEFAULT_PATH.into());
        let busy_timeout_ms = match std::env::var("AGORA_DB_BUSY_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("Invalid AGORA_DB_BUSY_TIMEOUT_MS '{}'", raw))?,
            Err(_) => DEFAULT_BUSY_TIMEOUT_MS,
        };

        Ok(Self {
            path: PathBuf::from(path),
            busy_timeout: Duration::from_millis(busy_timeout_ms),
        })
    }
}
