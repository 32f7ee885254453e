use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::url::resolve_database_id;

pub const ENV_TODOIST_KEY: &str = "TODOISTKEY";
pub const ENV_NOTION_KEY: &str = "NOTIONKEY";
pub const ENV_DATABASE_ID: &str = "DATABASEID";
pub const ENV_INTERVAL: &str = "SYNC_INTERVAL_SECS";
pub const ENV_FLAG_FILTER: &str = "TODOIST_FLAG_FILTER";
pub const ENV_BASELINE_PRIORITY: &str = "TODOIST_BASELINE_PRIORITY";

const DEFAULT_INTERVAL_SECS: u64 = 10;
const DEFAULT_FLAG_FILTER: &str = "p3";
const DEFAULT_BASELINE_PRIORITY: u8 = 1;

/// Credentials and tuning for one Todoist list / Notion database pair.
#[derive(Clone)]
pub struct Config {
    pub todoist_token: String,
    pub notion_token: String,
    pub database_id: String,
    pub interval: Duration,
    pub flag_filter: String,
    pub baseline_priority: u8,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("todoist_token", &"<redacted>")
            .field("notion_token", &"<redacted>")
            .field("database_id", &self.database_id)
            .field("interval", &self.interval)
            .field("flag_filter", &self.flag_filter)
            .field("baseline_priority", &self.baseline_priority)
            .finish()
    }
}

impl Config {
    /// Load from the process environment. Fails on the first missing
    /// required variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load `.env` from the working directory or a parent into the process
    /// environment. Variables already set are not overridden.
    pub fn load_dotenv() -> Option<PathBuf> {
        match dotenvy::dotenv() {
            Ok(path) => {
                log::debug!("Loaded environment from {}", path.display());
                Some(path)
            }
            Err(e) if e.not_found() => None,
            Err(e) => {
                log::warn!("Ignoring unreadable .env file: {e}");
                None
            }
        }
    }

    /// Load from an explicit env file. The process environment still wins
    /// for any variable set in both.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = read_env_file(path.as_ref())?;
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        let todoist_token = required(ENV_TODOIST_KEY)?;
        let notion_token = required(ENV_NOTION_KEY)?;
        let database_id = resolve_database_id(&required(ENV_DATABASE_ID)?)
            .map_err(|e| Error::Config(format!("{ENV_DATABASE_ID}: {e}")))?;

        let interval_secs = match lookup(ENV_INTERVAL) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs >= 1)
                .ok_or_else(|| {
                    Error::Config(format!("{ENV_INTERVAL} must be a whole number >= 1, got '{raw}'"))
                })?,
            None => DEFAULT_INTERVAL_SECS,
        };

        let flag_filter = lookup(ENV_FLAG_FILTER)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FLAG_FILTER.to_string());

        let baseline_priority = match lookup(ENV_BASELINE_PRIORITY) {
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|p| (1..=4).contains(p))
                .ok_or_else(|| {
                    Error::Config(format!("{ENV_BASELINE_PRIORITY} must be 1-4, got '{raw}'"))
                })?,
            None => DEFAULT_BASELINE_PRIORITY,
        };

        Ok(Self {
            todoist_token,
            notion_token,
            database_id,
            interval: Duration::from_secs(interval_secs),
            flag_filter,
            baseline_priority,
        })
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let invalid = |e: dotenvy::Error| Error::Config(format!("{}: {e}", path.display()));
    dotenvy::from_path_iter(path)
        .map_err(invalid)?
        .map(|item| item.map_err(invalid))
        .collect()
}
