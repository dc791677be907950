//! Client configuration from environment variables

use std::path::PathBuf;
use std::time::Duration;

use crate::state_machine::state::DEFAULT_STAGGER;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

const DB_FILE: &str = "lumawell.db";
const LOG_FILE: &str = "lumawell.log";

/// Configuration for the chat client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL, without the `/chat` suffix
    pub api_url: String,
    pub city: Option<String>,
    pub realtime: bool,
    /// Directory holding the settings database and the log file
    pub data_dir: PathBuf,
    pub stagger: Duration,
    /// HTTP timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = var("LUMAWELL_API_URL")
            .map_or_else(|| DEFAULT_API_URL.to_string(), |u| u.trim().to_string());

        let realtime = var("LUMAWELL_REALTIME")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);

        let data_dir = var("LUMAWELL_DATA_DIR").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".lumawell")
            },
            PathBuf::from,
        );

        // Zero would give every follow-up the same due time
        let stagger = var("LUMAWELL_STAGGER_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map_or(DEFAULT_STAGGER, Duration::from_millis);

        let timeout = var("LUMAWELL_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            api_url,
            city: var("LUMAWELL_CITY").map(|c| c.trim().to_string()),
            realtime,
            data_dir,
            stagger,
            timeout,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
