//! Process configuration, read once from the environment at startup

use crate::llm::LlmConfig;
use crate::runtime::DEFAULT_REQUEST_TIMEOUT;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,https://alaai.vercel.app";

/// Which workspace store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    File,
}

impl StoreKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Some(Self::Sqlite),
            "file" | "json" => Some(Self::File),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store: StoreKind,
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub llm: LlmConfig,
    /// Instruction source; none means the context is always `N/A`
    pub context_url: Option<String>,
    pub target_language: Option<String>,
    pub request_timeout: Duration,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
        let data_dir = get("ALAAI_DATA_DIR")
            .map_or_else(|| PathBuf::from(&home).join(".alaai"), PathBuf::from);
        let db_path = get("ALAAI_DB_PATH").map_or_else(|| data_dir.join("alaai.db"), PathBuf::from);

        let store = match get("ALAAI_STORE") {
            None => StoreKind::Sqlite,
            Some(value) => StoreKind::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown ALAAI_STORE, using sqlite");
                StoreKind::Sqlite
            }),
        };

        let request_timeout = get("ALAAI_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs);

        let allowed_origins = get("ALAAI_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        Self {
            port: get("ALAAI_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            store,
            db_path,
            data_dir,
            llm: LlmConfig::from_lookup(&get),
            context_url: get("ALAAI_CONTEXT_URL"),
            target_language: get("ALAAI_TARGET_LANGUAGE"),
            request_timeout,
            allowed_origins,
        }
    }
}
