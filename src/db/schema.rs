//! Database schema and types

use chrono::{DateTime, Utc};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Key holding the serialized workspace collection
pub const KEY_WORKSPACES: &str = "workspaces";

/// Key holding the active workspace id
pub const KEY_CURRENT_WORKSPACE: &str = "current_workspace_id";

/// A stored value with its last write time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Parse an RFC 3339 timestamp, falling back to now for corrupt rows
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
