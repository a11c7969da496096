//! Workspace and message records
//!
//! A workspace is a named, independently persisted conversation container.
//! The whole collection is persisted as a single blob keyed by id.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of title words kept when deriving a workspace name
pub const NAME_WORD_LIMIT: usize = 4;

/// Marker appended to a derived name when words were dropped
pub const NAME_ELLIPSIS: &str = "...";

/// Workspace identity: a millisecond timestamp token, unique within the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(pub u64);

impl WorkspaceId {
    /// Next id after `latest`, based on the wall clock but never going backwards
    pub fn fresh(latest: Option<WorkspaceId>) -> Self {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        match latest {
            Some(WorkspaceId(last)) if last >= now => WorkspaceId(last + 1),
            _ => WorkspaceId(now),
        }
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkspaceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(WorkspaceId)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One turn of a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: text.into(),
        }
    }
}

/// A named conversation container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default)]
    pub history: Vec<Message>,
    /// Set when the name was given explicitly; derived names never replace it
    #[serde(default)]
    pub titled: bool,
}

impl Workspace {
    pub fn new(id: WorkspaceId, name: impl Into<String>, titled: bool) -> Self {
        Self {
            id,
            name: name.into(),
            history: Vec::new(),
            titled,
        }
    }
}

/// All workspaces, ordered by id (and therefore by creation)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workspaces(BTreeMap<WorkspaceId, Workspace>);

impl Workspaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: WorkspaceId) -> Option<&Workspace> {
        self.0.get(&id)
    }

    pub fn get_mut(&mut self, id: WorkspaceId) -> Option<&mut Workspace> {
        self.0.get_mut(&id)
    }

    pub fn contains(&self, id: WorkspaceId) -> bool {
        self.0.contains_key(&id)
    }

    /// Insert a workspace, replacing any entry with the same id
    pub fn insert(&mut self, workspace: Workspace) {
        self.0.insert(workspace.id, workspace);
    }

    pub fn remove(&mut self, id: WorkspaceId) -> Option<Workspace> {
        self.0.remove(&id)
    }

    /// First workspace in iteration order
    pub fn first(&self) -> Option<&Workspace> {
        self.0.values().next()
    }

    pub fn latest_id(&self) -> Option<WorkspaceId> {
        self.0.keys().next_back().copied()
    }

    /// An id not yet used by any workspace
    pub fn fresh_id(&self) -> WorkspaceId {
        WorkspaceId::fresh(self.latest_id())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workspace> {
        self.0.values()
    }
}

impl FromIterator<Workspace> for Workspaces {
    fn from_iter<T: IntoIterator<Item = Workspace>>(iter: T) -> Self {
        Self(iter.into_iter().map(|w| (w.id, w)).collect())
    }
}

/// Name given to a workspace created without a title
pub fn default_name(position: usize) -> String {
    format!("Workspace {position}")
}

/// Derive a display name from a title: the first few words, with an
/// ellipsis marker when the title was longer.
pub fn derive_name(title: &str) -> String {
    let words: Vec<&str> = title.split_whitespace().collect();
    if words.len() > NAME_WORD_LIMIT {
        format!("{}{NAME_ELLIPSIS}", words[..NAME_WORD_LIMIT].join(" "))
    } else {
        words.join(" ")
    }
}
