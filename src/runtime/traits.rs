//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{Database, DbError, KEY_CURRENT_WORKSPACE, KEY_WORKSPACES};
use crate::llm::{CompletionRequest, CompletionResult, LlmError, LlmService};
use crate::workspace::{WorkspaceId, Workspaces};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Persistence failures. Never fatal; the runtime logs them and carries on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What a store hands back at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredState {
    pub workspaces: Workspaces,
    pub active: Option<WorkspaceId>,
}

/// Durable home of the workspace collection and the active pointer
pub trait WorkspaceStore: Send + Sync {
    /// Load everything. Absent or unreadable data yields an empty state.
    fn load(&self) -> StoredState;

    /// Replace the whole persisted collection
    fn save_all(&self, workspaces: &Workspaces) -> Result<(), StoreError>;

    /// Persist the active pointer
    fn set_active(&self, id: WorkspaceId) -> Result<(), StoreError>;

    /// Remove the active pointer
    fn clear_active(&self) -> Result<(), StoreError>;
}

impl<T: WorkspaceStore + ?Sized> WorkspaceStore for Arc<T> {
    fn load(&self) -> StoredState {
        (**self).load()
    }

    fn save_all(&self, workspaces: &Workspaces) -> Result<(), StoreError> {
        (**self).save_all(workspaces)
    }

    fn set_active(&self, id: WorkspaceId) -> Result<(), StoreError> {
        (**self).set_active(id)
    }

    fn clear_active(&self) -> Result<(), StoreError> {
        (**self).clear_active()
    }
}

/// Decode a persisted collection blob, logging and discarding garbage
pub(crate) fn decode_workspaces(raw: &str) -> Workspaces {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Stored workspaces are unreadable, starting empty");
        Workspaces::new()
    })
}

/// Decode a persisted active pointer
pub(crate) fn decode_active(raw: &str) -> Option<WorkspaceId> {
    match raw.parse() {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(error = %e, value = %raw, "Stored active workspace id is unreadable");
            None
        }
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a `WorkspaceStore`
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.db.get(key) {
            Ok(entry) => entry.map(|e| e.value),
            Err(e) => {
                tracing::warn!(error = %e, key, "Failed to read from store");
                None
            }
        }
    }
}

impl WorkspaceStore for DatabaseStore {
    fn load(&self) -> StoredState {
        StoredState {
            workspaces: self
                .read(KEY_WORKSPACES)
                .map(|raw| decode_workspaces(&raw))
                .unwrap_or_default(),
            active: self
                .read(KEY_CURRENT_WORKSPACE)
                .and_then(|raw| decode_active(&raw)),
        }
    }

    fn save_all(&self, workspaces: &Workspaces) -> Result<(), StoreError> {
        // Serialize fully before touching the table
        let blob = serde_json::to_string(workspaces)?;
        self.db.put(KEY_WORKSPACES, &blob)?;
        Ok(())
    }

    fn set_active(&self, id: WorkspaceId) -> Result<(), StoreError> {
        self.db.put(KEY_CURRENT_WORKSPACE, &id.to_string())?;
        Ok(())
    }

    fn clear_active(&self) -> Result<(), StoreError> {
        self.db.remove(KEY_CURRENT_WORKSPACE)?;
        Ok(())
    }
}

/// Completion client used when providers may be missing at startup
pub struct ConfiguredLlm {
    service: Option<Arc<dyn LlmService>>,
}

impl ConfiguredLlm {
    pub fn new(service: Option<Arc<dyn LlmService>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LlmService for ConfiguredLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, LlmError> {
        let service = self
            .service
            .as_ref()
            .ok_or_else(|| LlmError::auth("No completion provider configured"))?;
        service.complete(request).await
    }

    fn model_id(&self) -> &str {
        self.service.as_ref().map_or("none", |s| s.model_id())
    }
}
