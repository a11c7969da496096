//! Effects produced by state transitions

use crate::llm::CompletionRequest;
use crate::workspace::WorkspaceId;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace the persisted workspace collection with the current one
    SaveAll,

    /// Persist the active workspace pointer
    SetActive(WorkspaceId),

    /// Remove the persisted active workspace pointer
    ClearActive,

    /// Send a completion request
    RequestCompletion(CompletionRequest),
}
