//! Events that drive the chat state machine

use crate::llm::LlmErrorKind;
use crate::workspace::WorkspaceId;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Submit {
        /// Raw input; the detailed prompt for template flows
        input: String,
        /// Visible text, when it differs from the input
        title: Option<String>,
        /// Instruction context for the first turn
        context: String,
        /// Id to use if a workspace has to be created
        fresh_id: WorkspaceId,
    },
    NewWorkspace {
        title: Option<String>,
        fresh_id: WorkspaceId,
    },
    SwitchWorkspace {
        id: WorkspaceId,
    },
    DeleteWorkspace {
        id: WorkspaceId,
    },
    RenameWorkspace {
        id: WorkspaceId,
        name: String,
    },

    // Completion events
    CompletionSucceeded {
        text: String,
    },
    CompletionFailed {
        kind: LlmErrorKind,
        message: String,
    },
}
