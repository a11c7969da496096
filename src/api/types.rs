//! API request and response types

use crate::render::{render_message, RenderedLine};
use crate::state_machine::ChatState;
use crate::templates::PromptTemplate;
use crate::workspace::{Message, Role, Workspace, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    /// Visible text, when it differs from what is sent
    #[serde(default)]
    pub title: Option<String>,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub workspace_id: WorkspaceId,
    pub reply: String,
}

/// Request to create a workspace
#[derive(Debug, Default, Deserialize)]
pub struct NewWorkspaceRequest {
    #[serde(default)]
    pub title: Option<String>,
}

/// Request to rename a workspace
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// One message with its rendered form
#[derive(Debug, Serialize)]
pub struct RenderedMessage {
    pub role: Role,
    pub text: String,
    pub lines: Vec<RenderedLine>,
}

impl From<&Message> for RenderedMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            text: message.parts.clone(),
            lines: render_message(&message.parts),
        }
    }
}

/// Sidebar entry
#[derive(Debug, Serialize)]
pub struct WorkspaceSummary {
    pub id: WorkspaceId,
    pub name: String,
    pub message_count: usize,
    pub active: bool,
}

/// Full view of the client state
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub workspaces: Vec<WorkspaceSummary>,
    pub active: Option<WorkspaceId>,
    pub busy: bool,
    pub last_error: Option<String>,
    /// The active workspace's transcript
    pub messages: Vec<RenderedMessage>,
}

impl From<&ChatState> for StateResponse {
    fn from(state: &ChatState) -> Self {
        Self {
            workspaces: state
                .workspaces
                .iter()
                .map(|w| WorkspaceSummary {
                    id: w.id,
                    name: w.name.clone(),
                    message_count: w.history.len(),
                    active: state.active == Some(w.id),
                })
                .collect(),
            active: state.active,
            busy: state.is_busy(),
            last_error: state.last_error.clone(),
            messages: state.session.messages().iter().map(RenderedMessage::from).collect(),
        }
    }
}

/// Response with a single workspace
#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
    pub id: WorkspaceId,
    pub name: String,
    pub titled: bool,
    pub messages: Vec<RenderedMessage>,
}

impl From<&Workspace> for WorkspaceResponse {
    fn from(workspace: &Workspace) -> Self {
        Self {
            id: workspace.id,
            name: workspace.name.clone(),
            titled: workspace.titled,
            messages: workspace.history.iter().map(RenderedMessage::from).collect(),
        }
    }
}

/// Response for template list
#[derive(Debug, Serialize)]
pub struct TemplatesResponse {
    pub templates: &'static [PromptTemplate],
}

/// Relay reply
#[derive(Debug, Serialize)]
pub struct RelayResponse {
    pub text: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
