//! Chat state types

use crate::workspace::{Message, Workspace, WorkspaceId, Workspaces};
use serde::Serialize;

/// The active workspace's message log, mirrored for rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[allow(dead_code)] // Used in tests
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Replace the log wholesale with the workspace's history (or nothing)
    pub fn switch_to(&mut self, workspace: Option<&Workspace>) {
        self.messages = workspace.map(|w| w.history.clone()).unwrap_or_default();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// Request lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Phase {
    /// Ready for input
    #[default]
    Idle,

    /// A completion request is in flight
    Sending {
        workspace_id: WorkspaceId,
        /// Visible text of the turn, used to name the workspace
        title: String,
        /// The turn started from an empty history
        first_exchange: bool,
    },
}

/// Everything the orchestrator owns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub workspaces: Workspaces,
    pub active: Option<WorkspaceId>,
    pub session: Session,
    pub phase: Phase,
    /// User-facing message from the last failed request
    pub last_error: Option<String>,
}

impl ChatState {
    /// Rebuild state from persisted data. Returns the state and whether a
    /// dangling active pointer had to be cleared.
    pub fn restore(workspaces: Workspaces, active: Option<WorkspaceId>) -> (Self, bool) {
        let dangling = active.is_some_and(|id| !workspaces.contains(id));
        let active = active.filter(|id| workspaces.contains(*id));

        let mut session = Session::default();
        session.switch_to(active.and_then(|id| workspaces.get(id)));

        let state = Self {
            workspaces,
            active,
            session,
            phase: Phase::Idle,
            last_error: None,
        };
        (state, dangling)
    }

    /// The busy flag: true exactly while a request is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Sending { .. })
    }

    pub fn active_workspace(&self) -> Option<&Workspace> {
        self.active.and_then(|id| self.workspaces.get(id))
    }

    /// Append to a workspace's history, and to the session when that
    /// workspace is the one displayed. Returns false if the workspace is gone.
    pub fn append_to(&mut self, id: WorkspaceId, message: Message) -> bool {
        let Some(workspace) = self.workspaces.get_mut(id) else {
            return false;
        };
        workspace.history.push(message.clone());
        if self.active == Some(id) {
            self.session.append(message);
        }
        true
    }

    /// Make `id` the displayed workspace (or none)
    pub fn activate(&mut self, id: Option<WorkspaceId>) {
        self.active = id;
        self.session.switch_to(id.and_then(|id| self.workspaces.get(id)));
    }
}
