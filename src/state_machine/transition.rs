//! Pure state transition function
//!
//! Given the same state, context and event, `transition` always produces
//! the same new state and effects. All I/O happens in the runtime.

use super::state::{ChatState, Phase};
use super::{Effect, Event};
use crate::context::with_context;
use crate::llm::CompletionRequest;
use crate::translate::translate;
use crate::workspace::{default_name, derive_name, Message, Workspace, WorkspaceId};
use thiserror::Error;

/// Shown to the user when a completion request fails
pub const REQUEST_FAILED_MESSAGE: &str =
    "An error occurred while processing your request. Please try again.";

/// Immutable configuration for transitions
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    /// When set, model replies pass through the translation hook
    pub target_language: Option<String>,
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Error! Please ask a question")]
    EmptyMessage,
    #[error("Workspace name cannot be empty")]
    EmptyName,
    #[error("A request is already in flight, wait for it to finish")]
    Busy,
    #[error("Workspace not found: {0}")]
    UnknownWorkspace(WorkspaceId),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ChatState,
    context: &ChatContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&state.phase, event) {
        // ============================================================
        // Submission
        // ============================================================
        (
            Phase::Idle,
            Event::Submit {
                input,
                title,
                context: instructions,
                fresh_id,
            },
        ) => {
            if input.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }

            let mut next = state.clone();
            let mut effects = Vec::new();

            let workspace_id = match next.active.filter(|id| next.workspaces.contains(*id)) {
                Some(id) => id,
                None => {
                    create_workspace(&mut next, fresh_id, None);
                    effects.push(Effect::SetActive(fresh_id));
                    fresh_id
                }
            };

            let first_exchange = next.session.is_empty();
            let outbound = if first_exchange {
                with_context(&instructions, &input)
            } else {
                input.clone()
            };
            let visible = title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(input);

            next.append_to(workspace_id, Message::user(visible.clone()));
            next.last_error = None;
            next.phase = Phase::Sending {
                workspace_id,
                title: visible,
                first_exchange,
            };

            let request = CompletionRequest {
                history: next.session.messages().to_vec(),
                message: outbound,
                context: instructions,
            };

            Ok(TransitionResult::new(next)
                .with_effect(Effect::SaveAll)
                .with_effects(effects)
                .with_effect(Effect::RequestCompletion(request)))
        }

        (Phase::Sending { .. }, Event::Submit { .. }) => Err(TransitionError::Busy),

        // ============================================================
        // Completion outcomes
        // ============================================================
        (
            Phase::Sending {
                workspace_id,
                title,
                first_exchange,
            },
            Event::CompletionSucceeded { text },
        ) => {
            let mut next = state.clone();
            let reply = translate(&text, context.target_language.as_deref());

            // A reply whose workspace is gone is dropped
            if next.append_to(*workspace_id, Message::model(reply)) && *first_exchange {
                if let Some(workspace) = next.workspaces.get_mut(*workspace_id) {
                    if !workspace.titled {
                        workspace.name = derive_name(title);
                    }
                }
            }
            next.phase = Phase::Idle;

            Ok(TransitionResult::new(next).with_effect(Effect::SaveAll))
        }

        (Phase::Sending { .. }, Event::CompletionFailed { .. }) => {
            let mut next = state.clone();
            next.phase = Phase::Idle;
            next.last_error = Some(REQUEST_FAILED_MESSAGE.to_string());
            Ok(TransitionResult::new(next))
        }

        (Phase::Idle, Event::CompletionSucceeded { .. } | Event::CompletionFailed { .. }) => Err(
            TransitionError::InvalidTransition("completion outcome with no request in flight".to_string()),
        ),

        // ============================================================
        // Workspace management (blocked while sending)
        // ============================================================
        (
            Phase::Sending { .. },
            Event::NewWorkspace { .. } | Event::SwitchWorkspace { .. } | Event::DeleteWorkspace { .. },
        ) => Err(TransitionError::Busy),

        (Phase::Idle, Event::NewWorkspace { title, fresh_id }) => {
            let mut next = state.clone();
            create_workspace(&mut next, fresh_id, title);
            next.last_error = None;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::SaveAll)
                .with_effect(Effect::SetActive(fresh_id)))
        }

        (Phase::Idle, Event::SwitchWorkspace { id }) => {
            if !state.workspaces.contains(id) {
                return Err(TransitionError::UnknownWorkspace(id));
            }
            let mut next = state.clone();
            next.activate(Some(id));
            next.last_error = None;
            Ok(TransitionResult::new(next).with_effect(Effect::SetActive(id)))
        }

        (Phase::Idle, Event::DeleteWorkspace { id }) => {
            if !state.workspaces.contains(id) {
                return Err(TransitionError::UnknownWorkspace(id));
            }
            let mut next = state.clone();
            next.workspaces.remove(id);
            let mut result = TransitionResult::new(next).with_effect(Effect::SaveAll);

            if state.active == Some(id) {
                let fallback = result.new_state.workspaces.first().map(|w| w.id);
                result.new_state.activate(fallback);
                result = result.with_effect(match fallback {
                    Some(next_id) => Effect::SetActive(next_id),
                    None => Effect::ClearActive,
                });
            }
            Ok(result)
        }

        // Renaming never touches the session, so it is allowed mid-request
        (_, Event::RenameWorkspace { id, name }) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(TransitionError::EmptyName);
            }
            let mut next = state.clone();
            let workspace = next
                .workspaces
                .get_mut(id)
                .ok_or(TransitionError::UnknownWorkspace(id))?;
            workspace.name = name.to_string();
            workspace.titled = true;
            Ok(TransitionResult::new(next).with_effect(Effect::SaveAll))
        }
    }
}

/// Insert a new empty workspace and make it active
fn create_workspace(state: &mut ChatState, id: WorkspaceId, title: Option<String>) {
    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let workspace = match title {
        Some(title) => Workspace::new(id, title, true),
        None => Workspace::new(id, default_name(state.workspaces.len() + 1), false),
    };
    state.workspaces.insert(workspace);
    state.activate(Some(id));
}
