//! Chat runtime executor
//!
//! Owns the chat state, feeds events through the pure transition function
//! and executes the resulting effects.

use super::traits::WorkspaceStore;
use crate::context::{ContextProvider, InstructionSource};
use crate::llm::{CompletionRequest, LlmError, LlmService};
use crate::state_machine::{
    transition, ChatContext, ChatState, Effect, Event, Phase, TransitionError,
};
use crate::templates::PromptTemplate;
use crate::workspace::WorkspaceId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Default upper bound on a single completion call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A completion request with the workspace it belongs to
type PendingCompletion = Option<(WorkspaceId, CompletionRequest)>;

/// Errors surfaced at the runtime boundary
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Completion failed: {0}")]
    Transport(#[from] LlmError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReply {
    pub workspace_id: WorkspaceId,
    /// The model turn as stored (after translation)
    pub reply: String,
}

/// Generic chat runtime that can work with any store, LLM and instruction source
pub struct ChatRuntime<S, L, I>
where
    S: WorkspaceStore + 'static,
    L: LlmService + 'static,
    I: InstructionSource + 'static,
{
    context: ChatContext,
    state: Mutex<ChatState>,
    store: S,
    llm: L,
    instructions: ContextProvider<I>,
    request_timeout: Duration,
}

impl<S, L, I> ChatRuntime<S, L, I>
where
    S: WorkspaceStore + 'static,
    L: LlmService + 'static,
    I: InstructionSource + 'static,
{
    /// Restore persisted state and build the runtime
    pub fn new(context: ChatContext, store: S, llm: L, instructions: ContextProvider<I>) -> Self {
        let stored = store.load();
        let (state, dangling) = ChatState::restore(stored.workspaces, stored.active);

        if dangling {
            tracing::warn!(
                active = ?stored.active,
                "Active workspace no longer exists, clearing pointer"
            );
            if let Err(e) = store.clear_active() {
                tracing::warn!(error = %e, "Failed to clear dangling active workspace");
            }
        }

        tracing::info!(
            workspaces = state.workspaces.len(),
            active = ?state.active,
            model = %llm.model_id(),
            "Chat runtime restored"
        );

        Self {
            context,
            state: Mutex::new(state),
            store,
            llm,
            instructions,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Upper bound applied to every completion call
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> ChatState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one event through the state machine. Persistence effects run
    /// under the state lock so writes land in transition order. A
    /// completion request is handed back with its target workspace.
    fn dispatch(
        &self,
        make_event: impl FnOnce(&ChatState) -> Event,
    ) -> Result<PendingCompletion, TransitionError> {
        self.apply(make_event).map(|(_, request)| request)
    }

    /// Like `dispatch`, but keeps the lock so the caller reads exactly the
    /// state this event produced
    fn apply(
        &self,
        make_event: impl FnOnce(&ChatState) -> Event,
    ) -> Result<(MutexGuard<'_, ChatState>, PendingCompletion), TransitionError> {
        let mut state = self.lock();
        let event = make_event(&state);
        let result = transition(&state, &self.context, event)?;
        *state = result.new_state;

        let mut request = None;
        for effect in result.effects {
            match effect {
                Effect::SaveAll => {
                    if let Err(e) = self.store.save_all(&state.workspaces) {
                        tracing::warn!(error = %e, "Failed to persist workspaces");
                    }
                }
                Effect::SetActive(id) => {
                    if let Err(e) = self.store.set_active(id) {
                        tracing::warn!(error = %e, workspace_id = %id, "Failed to persist active workspace");
                    }
                }
                Effect::ClearActive => {
                    if let Err(e) = self.store.clear_active() {
                        tracing::warn!(error = %e, "Failed to clear active workspace");
                    }
                }
                Effect::RequestCompletion(req) => {
                    if let Phase::Sending { workspace_id, .. } = &state.phase {
                        request = Some((*workspace_id, req));
                    }
                }
            }
        }
        Ok((state, request))
    }

    // ==================== Submission ====================

    /// Send a user turn and wait for the model's reply
    pub async fn submit(
        self: &Arc<Self>,
        input: &str,
        title: Option<&str>,
    ) -> Result<SubmitReply, ChatError> {
        if input.trim().is_empty() {
            return Err(TransitionError::EmptyMessage.into());
        }
        // No instruction fetch for a submit that will be turned away
        let busy = self.lock().is_busy();
        if busy {
            return Err(TransitionError::Busy.into());
        }
        let context = self.instructions.context().await;

        let request = self.dispatch(|state| {
            let fresh_id = state.workspaces.fresh_id();
            Event::Submit {
                input: input.to_string(),
                title: title.map(str::to_string),
                context,
                fresh_id,
            }
        })?;
        let Some((workspace_id, request)) = request else {
            return Err(ChatError::Internal("submit produced no completion request".to_string()));
        };

        tracing::info!(
            workspace_id = %workspace_id,
            history_len = request.history.len(),
            "Submitting chat turn"
        );

        // The exchange finishes even if the caller goes away
        let runtime = Arc::clone(self);
        tokio::spawn(async move { runtime.complete(workspace_id, request).await })
            .await
            .map_err(|e| ChatError::Internal(format!("completion task failed: {e}")))?
    }

    /// Submit a prompt template: the detailed prompt is sent, the short
    /// title is what the transcript shows
    pub async fn submit_template(
        self: &Arc<Self>,
        template: &PromptTemplate,
    ) -> Result<SubmitReply, ChatError> {
        self.submit(template.prompt, Some(template.title)).await
    }

    async fn complete(
        &self,
        workspace_id: WorkspaceId,
        request: CompletionRequest,
    ) -> Result<SubmitReply, ChatError> {
        let outcome = match tokio::time::timeout(self.request_timeout, self.llm.complete(&request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::timeout(format!(
                "No reply within {}s",
                self.request_timeout.as_secs()
            ))),
        };

        match outcome {
            Ok(result) => {
                // Read the model turn before the lock drops; the next
                // submit may append to this workspace right after
                let (state, _) = self.apply(|_| Event::CompletionSucceeded { text: result.text })?;
                let reply = state
                    .workspaces
                    .get(workspace_id)
                    .and_then(|w| w.history.last())
                    .map(|m| m.parts.clone())
                    .unwrap_or_default();
                drop(state);
                Ok(SubmitReply {
                    workspace_id,
                    reply,
                })
            }
            Err(error) => {
                tracing::warn!(
                    workspace_id = %workspace_id,
                    error = %error.message,
                    kind = error.kind.as_str(),
                    "Completion failed"
                );
                self.dispatch(|_| Event::CompletionFailed {
                    kind: error.kind,
                    message: error.message.clone(),
                })?;
                Err(ChatError::Transport(error))
            }
        }
    }

    // ==================== Workspace Management ====================

    /// Create an empty workspace and make it active
    pub fn new_workspace(&self, title: Option<&str>) -> Result<WorkspaceId, ChatError> {
        let mut created = WorkspaceId(0);
        self.dispatch(|state| {
            created = state.workspaces.fresh_id();
            Event::NewWorkspace {
                title: title.map(str::to_string),
                fresh_id: created,
            }
        })?;
        tracing::info!(workspace_id = %created, "Created workspace");
        Ok(created)
    }

    pub fn switch_workspace(&self, id: WorkspaceId) -> Result<(), ChatError> {
        self.dispatch(|_| Event::SwitchWorkspace { id })?;
        tracing::debug!(workspace_id = %id, "Switched workspace");
        Ok(())
    }

    pub fn delete_workspace(&self, id: WorkspaceId) -> Result<(), ChatError> {
        self.dispatch(|_| Event::DeleteWorkspace { id })?;
        tracing::info!(workspace_id = %id, "Deleted workspace");
        Ok(())
    }

    pub fn rename_workspace(&self, id: WorkspaceId, name: &str) -> Result<(), ChatError> {
        self.dispatch(|_| Event::RenameWorkspace {
            id,
            name: name.to_string(),
        })?;
        Ok(())
    }
}
