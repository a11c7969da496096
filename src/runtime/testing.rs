//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::llm::{CompletionRequest, CompletionResult, LlmError, LlmService};
use crate::workspace::{WorkspaceId, Workspaces};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock LLM
// ============================================================================

/// Mock completion service that returns queued responses
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<CompletionResult, LlmError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<CompletionRequest>>,
}

#[allow(dead_code)]
impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_response(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(CompletionResult::new(text)));
    }

    /// Queue an error
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &CompletionRequest) -> Result<CompletionResult, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, LlmError> {
        self.next(request)
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Delayed Mock LLM (for concurrency testing)
// ============================================================================

/// Mock completion service with a configurable delay
pub struct DelayedMockLlm {
    inner: MockLlm,
    delay: Duration,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockLlm {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockLlm::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_response(&self, text: impl Into<String>) {
        self.inner.queue_response(text);
    }

    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl LlmService for DelayedMockLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, LlmError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        // notify_one stores a permit, so a late waiter still wakes
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "delayed-mock"
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// A write seen by the memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    SaveAll { count: usize },
    SetActive(WorkspaceId),
    ClearActive,
}

/// In-memory store for testing
pub struct MemoryStore {
    state: Mutex<StoredState>,
    writes: Mutex<Vec<StoreWrite>>,
    fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::with_state(StoredState::default())
    }

    pub fn with_state(state: StoredState) -> Self {
        Self {
            state: Mutex::new(state),
            writes: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// What a fresh `load` would see
    pub fn stored(&self) -> StoredState {
        self.state.lock().unwrap().clone()
    }

    pub fn recorded_writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(io::Error::other("disk full").into())
        } else {
            Ok(())
        }
    }
}

impl WorkspaceStore for MemoryStore {
    fn load(&self) -> StoredState {
        self.stored()
    }

    fn save_all(&self, workspaces: &Workspaces) -> Result<(), StoreError> {
        self.check()?;
        self.writes.lock().unwrap().push(StoreWrite::SaveAll {
            count: workspaces.len(),
        });
        self.state.lock().unwrap().workspaces = workspaces.clone();
        Ok(())
    }

    fn set_active(&self, id: WorkspaceId) -> Result<(), StoreError> {
        self.check()?;
        self.writes.lock().unwrap().push(StoreWrite::SetActive(id));
        self.state.lock().unwrap().active = Some(id);
        Ok(())
    }

    fn clear_active(&self) -> Result<(), StoreError> {
        self.check()?;
        self.writes.lock().unwrap().push(StoreWrite::ClearActive);
        self.state.lock().unwrap().active = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextProvider, Instructions, StaticInstructions};
    use crate::llm::LlmErrorKind;
    use crate::runtime::{ChatError, ChatRuntime};
    use crate::state_machine::{ChatContext, TransitionError, REQUEST_FAILED_MESSAGE};
    use crate::templates;
    use crate::context::{ContextError, InstructionSource};
    use crate::workspace::{Message, Role, Workspace};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    type TestRuntime<L> = ChatRuntime<Arc<MemoryStore>, Arc<L>, StaticInstructions>;

    fn build<L: LlmService + 'static>(store: Arc<MemoryStore>, llm: Arc<L>) -> Arc<TestRuntime<L>> {
        let instructions = StaticInstructions(Instructions::from_values(["Be concise"]));
        Arc::new(ChatRuntime::new(
            ChatContext::default(),
            store,
            llm,
            ContextProvider::new(instructions),
        ))
    }

    #[tokio::test]
    async fn test_mock_llm() {
        let mock = MockLlm::new();
        mock.queue_response("Hello");

        let request = CompletionRequest {
            history: vec![],
            message: "Hi".to_string(),
            context: String::new(),
        };
        assert_eq!(mock.complete(&request).await.unwrap().text, "Hello");

        // Second call should fail (no more responses)
        assert!(mock.complete(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_first_submit_on_empty_store() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(MockLlm::new());
        llm.queue_response("Hi there!");
        let runtime = build(store.clone(), llm.clone());

        let reply = runtime.submit("Hello", None).await.unwrap();
        assert_eq!(reply.reply, "Hi there!");

        let state = runtime.snapshot();
        let ws = state.active_workspace().unwrap();
        assert_eq!(ws.id, reply.workspace_id);
        assert_eq!(ws.name, "Hello");
        assert_eq!(ws.history, vec![Message::user("Hello"), Message::model("Hi there!")]);
        assert!(!state.is_busy());

        // Persisted: the user turn before the request, the full exchange after
        let stored = store.stored();
        assert_eq!(stored.active, Some(reply.workspace_id));
        assert_eq!(stored.workspaces, state.workspaces);

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].message,
            "Here is some context to help you: Instructions: 1. Be concise\n\nHello"
        );
        assert_eq!(requests[0].history, vec![Message::user("Hello")]);
    }

    #[tokio::test]
    async fn test_follow_up_is_sent_verbatim() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(MockLlm::new());
        llm.queue_response("First");
        llm.queue_response("Second");
        let runtime = build(store, llm.clone());

        runtime.submit("Plan my launch week", None).await.unwrap();
        runtime.submit("Make it shorter", None).await.unwrap();

        let requests = llm.recorded_requests();
        assert_eq!(requests[1].message, "Make it shorter");
        assert_eq!(requests[1].history.len(), 3);

        let state = runtime.snapshot();
        assert_eq!(state.session.len(), 4);
        assert_eq!(state.active_workspace().unwrap().name, "Plan my launch week");
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_user_turn() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(MockLlm::new());
        llm.queue_error(LlmError::server_error("upstream 503"));
        let runtime = build(store.clone(), llm);

        let err = runtime.submit("Hello", None).await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(ref e) if e.kind == LlmErrorKind::ServerError));

        let state = runtime.snapshot();
        assert!(!state.is_busy());
        assert_eq!(state.session.messages(), &[Message::user("Hello")]);
        assert_eq!(state.last_error.as_deref(), Some(REQUEST_FAILED_MESSAGE));
        assert_eq!(state.active_workspace().unwrap().name, "Workspace 1");
        assert_eq!(store.stored().workspaces.iter().next().unwrap().history.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_without_request() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(MockLlm::new());
        let runtime = build(store.clone(), llm.clone());

        let err = runtime.submit("   ", None).await.unwrap_err();
        assert!(matches!(err, ChatError::Rejected(TransitionError::EmptyMessage)));
        assert!(llm.recorded_requests().is_empty());
        assert!(store.recorded_writes().is_empty());
        assert!(runtime.snapshot().workspaces.is_empty());
    }

    #[tokio::test]
    async fn test_single_flight() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(DelayedMockLlm::new(Duration::from_millis(200)));
        llm.queue_response("slow reply");
        let runtime = build(store, llm.clone());

        let first = {
            let runtime = runtime.clone();
            tokio::spawn(async move { runtime.submit("Hello", None).await })
        };
        llm.request_started.notified().await;
        assert!(runtime.snapshot().is_busy());

        let second = runtime.submit("Again", None).await;
        assert!(matches!(second, Err(ChatError::Rejected(TransitionError::Busy))));

        let active = runtime.snapshot().active.unwrap();
        assert!(matches!(
            runtime.switch_workspace(active),
            Err(ChatError::Rejected(TransitionError::Busy))
        ));
        assert!(matches!(
            runtime.delete_workspace(active),
            Err(ChatError::Rejected(TransitionError::Busy))
        ));
        assert!(matches!(
            runtime.new_workspace(None),
            Err(ChatError::Rejected(TransitionError::Busy))
        ));
        // Renaming does not touch the session
        runtime.rename_workspace(active, "Renamed").unwrap();

        first.await.unwrap().unwrap();
        assert_eq!(llm.recorded_requests().len(), 1);
        let state = runtime.snapshot();
        assert!(!state.is_busy());
        assert_eq!(state.session.len(), 2);
        assert_eq!(state.active_workspace().unwrap().name, "Renamed");
    }

    #[tokio::test]
    async fn test_dropped_caller_still_finishes_exchange() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(DelayedMockLlm::new(Duration::from_millis(50)));
        llm.queue_response("done");
        let runtime = build(store.clone(), llm.clone());

        let caller = {
            let runtime = runtime.clone();
            tokio::spawn(async move { runtime.submit("Hello", None).await })
        };
        llm.request_started.notified().await;
        caller.abort();

        tokio::time::sleep(Duration::from_millis(300)).await;
        let state = runtime.snapshot();
        assert!(!state.is_busy());
        assert_eq!(state.session.len(), 2);
        assert_eq!(store.stored().workspaces, state.workspaces);
    }

    #[tokio::test]
    async fn test_timeout_resolves_to_failure() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(DelayedMockLlm::new(Duration::from_secs(5)));
        llm.queue_response("too late");
        let runtime = Arc::new(
            ChatRuntime::new(
                ChatContext::default(),
                store,
                llm,
                ContextProvider::new(StaticInstructions::default()),
            )
            .with_request_timeout(Duration::from_millis(50)),
        );

        let err = runtime.submit("Hello", None).await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(ref e) if e.kind == LlmErrorKind::Timeout));
        assert!(!runtime.snapshot().is_busy());
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_fail_submit() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let llm = Arc::new(MockLlm::new());
        llm.queue_response("still here");
        let runtime = build(store.clone(), llm);

        let reply = runtime.submit("Hello", None).await.unwrap();
        assert_eq!(reply.reply, "still here");
        assert_eq!(runtime.snapshot().session.len(), 2);
        assert!(store.stored().workspaces.is_empty());
    }

    #[tokio::test]
    async fn test_restore_clears_dangling_pointer() {
        let workspaces: Workspaces = [Workspace::new(WorkspaceId(1), "One", false)]
            .into_iter()
            .collect();
        let store = Arc::new(MemoryStore::with_state(StoredState {
            workspaces,
            active: Some(WorkspaceId(99)),
        }));
        let runtime = build(store.clone(), Arc::new(MockLlm::new()));

        assert_eq!(runtime.snapshot().active, None);
        assert_eq!(store.stored().active, None);
        assert_eq!(store.recorded_writes(), vec![StoreWrite::ClearActive]);
    }

    #[tokio::test]
    async fn test_restore_loads_active_history() {
        let mut ws = Workspace::new(WorkspaceId(1), "One", false);
        ws.history.push(Message::user("Hi"));
        ws.history.push(Message::model("Hello"));
        let store = Arc::new(MemoryStore::with_state(StoredState {
            workspaces: [ws].into_iter().collect(),
            active: Some(WorkspaceId(1)),
        }));
        let llm = Arc::new(MockLlm::new());
        llm.queue_response("ok");
        let runtime = build(store, llm.clone());

        assert_eq!(runtime.snapshot().session.len(), 2);

        // Not the first exchange: no context prefix, no rename
        runtime.submit("More please", None).await.unwrap();
        assert_eq!(llm.recorded_requests()[0].message, "More please");
        assert_eq!(runtime.snapshot().active_workspace().unwrap().name, "One");
    }

    #[tokio::test]
    async fn test_workspace_lifecycle_is_persisted() {
        let store = Arc::new(MemoryStore::new());
        let runtime = build(store.clone(), Arc::new(MockLlm::new()));

        let a = runtime.new_workspace(None).unwrap();
        let b = runtime.new_workspace(Some("Q3 campaign")).unwrap();
        assert!(a < b);
        assert_eq!(store.stored().active, Some(b));

        runtime.switch_workspace(a).unwrap();
        assert_eq!(store.stored().active, Some(a));

        runtime.delete_workspace(a).unwrap();
        assert_eq!(runtime.snapshot().active, Some(b));
        assert_eq!(store.stored().active, Some(b));

        runtime.delete_workspace(b).unwrap();
        assert_eq!(runtime.snapshot().active, None);
        assert_eq!(store.stored(), StoredState::default());

        assert!(matches!(
            runtime.switch_workspace(a),
            Err(ChatError::Rejected(TransitionError::UnknownWorkspace(_)))
        ));
    }

    #[tokio::test]
    async fn test_template_submit_shows_title() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(MockLlm::new());
        llm.queue_response("Variation one...");
        let runtime = build(store, llm.clone());

        let template = templates::find("ad-copy").unwrap();
        runtime.submit_template(template).await.unwrap();

        let state = runtime.snapshot();
        let first = &state.session.messages()[0];
        assert_eq!(first.role, Role::User);
        assert_eq!(first.parts, template.title);
        assert_eq!(state.active_workspace().unwrap().name, "Create persuasive ad copy...");
        assert!(llm.recorded_requests()[0].message.ends_with(template.prompt));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_back_to_back_submits_get_their_own_replies() {
        const ROUNDS: usize = 20;
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(MockLlm::new());
        for i in 0..ROUNDS * 2 {
            llm.queue_response(format!("reply {i}"));
        }
        let runtime = build(store, llm);

        let sender = |name: &'static str| {
            let runtime = runtime.clone();
            tokio::spawn(async move {
                let mut replies = Vec::new();
                for round in 0..ROUNDS {
                    let input = format!("{name} question {round}");
                    let reply = loop {
                        match runtime.submit(&input, None).await {
                            Err(ChatError::Rejected(TransitionError::Busy)) => {
                                tokio::task::yield_now().await;
                            }
                            other => break other.unwrap(),
                        }
                    };
                    replies.push(reply.reply);
                }
                replies
            })
        };
        let a = sender("a");
        let b = sender("b");

        for reply in a.await.unwrap().into_iter().chain(b.await.unwrap()) {
            assert!(reply.starts_with("reply "), "got a user turn back: {reply}");
        }
        let state = runtime.snapshot();
        assert_eq!(state.session.len(), ROUNDS * 4);
    }

    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl InstructionSource for CountingSource {
        async fn fetch(&self) -> Result<Instructions, ContextError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            // Never cached, so every call would reach the source
            Err(ContextError::Status(503))
        }
    }

    #[tokio::test]
    async fn test_busy_submit_skips_instruction_fetch() {
        let llm = Arc::new(DelayedMockLlm::new(Duration::from_millis(200)));
        llm.queue_response("slow reply");
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
        });
        let runtime = Arc::new(ChatRuntime::new(
            ChatContext::default(),
            Arc::new(MemoryStore::new()),
            llm.clone(),
            ContextProvider::new(source.clone()),
        ));

        let first = {
            let runtime = runtime.clone();
            tokio::spawn(async move { runtime.submit("Hello", None).await })
        };
        llm.request_started.notified().await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        let second = runtime.submit("Again", None).await;
        assert!(matches!(second, Err(ChatError::Rejected(TransitionError::Busy))));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        first.await.unwrap().unwrap();
    }
}
