//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::transition::*;
use super::*;
use crate::llm::LlmErrorKind;
use crate::workspace::{Role, WorkspaceId};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Driver-level operation. Ids are resolved against the current state so
/// that switches and deletes usually hit a real workspace.
#[derive(Debug, Clone)]
enum Op {
    Submit { input: String, title: Option<String> },
    Succeed(String),
    Fail,
    New(Option<String>),
    Switch(usize),
    Delete(usize),
    Rename(usize, String),
    Unknown,
}

fn arb_error_kind() -> impl Strategy<Value = LlmErrorKind> {
    prop_oneof![
        Just(LlmErrorKind::Network),
        Just(LlmErrorKind::Timeout),
        Just(LlmErrorKind::RateLimit),
        Just(LlmErrorKind::ServerError),
        Just(LlmErrorKind::Auth),
        Just(LlmErrorKind::Unknown),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => ("[a-zA-Z ]{0,30}", proptest::option::of("[a-zA-Z ]{0,20}"))
            .prop_map(|(input, title)| Op::Submit { input, title }),
        3 => "[a-zA-Z *\n]{0,40}".prop_map(Op::Succeed),
        2 => Just(Op::Fail),
        1 => proptest::option::of("[a-zA-Z ]{0,12}").prop_map(Op::New),
        1 => (0usize..8).prop_map(Op::Switch),
        1 => (0usize..8).prop_map(Op::Delete),
        1 => ((0usize..8), "[a-zA-Z ]{0,12}").prop_map(|(i, n)| Op::Rename(i, n)),
        1 => Just(Op::Unknown),
    ]
}

// ============================================================================
// Driver
// ============================================================================

struct Driver {
    state: ChatState,
    next_id: u64,
}

impl Driver {
    fn new() -> Self {
        Self {
            state: ChatState::default(),
            next_id: 1,
        }
    }

    fn pick(&self, index: usize) -> WorkspaceId {
        let ids: Vec<_> = self.state.workspaces.iter().map(|w| w.id).collect();
        if ids.is_empty() {
            WorkspaceId(u64::MAX)
        } else {
            ids[index % ids.len()]
        }
    }

    fn event(&mut self, op: Op, kind: LlmErrorKind) -> Event {
        let fresh_id = WorkspaceId(self.next_id);
        self.next_id += 1;
        match op {
            Op::Submit { input, title } => Event::Submit {
                input,
                title,
                context: "N/A".to_string(),
                fresh_id,
            },
            Op::Succeed(text) => Event::CompletionSucceeded { text },
            Op::Fail => Event::CompletionFailed {
                kind,
                message: "boom".to_string(),
            },
            Op::New(title) => Event::NewWorkspace { title, fresh_id },
            Op::Switch(i) => Event::SwitchWorkspace { id: self.pick(i) },
            Op::Delete(i) => Event::DeleteWorkspace { id: self.pick(i) },
            Op::Rename(i, name) => Event::RenameWorkspace {
                id: self.pick(i),
                name,
            },
            Op::Unknown => Event::SwitchWorkspace {
                id: WorkspaceId(u64::MAX),
            },
        }
    }
}

// ============================================================================
// Invariant Checks
// ============================================================================

fn check_invariants(state: &ChatState) -> Result<(), TestCaseError> {
    // Active pointer is absent or names a stored workspace
    if let Some(id) = state.active {
        prop_assert!(state.workspaces.contains(id), "dangling active {id}");
    }

    // Session mirrors the active workspace's history
    let expected = state
        .active_workspace()
        .map(|w| w.history.clone())
        .unwrap_or_default();
    prop_assert_eq!(state.session.messages().to_vec(), expected);

    // Sending always targets a stored workspace
    if let Phase::Sending { workspace_id, .. } = &state.phase {
        prop_assert!(state.workspaces.contains(*workspace_id));
    }

    // Histories never start with a model turn
    for ws in state.workspaces.iter() {
        if let Some(first) = ws.history.first() {
            prop_assert_eq!(first.role, Role::User);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: Every reachable state is consistent
    #[test]
    fn prop_transitions_preserve_invariants(
        ops in proptest::collection::vec(arb_op(), 0..30),
        kind in arb_error_kind()
    ) {
        let mut driver = Driver::new();
        for op in ops {
            let event = driver.event(op, kind);
            if let Ok(result) = transition(&driver.state, &ChatContext::default(), event) {
                driver.state = result.new_state;
                check_invariants(&driver.state)?;
            }
        }
    }

    // Invariant 2: Any change to stored workspaces is followed by a save
    #[test]
    fn prop_workspace_changes_are_saved(
        ops in proptest::collection::vec(arb_op(), 0..30),
        kind in arb_error_kind()
    ) {
        let mut driver = Driver::new();
        for op in ops {
            let event = driver.event(op, kind);
            if let Ok(result) = transition(&driver.state, &ChatContext::default(), event) {
                if result.new_state.workspaces != driver.state.workspaces {
                    prop_assert!(
                        result.effects.contains(&Effect::SaveAll),
                        "unsaved change, effects: {:?}",
                        result.effects
                    );
                }
                if result.new_state.active != driver.state.active {
                    prop_assert!(result.effects.iter().any(|e| matches!(
                        e,
                        Effect::SetActive(_) | Effect::ClearActive
                    )));
                }
                driver.state = result.new_state;
            }
        }
    }

    // Invariant 3: Empty input never appends and never requests
    #[test]
    fn prop_blank_input_rejected(input in "[ \t\n]{0,10}") {
        let event = Event::Submit {
            input,
            title: Some("title".to_string()),
            context: "N/A".to_string(),
            fresh_id: WorkspaceId(1),
        };
        let result = transition(&ChatState::default(), &ChatContext::default(), event);
        prop_assert!(matches!(result, Err(TransitionError::EmptyMessage)));
    }

    // Invariant 4: A full exchange grows history by exactly two, a failed one by one
    #[test]
    fn prop_exchange_growth(
        input in "[a-zA-Z]{1,10}( [a-zA-Z]{1,10}){0,6}",
        reply in "[a-zA-Z ]{0,30}",
        succeed in any::<bool>(),
        kind in arb_error_kind()
    ) {
        let submit = Event::Submit {
            input,
            title: None,
            context: "N/A".to_string(),
            fresh_id: WorkspaceId(7),
        };
        let sending = transition(&ChatState::default(), &ChatContext::default(), submit).unwrap();
        prop_assert!(sending.new_state.is_busy());
        prop_assert_eq!(sending.new_state.session.len(), 1);

        let outcome = if succeed {
            Event::CompletionSucceeded { text: reply }
        } else {
            Event::CompletionFailed { kind, message: "x".to_string() }
        };
        let done = transition(&sending.new_state, &ChatContext::default(), outcome).unwrap();
        let expected = if succeed { 2 } else { 1 };

        prop_assert!(!done.new_state.is_busy());
        prop_assert_eq!(done.new_state.session.len(), expected);
        prop_assert_eq!(done.new_state.last_error.is_some(), !succeed);
    }

    // Invariant 5: Busy rejects anything that would move the session
    #[test]
    fn prop_busy_rejects_session_changes(op in arb_op(), kind in arb_error_kind()) {
        let mut driver = Driver::new();
        let submit = driver.event(Op::Submit { input: "hi".to_string(), title: None }, kind);
        driver.state = transition(&driver.state, &ChatContext::default(), submit).unwrap().new_state;

        let event = driver.event(op, kind);
        let moves_session = matches!(
            event,
            Event::Submit { .. }
                | Event::NewWorkspace { .. }
                | Event::SwitchWorkspace { .. }
                | Event::DeleteWorkspace { .. }
        );
        let result = transition(&driver.state, &ChatContext::default(), event);
        if moves_session {
            prop_assert!(result.is_err(), "busy state accepted {:?}", result);
        }
    }

    // Invariant 6: Names only change on the first successful exchange or a rename
    #[test]
    fn prop_name_fixed_after_first_exchange(
        turns in proptest::collection::vec("[a-zA-Z]{1,8}( [a-zA-Z]{1,8}){0,6}", 2..6)
    ) {
        let mut driver = Driver::new();
        let mut name_after_first = None;
        for input in turns {
            let submit = driver.event(Op::Submit { input, title: None }, LlmErrorKind::Unknown);
            driver.state = transition(&driver.state, &ChatContext::default(), submit).unwrap().new_state;
            let done = Event::CompletionSucceeded { text: "ok".to_string() };
            driver.state = transition(&driver.state, &ChatContext::default(), done).unwrap().new_state;

            let name = driver.state.active_workspace().map(|w| w.name.clone());
            match &name_after_first {
                None => name_after_first = name,
                Some(first) => prop_assert_eq!(Some(first.clone()), name),
            }
        }
    }
}
