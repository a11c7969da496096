//! HTTP request handlers

use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, NewWorkspaceRequest, RelayResponse, RenameRequest,
    StateResponse, TemplatesResponse, WorkspaceResponse,
};
use super::AppState;
use crate::llm::{CompletionRequest, LlmError, LlmService};
use crate::runtime::ChatError;
use crate::state_machine::{TransitionError, REQUEST_FAILED_MESSAGE};
use crate::templates::{self, TEMPLATES};
use crate::workspace::WorkspaceId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Body of a failed relay call
const RELAY_FAILED_MESSAGE: &str = "An error occurred while processing your request";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Client state
        .route("/api/state", get(get_state))
        .route("/api/workspaces/:id", get(get_workspace))
        // Workspace management
        .route("/api/workspaces/new", post(new_workspace))
        .route("/api/workspaces/:id/activate", post(activate_workspace))
        .route("/api/workspaces/:id/delete", post(delete_workspace))
        .route("/api/workspaces/:id/rename", post(rename_workspace))
        // Chat
        .route("/api/chat", post(send_chat))
        .route("/api/templates", get(list_templates))
        .route("/api/templates/:id", post(submit_template))
        // Completion relay
        .route("/gemini", post(relay))
        .route("/api/gemini", post(relay))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// State
// ============================================================

async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse::from(&state.runtime.snapshot()))
}

async fn get_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let id = parse_id(&id)?;
    let snapshot = state.runtime.snapshot();
    let workspace = snapshot
        .workspaces
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Workspace not found: {id}")))?;
    Ok(Json(WorkspaceResponse::from(workspace)))
}

// ============================================================
// Workspace Management
// ============================================================

async fn new_workspace(
    State(state): State<AppState>,
    body: Option<Json<NewWorkspaceRequest>>,
) -> Result<Json<StateResponse>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    state.runtime.new_workspace(req.title.as_deref())?;
    Ok(Json(StateResponse::from(&state.runtime.snapshot())))
}

async fn activate_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StateResponse>, AppError> {
    state.runtime.switch_workspace(parse_id(&id)?)?;
    Ok(Json(StateResponse::from(&state.runtime.snapshot())))
}

async fn delete_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StateResponse>, AppError> {
    state.runtime.delete_workspace(parse_id(&id)?)?;
    Ok(Json(StateResponse::from(&state.runtime.snapshot())))
}

async fn rename_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<StateResponse>, AppError> {
    state.runtime.rename_workspace(parse_id(&id)?, &req.name)?;
    Ok(Json(StateResponse::from(&state.runtime.snapshot())))
}

fn parse_id(raw: &str) -> Result<WorkspaceId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid workspace id: {raw}")))
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let reply = state
        .runtime
        .submit(&req.text, req.title.as_deref())
        .await?;
    Ok(Json(ChatResponse {
        workspace_id: reply.workspace_id,
        reply: reply.reply,
    }))
}

async fn list_templates() -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        templates: TEMPLATES,
    })
}

async fn submit_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatResponse>, AppError> {
    let template = templates::find(&id)
        .ok_or_else(|| AppError::NotFound(format!("Template not found: {id}")))?;
    let reply = state.runtime.submit_template(template).await?;
    Ok(Json(ChatResponse {
        workspace_id: reply.workspace_id,
        reply: reply.reply,
    }))
}

// ============================================================
// Relay
// ============================================================

async fn relay(
    State(state): State<AppState>,
    Json(req): Json<CompletionRequest>,
) -> Result<Json<RelayResponse>, AppError> {
    let Some(service) = &state.relay else {
        tracing::error!("Relay called but GOOGLE_API_KEY is not set");
        return Err(AppError::Internal(RELAY_FAILED_MESSAGE.to_string()));
    };

    let timeout = state.runtime.request_timeout();
    let outcome = match tokio::time::timeout(timeout, service.complete(&req)).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::timeout(format!(
            "No reply within {}s",
            timeout.as_secs()
        ))),
    };

    match outcome {
        Ok(result) => Ok(Json(RelayResponse { text: result.text })),
        Err(e) => {
            tracing::error!(error = %e.message, kind = e.kind.as_str(), "Relay completion failed");
            Err(AppError::Internal(RELAY_FAILED_MESSAGE.to_string()))
        }
    }
}

async fn get_version() -> &'static str {
    concat!("alaai ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::Rejected(e) => match e {
                TransitionError::EmptyMessage | TransitionError::EmptyName => {
                    AppError::BadRequest(e.to_string())
                }
                TransitionError::UnknownWorkspace(_) => AppError::NotFound(e.to_string()),
                TransitionError::Busy | TransitionError::InvalidTransition(_) => {
                    AppError::Conflict(e.to_string())
                }
            },
            // Transport details stay in the logs
            ChatError::Transport(_) => AppError::BadGateway(REQUEST_FAILED_MESSAGE.to_string()),
            ChatError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
