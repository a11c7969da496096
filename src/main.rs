//! alaai - multi-workspace Gemini chat service
//!
//! Hosts the chat runtime behind a small HTTP API, plus the `/gemini`
//! relay for clients that talk to the model through this server.

mod api;
mod config;
mod context;
mod db;
mod llm;
mod render;
mod runtime;
mod state_machine;
mod templates;
mod translate;
mod workspace;

use api::{create_router, AppState};
use axum::http::HeaderValue;
use config::{Config, StoreKind};
use context::{ContextProvider, HttpInstructionSource, InstructionSource, StaticInstructions};
use db::Database;
use runtime::{ChatRuntime, ConfiguredLlm, DatabaseStore, JsonFileStore, WorkspaceStore};
use state_machine::ChatContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alaai=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env();

    // Workspace store
    let store: Arc<dyn WorkspaceStore> = match config.store {
        StoreKind::Sqlite => {
            tracing::info!(path = %config.db_path.display(), "Opening database");
            Arc::new(DatabaseStore::new(Database::open(&config.db_path)?))
        }
        StoreKind::File => {
            tracing::info!(dir = %config.data_dir.display(), "Using file store");
            Arc::new(JsonFileStore::new(&config.data_dir))
        }
    };

    // Completion providers
    let service = llm::build_service(&config.llm)?;
    let relay = llm::build_gemini(&config.llm)?;
    match &service {
        Some(s) => tracing::info!(model = %s.model_id(), "Completion provider initialized"),
        None => tracing::warn!("No completion provider configured. Set GOOGLE_API_KEY or ALAAI_RELAY_URL."),
    }

    // Instruction context
    let instructions: Arc<dyn InstructionSource> = match &config.context_url {
        Some(url) => Arc::new(HttpInstructionSource::new(url.clone())?),
        None => Arc::new(StaticInstructions::default()),
    };

    let context = ChatContext {
        target_language: config.target_language.clone(),
    };
    let runtime = ChatRuntime::new(
        context,
        store,
        ConfiguredLlm::new(service),
        ContextProvider::new(instructions),
    )
    .with_request_timeout(config.request_timeout);

    let state = AppState::new(runtime, relay);

    // Create router
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("alaai server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
