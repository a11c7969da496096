//! HTTP API for alaai
//!
//! The browser client drives the chat runtime through these routes; the
//! `/gemini` relay serves clients that cannot hold an API key.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::llm::LlmService;
use crate::runtime::ProductionRuntime;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ProductionRuntime>,
    /// Direct Gemini access for the relay route
    pub relay: Option<Arc<dyn LlmService>>,
}

impl AppState {
    pub fn new(runtime: ProductionRuntime, relay: Option<Arc<dyn LlmService>>) -> Self {
        Self {
            runtime: Arc::new(runtime),
            relay,
        }
    }
}
