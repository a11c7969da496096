//! Completion provider selection

use super::{GeminiService, LlmError, LlmService, LoggingService, RelayService, DEFAULT_GEMINI_MODEL};
use std::sync::Arc;

/// Configuration for completion providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub google_api_key: Option<String>,
    pub gemini_model: Option<String>,
    /// Override for the Gemini API base URL
    pub gemini_base_url: Option<String>,
    /// When set, completions go through this relay instead of Gemini directly
    pub relay_url: Option<String>,
}

impl LlmConfig {
    /// Read provider settings through a key lookup that already drops
    /// empty values
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            google_api_key: get("GOOGLE_API_KEY"),
            gemini_model: get("GEMINI_MODEL"),
            gemini_base_url: get("GEMINI_BASE_URL"),
            relay_url: get("ALAAI_RELAY_URL"),
        }
    }

    pub fn model(&self) -> &str {
        self.gemini_model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }
}

/// Build the completion service: the relay if configured, otherwise Gemini
/// when an API key is present. `None` means no provider is available.
pub fn build_service(config: &LlmConfig) -> Result<Option<Arc<dyn LlmService>>, LlmError> {
    let service: Arc<dyn LlmService> = if let Some(url) = &config.relay_url {
        Arc::new(RelayService::new(url.clone())?)
    } else if let Some(key) = &config.google_api_key {
        Arc::new(GeminiService::new(
            key.clone(),
            config.model(),
            config.gemini_base_url.as_deref(),
        )?)
    } else {
        return Ok(None);
    };

    Ok(Some(Arc::new(LoggingService::new(service))))
}

/// Gemini-only service used by the relay route. The relay never forwards
/// to another relay.
pub fn build_gemini(config: &LlmConfig) -> Result<Option<Arc<dyn LlmService>>, LlmError> {
    let Some(key) = &config.google_api_key else {
        return Ok(None);
    };
    let service = GeminiService::new(key.clone(), config.model(), config.gemini_base_url.as_deref())?;
    Ok(Some(Arc::new(LoggingService::new(Arc::new(service)))))
}
