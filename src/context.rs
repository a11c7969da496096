//! Instruction context injected into the first turn of a workspace
//!
//! Instructions come from an external source as a list of single-key
//! mappings. They are flattened into one line and prefixed to the outbound
//! text of the first user message only; the visible transcript never
//! contains them.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

/// Returned by [`build_context`] when there are no instructions
pub const CONTEXT_FALLBACK: &str = "N/A";

const CONTEXT_TEMPLATE_PREFIX: &str = "Here is some context to help you: Instructions: ";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Side data served by the instruction source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions {
    #[serde(default)]
    pub instructions: Vec<Map<String, Value>>,
}

impl Instructions {
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instructions: values
                .into_iter()
                .map(|v| {
                    let mut entry = Map::new();
                    entry.insert("instruction".to_string(), Value::String(v.into()));
                    entry
                })
                .collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Instruction fetch failed: {0}")]
    Fetch(String),
    #[error("Instruction source returned HTTP {0}")]
    Status(u16),
}

/// Build the deterministic context string: `1. a | 2. b`, or `N/A`
pub fn build_context(instructions: Option<&Instructions>) -> String {
    let items: Vec<String> = instructions
        .map(|i| i.instructions.as_slice())
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| entry.values().next().map(instruction_text))
        .enumerate()
        .map(|(index, value)| format!("{}. {value}", index + 1))
        .collect();

    if items.is_empty() {
        CONTEXT_FALLBACK.to_string()
    } else {
        items.join(" | ")
    }
}

/// Strings verbatim, anything else as JSON text
fn instruction_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Outbound text for the first turn of a workspace
pub fn with_context(context: &str, input: &str) -> String {
    format!("{CONTEXT_TEMPLATE_PREFIX}{context}\n\n{input}")
}

/// Where instructions come from
#[async_trait]
pub trait InstructionSource: Send + Sync {
    async fn fetch(&self) -> Result<Instructions, ContextError>;
}

#[async_trait]
impl<T: InstructionSource + ?Sized> InstructionSource for Arc<T> {
    async fn fetch(&self) -> Result<Instructions, ContextError> {
        (**self).fetch().await
    }
}

/// Fixed instructions, possibly none
#[derive(Debug, Clone, Default)]
pub struct StaticInstructions(pub Instructions);

#[async_trait]
impl InstructionSource for StaticInstructions {
    async fn fetch(&self) -> Result<Instructions, ContextError> {
        Ok(self.0.clone())
    }
}

/// Instructions fetched over HTTP as `{"instructions": [...]}`
pub struct HttpInstructionSource {
    client: Client,
    url: String,
}

impl HttpInstructionSource {
    pub fn new(url: impl Into<String>) -> Result<Self, ContextError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ContextError::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl InstructionSource for HttpInstructionSource {
    async fn fetch(&self) -> Result<Instructions, ContextError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ContextError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ContextError::Status(response.status().as_u16()));
        }

        response
            .json::<Instructions>()
            .await
            .map_err(|e| ContextError::Fetch(e.to_string()))
    }
}

/// Caches the context string after the first successful fetch
pub struct ContextProvider<I: InstructionSource> {
    source: I,
    cached: RwLock<Option<String>>,
}

impl<I: InstructionSource> ContextProvider<I> {
    pub fn new(source: I) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// Current context string. A failed fetch degrades to `N/A` for this
    /// call only and is retried next time.
    pub async fn context(&self) -> String {
        if let Some(cached) = self.read_cache() {
            return cached;
        }

        match self.source.fetch().await {
            Ok(instructions) => {
                let context = build_context(Some(&instructions));
                if let Ok(mut guard) = self.cached.write() {
                    *guard = Some(context.clone());
                }
                tracing::debug!(
                    count = instructions.instructions.len(),
                    "Loaded instruction context"
                );
                context
            }
            Err(e) => {
                tracing::warn!(error = %e, "Instruction fetch failed, using fallback context");
                build_context(None)
            }
        }
    }

    fn read_cache(&self) -> Option<String> {
        self.cached.read().ok().and_then(|guard| guard.clone())
    }
}
