//! Client for a remote completion relay
//!
//! POSTs `{history, message, context}` and accepts either a `{"text": ...}`
//! JSON body or the bare reply text.

use super::types::{CompletionRequest, CompletionResult};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Relay-backed completion service
pub struct RelayService {
    client: Client,
    url: String,
    model_id: String,
}

impl RelayService {
    pub fn new(url: impl Into<String>) -> Result<Self, LlmError> {
        let url = url.into();
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            model_id: format!("relay:{url}"),
            url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RelayReply {
    text: String,
}

#[derive(Debug, Deserialize)]
struct RelayErrorReply {
    error: String,
}

/// Decode a successful relay body
fn parse_reply(body: &str) -> CompletionResult {
    match serde_json::from_str::<RelayReply>(body) {
        Ok(reply) => CompletionResult::new(reply.text),
        Err(_) => CompletionResult::new(body),
    }
}

#[async_trait]
impl LlmService for RelayService {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, LlmError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message =
                serde_json::from_str::<RelayErrorReply>(&body).map_or(body, |r| r.error);
            return Err(LlmError::from_status(status.as_u16(), message));
        }

        Ok(parse_reply(&body))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
