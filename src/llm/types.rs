//! Wire types for the completion boundary
//!
//! The same shapes are used by the relay route, so a client and a relay
//! built from this crate speak to each other directly.

use crate::workspace::Message;
use serde::{Deserialize, Serialize};

/// Outbound completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Prior turns, oldest first, including the just-appended user turn
    pub history: Vec<Message>,
    /// Text actually sent to the model for this turn
    pub message: String,
    /// Instruction context, sent alongside for the relay's benefit
    #[serde(default)]
    pub context: String,
}

/// Successful completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub text: String,
}

impl CompletionResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
