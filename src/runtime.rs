//! Runtime for executing chat sessions
//!
//! The pure state machine decides; this module performs the I/O its
//! effects ask for.

mod executor;
mod file_store;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ChatError, ChatRuntime, SubmitReply, DEFAULT_REQUEST_TIMEOUT};
pub use file_store::JsonFileStore;
pub use traits::*;

use crate::context::InstructionSource;
use std::sync::Arc;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime =
    ChatRuntime<Arc<dyn WorkspaceStore>, ConfiguredLlm, Arc<dyn InstructionSource>>;
