//! Tool implementations and the dispatch state machine.
//!
//! Every tool exposes the same contract: schema-described structured input,
//! and a structured output or a structured error. Tools never abort the
//! stream; any internal failure is captured and surfaced as a `tool-error`
//! event with a human-readable message.

pub mod artifact;
pub mod dispatch;
pub mod image;
pub mod registry;
pub mod search;
pub mod transcription;
pub mod weather;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use artifact::CreateArtifactTool;
pub use dispatch::{CallState, CompletedCall, PendingToolCall, ToolDispatcher, ToolInvocationRecord};
pub use image::ImageTool;
pub use registry::{ToolRegistry, ToolSecrets};
pub use search::WebSearchTool;
pub use transcription::TranscriptionTool;
pub use weather::WeatherTool;

/// Arc-wrapped tool for shared ownership across dispatch tasks.
pub type ArcTool = Arc<dyn Tool + Send + Sync>;

/// Errors surfaced by tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("{0}")]
    Execution(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Schema-level description of a tool, sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Uniform contract every tool implements.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Wire name the model calls this tool by.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema for the structured input.
    fn parameters(&self) -> serde_json::Value;

    /// Execute with already-parsed args, returning a structured result.
    async fn call(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}
