//! Language model abstraction and wire types.
//!
//! A [`LanguageModel`] turns one request into a stream of low-level model
//! events (text deltas, reasoning deltas, parsed tool calls). The stream
//! layer above folds these into the public event vocabulary.

pub mod openai;
pub mod sse;

pub use openai::OpenAiModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::tools::ToolDefinition;

/// Errors from the model transport.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse model response: {0}")]
    Parse(String),
}

/// A complete tool call assembled from the model's streamed fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelToolCall {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: serde_json::Value,
}

/// Low-level events produced while one model turn streams.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    TextDelta(String),
    ReasoningDelta(String),
    ToolCall(ModelToolCall),
}

/// Receiving half of one streaming model turn.
pub struct ModelStream {
    rx: mpsc::Receiver<Result<ModelEvent, ModelError>>,
}

impl ModelStream {
    pub fn new(rx: mpsc::Receiver<Result<ModelEvent, ModelError>>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the turn is complete.
    pub async fn recv(&mut self) -> Option<Result<ModelEvent, ModelError>> {
        self.rx.recv().await
    }
}

/// Message content on the wire: either a plain string or multimodal parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<WireContentPart>),
}

/// One multimodal content part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireContentPart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireImageUrl {
    pub url: String,
}

/// A tool call echoed back in the assistant's wire message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    /// JSON-encoded argument object, as the protocol requires.
    pub arguments: String,
}

/// One message in the conversation sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: Some(WireContent::Text(text.into())),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: Some(WireContent::Text(text.into())),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user_parts(parts: Vec<WireContentPart>) -> Self {
        Self {
            role: "user".into(),
            content: Some(WireContent::Parts(parts)),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(text: impl Into<String>, tool_calls: Vec<WireToolCall>) -> Self {
        let text = text.into();
        Self {
            role: "assistant".into(),
            content: if text.is_empty() {
                None
            } else {
                Some(WireContent::Text(text))
            },
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
        }
    }

    /// A tool result message, joined to its call by id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".into(),
            content: Some(WireContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Everything the model needs for one streamed turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub system: String,
    pub messages: Vec<WireMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// A streaming chat model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Start one streaming turn. Events arrive on the returned stream;
    /// transport failures after the stream starts arrive as `Err` items.
    async fn stream_turn(&self, request: TurnRequest) -> Result<ModelStream, ModelError>;
}
