//! The multiplexed event stream for one model generation.
//!
//! A single generation produces one ordered sequence of [`StreamEvent`]s
//! carrying text deltas, reasoning deltas, and per-tool-call lifecycle
//! events, terminated by `finish` or a single terminal `error`.
//!
//! Ordering guarantees: deltas for one part type arrive in causal order, and
//! a `tool-result`/`tool-error` for a given call id always follows that
//! call's `tool-call` event. Events for different tool calls may otherwise
//! interleave freely, because tools execute concurrently.

mod channel;
pub mod multiplexer;

pub use channel::{event_channel, EventSender, EventStream};
pub use multiplexer::{GenerationRequest, StreamMultiplexer};

use serde::{Deserialize, Serialize};

/// One framed event in the multiplexed stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    TextDelta {
        text: String,
    },
    ReasoningDelta {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        result: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolError {
        tool_call_id: String,
        error: String,
    },
    Finish,
    /// Terminal transport/generation failure. At most one per stream, always
    /// the last event when present.
    Error {
        message: String,
    },
}

impl StreamEvent {
    pub fn text_delta(text: impl Into<String>) -> Self {
        StreamEvent::TextDelta { text: text.into() }
    }

    pub fn reasoning_delta(text: impl Into<String>) -> Self {
        StreamEvent::ReasoningDelta { text: text.into() }
    }

    pub fn tool_call(tool_call_id: &str, tool_name: &str, args: serde_json::Value) -> Self {
        StreamEvent::ToolCall {
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            args,
        }
    }

    pub fn tool_result(tool_call_id: &str, result: serde_json::Value) -> Self {
        StreamEvent::ToolResult {
            tool_call_id: tool_call_id.to_string(),
            result,
        }
    }

    pub fn tool_error(tool_call_id: &str, error: impl Into<String>) -> Self {
        StreamEvent::ToolError {
            tool_call_id: tool_call_id.to_string(),
            error: error.into(),
        }
    }

    pub fn finish() -> Self {
        StreamEvent::Finish
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Finish | StreamEvent::Error { .. })
    }
}
