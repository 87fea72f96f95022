//! Message data model shared by the stream pipeline and persistence.
//!
//! A [`Message`] owns an ordered list of [`Part`] values. Part order is the
//! authoritative rendering order and is never rearranged once appended; only
//! the in-flight assistant message is mutated, and only through the
//! [`reconciler`].

pub mod reconciler;

pub use reconciler::PartReconciler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// Lifecycle state of a tool invocation part.
///
/// `Call` is the only non-terminal state; a part transitions in place to
/// `Result` or `Error` exactly once when the matching payload arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolInvocationState {
    Call,
    Result,
    Error,
}

impl ToolInvocationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ToolInvocationState::Call)
    }
}

/// One tool call joined to its eventual result or error by `tool_call_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_call_id: String,
    pub tool_name: String,
    pub state: ToolInvocationState,
    pub args: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolInvocation {
    /// Create a new invocation in `call` state.
    pub fn call(tool_call_id: &str, tool_name: &str, args: serde_json::Value) -> Self {
        Self {
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            state: ToolInvocationState::Call,
            args,
            result: None,
            error: None,
        }
    }

    /// Transition in place to `result` state, attaching the payload.
    pub fn resolve(&mut self, result: serde_json::Value) {
        self.state = ToolInvocationState::Result;
        self.result = Some(result);
    }

    /// Transition in place to `error` state, attaching the message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = ToolInvocationState::Error;
        self.error = Some(error.into());
    }
}

/// One typed segment of a message.
///
/// Closed sum type: a part is text, reasoning, or a tool invocation, never a
/// mix of those.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text {
        text: String,
    },
    Reasoning {
        reasoning: String,
    },
    ToolInvocation {
        #[serde(rename = "toolInvocation")]
        tool_invocation: ToolInvocation,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn reasoning(reasoning: impl Into<String>) -> Self {
        Part::Reasoning {
            reasoning: reasoning.into(),
        }
    }

    pub fn tool_invocation(invocation: ToolInvocation) -> Self {
        Part::ToolInvocation {
            tool_invocation: invocation,
        }
    }

    /// The invocation carried by this part, if it is one.
    pub fn as_tool_invocation(&self) -> Option<&ToolInvocation> {
        match self {
            Part::ToolInvocation { tool_invocation } => Some(tool_invocation),
            _ => None,
        }
    }
}

/// A user-supplied attachment, normalized by the ingestor.
///
/// Textual attachments have `text_content` populated before the message is
/// sent to the model; without it the model only sees a filename placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// A chat message: ordered parts plus attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    /// Flattened text content, kept alongside parts for cheap display and
    /// persistence queries.
    pub content: String,
    pub parts: Vec<Part>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a user message with a single text part.
    pub fn user(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            parts: vec![Part::text(content.clone())],
            content,
            attachments: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a user message carrying attachments.
    pub fn user_with_attachments(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        let mut message = Self::user(content);
        message.attachments = attachments;
        message
    }

    /// Create an assistant message from already-reconciled parts.
    pub fn assistant(parts: Vec<Part>) -> Self {
        let content = parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content,
            parts,
            attachments: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_invocation_resolve_is_terminal() {
        let mut inv = ToolInvocation::call("call_1", "displayWeather", serde_json::json!({}));
        assert_eq!(inv.state, ToolInvocationState::Call);
        assert!(!inv.state.is_terminal());

        inv.resolve(serde_json::json!({"temp_c": 23.1}));
        assert_eq!(inv.state, ToolInvocationState::Result);
        assert!(inv.state.is_terminal());
        assert!(inv.error.is_none());
    }

    #[test]
    fn tool_invocation_fail_records_message() {
        let mut inv = ToolInvocation::call("call_2", "webSearchTool", serde_json::json!({}));
        inv.fail("upstream timed out");
        assert_eq!(inv.state, ToolInvocationState::Error);
        assert_eq!(inv.error.as_deref(), Some("upstream timed out"));
        assert!(inv.result.is_none());
    }

    #[test]
    fn part_serialization_is_tagged() {
        let part = Part::text("hello");
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");

        let part = Part::tool_invocation(ToolInvocation::call(
            "call_3",
            "ImageTool",
            serde_json::json!({"prompt": "a sunset"}),
        ));
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "tool-invocation");
        assert_eq!(json["toolInvocation"]["toolCallId"], "call_3");
        assert_eq!(json["toolInvocation"]["state"], "call");
    }

    #[test]
    fn part_round_trips_through_json() {
        let part = Part::reasoning("thinking it through");
        let json = serde_json::to_string(&part).unwrap();
        let back: Part = serde_json::from_str(&json).unwrap();
        match back {
            Part::Reasoning { reasoning } => assert_eq!(reasoning, "thinking it through"),
            other => panic!("expected reasoning part, got {other:?}"),
        }
    }

    #[test]
    fn assistant_message_flattens_text_parts() {
        let parts = vec![
            Part::text("The weather "),
            Part::tool_invocation(ToolInvocation::call(
                "call_4",
                "displayWeather",
                serde_json::json!({"location": "Bangalore"}),
            )),
            Part::text("is mild."),
        ];
        let message = Message::assistant(parts);
        assert_eq!(message.content, "The weather is mild.");
        assert_eq!(message.parts.len(), 3);
        assert_eq!(message.role, Role::Assistant);
    }

    #[test]
    fn attachment_image_detection() {
        let attachment = Attachment {
            name: "photo.png".to_string(),
            content_type: "image/png".to_string(),
            size: 1024,
            url: "data:image/png;base64,AAAA".to_string(),
            text_content: None,
        };
        assert!(attachment.is_image());
    }
}
