//! Drives one generation: model turns, tool dispatch, event emission.
//!
//! The multiplexer owns the agentic loop. Each step streams one model turn,
//! forwarding deltas as they arrive. If the turn ends with tool calls they
//! are dispatched concurrently, their results appended to the wire history,
//! and another turn begins, up to the step limit. Exactly one terminal
//! event ends every stream: `finish` on success, `error` on failure.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::message::{Message, Part, Role};
use crate::model::{
    LanguageModel, ModelEvent, TurnRequest, WireContentPart, WireFunctionCall, WireImageUrl,
    WireMessage, WireToolCall,
};
use crate::modes::ChatMode;
use crate::tools::{PendingToolCall, ToolDispatcher, ToolRegistry};

use super::channel::{event_channel, EventSender, EventStream};
use super::StreamEvent;

/// Upper bound on model turns within one generation.
const MAX_STEPS: usize = 5;

const EVENT_BUFFER: usize = 256;

/// One generation request from the client.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub chat_id: Option<String>,
    pub messages: Vec<Message>,
    pub mode: ChatMode,
}

/// Multiplexes model output and tool outcomes onto a single event stream.
pub struct StreamMultiplexer {
    model: Arc<dyn LanguageModel>,
    registry: Arc<ToolRegistry>,
    max_steps: usize,
}

impl StreamMultiplexer {
    pub fn new(model: Arc<dyn LanguageModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            registry,
            max_steps: MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Start a generation. Events arrive on the returned stream; dropping
    /// it abandons the consumer but lets the generation run to completion.
    pub fn generate(&self, request: GenerationRequest) -> EventStream {
        let (tx, rx) = event_channel(EVENT_BUFFER);
        let model = Arc::clone(&self.model);
        let registry = Arc::clone(&self.registry);
        let max_steps = self.max_steps;
        tokio::spawn(async move {
            run_generation(model, registry, max_steps, request, tx).await;
        });
        rx
    }
}

async fn run_generation(
    model: Arc<dyn LanguageModel>,
    registry: Arc<ToolRegistry>,
    max_steps: usize,
    request: GenerationRequest,
    events: EventSender,
) {
    let mode = request.mode;
    let tools = registry.definitions_for_mode(mode);
    let mut history = wire_history(&request.messages);
    let dispatcher = ToolDispatcher::new(registry);

    debug!(
        chat_id = request.chat_id.as_deref().unwrap_or("-"),
        mode = %mode,
        tools = tools.len(),
        "generation started"
    );

    for step in 0..max_steps {
        let turn = TurnRequest {
            system: mode.system_prompt().to_string(),
            messages: history.clone(),
            tools: tools.clone(),
        };
        let mut stream = match model.stream_turn(turn).await {
            Ok(stream) => stream,
            Err(e) => {
                events.send(StreamEvent::error(e.to_string())).await;
                return;
            }
        };

        let mut text = String::new();
        let mut calls = Vec::new();
        while let Some(event) = stream.recv().await {
            match event {
                Ok(ModelEvent::TextDelta(delta)) => {
                    text.push_str(&delta);
                    events.send(StreamEvent::text_delta(delta)).await;
                }
                Ok(ModelEvent::ReasoningDelta(delta)) => {
                    events.send(StreamEvent::reasoning_delta(delta)).await;
                }
                Ok(ModelEvent::ToolCall(call)) => {
                    events
                        .send(StreamEvent::tool_call(
                            &call.tool_call_id,
                            &call.tool_name,
                            call.args.clone(),
                        ))
                        .await;
                    calls.push(call);
                }
                Err(e) => {
                    events.send(StreamEvent::error(e.to_string())).await;
                    return;
                }
            }
        }

        history.push(WireMessage::assistant(
            text,
            calls
                .iter()
                .map(|c| WireToolCall {
                    id: c.tool_call_id.clone(),
                    call_type: "function".into(),
                    function: WireFunctionCall {
                        name: c.tool_name.clone(),
                        arguments: c.args.to_string(),
                    },
                })
                .collect(),
        ));

        if calls.is_empty() {
            break;
        }

        let pending = calls
            .into_iter()
            .map(|c| PendingToolCall {
                tool_call_id: c.tool_call_id,
                tool_name: c.tool_name,
                args: c.args,
            })
            .collect();
        let completed = dispatcher.dispatch(pending, &events).await;
        for call in completed {
            let content = match call.outcome {
                Ok(result) => result.to_string(),
                Err(error) => serde_json::json!({ "error": error }).to_string(),
            };
            history.push(WireMessage::tool_result(call.tool_call_id, content));
        }

        if step + 1 == max_steps {
            warn!(max_steps, "generation hit the step limit");
        }
    }

    events.send(StreamEvent::finish()).await;
}

/// Project stored messages onto the model's wire format.
///
/// User attachments become multimodal parts: images travel as image URLs,
/// textual files are inlined, anything else is named so the model knows it
/// exists. Assistant turns contribute their text content only.
fn wire_history(messages: &[Message]) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            Role::User => {
                if message.attachments.is_empty() {
                    wire.push(WireMessage::user_text(&message.content));
                } else {
                    let mut parts = vec![WireContentPart::Text {
                        text: message.content.clone(),
                    }];
                    for attachment in &message.attachments {
                        if attachment.content_type.starts_with("image/") {
                            parts.push(WireContentPart::ImageUrl {
                                image_url: WireImageUrl {
                                    url: attachment.url.clone(),
                                },
                            });
                        } else if let Some(text) = &attachment.text_content {
                            parts.push(WireContentPart::Text {
                                text: format!("File: {}\n\n{}", attachment.name, text),
                            });
                        } else {
                            parts.push(WireContentPart::Text {
                                text: format!("[File: {}]", attachment.name),
                            });
                        }
                    }
                    wire.push(WireMessage::user_parts(parts));
                }
            }
            Role::Assistant => {
                let text = message
                    .parts
                    .iter()
                    .filter_map(|p| match p {
                        Part::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("");
                let text = if text.is_empty() {
                    message.content.clone()
                } else {
                    text
                };
                wire.push(WireMessage::assistant(text, vec![]));
            }
            Role::System => {
                wire.push(WireMessage::system(&message.content));
            }
        }
    }
    wire
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Attachment, PartReconciler};
    use crate::model::{ModelError, ModelStream, ModelToolCall};
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Replays one scripted turn per `stream_turn` call.
    struct ScriptedModel {
        turns: Mutex<VecDeque<Vec<Result<ModelEvent, ModelError>>>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<Vec<Result<ModelEvent, ModelError>>>) -> Self {
            Self {
                turns: Mutex::new(turns.into()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn stream_turn(&self, _request: TurnRequest) -> Result<ModelStream, ModelError> {
            let turn = self
                .turns
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default();
            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(async move {
                for event in turn {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            });
            Ok(ModelStream::new(rx))
        }
    }

    fn multiplexer(turns: Vec<Vec<Result<ModelEvent, ModelError>>>) -> StreamMultiplexer {
        StreamMultiplexer::new(
            Arc::new(ScriptedModel::new(turns)),
            Arc::new(ToolRegistry::default()),
        )
    }

    fn request(prompt: &str, mode: ChatMode) -> GenerationRequest {
        GenerationRequest {
            chat_id: Some("chat-1".into()),
            messages: vec![Message::user(prompt)],
            mode,
        }
    }

    #[tokio::test]
    async fn plain_text_turn_streams_deltas_then_finish() {
        let mux = multiplexer(vec![vec![
            Ok(ModelEvent::TextDelta("Hello".into())),
            Ok(ModelEvent::TextDelta(", world".into())),
        ]]);

        let events = mux.generate(request("hi", ChatMode::Chat)).collect().await;
        assert_eq!(
            events,
            vec![
                StreamEvent::text_delta("Hello"),
                StreamEvent::text_delta(", world"),
                StreamEvent::finish(),
            ]
        );
    }

    #[tokio::test]
    async fn reasoning_deltas_are_forwarded_on_their_own_channel() {
        let mux = multiplexer(vec![vec![
            Ok(ModelEvent::ReasoningDelta("thinking...".into())),
            Ok(ModelEvent::TextDelta("answer".into())),
        ]]);

        let events = mux
            .generate(request("why", ChatMode::Reasoning))
            .collect()
            .await;
        assert_eq!(events[0], StreamEvent::reasoning_delta("thinking..."));
        assert_eq!(events[1], StreamEvent::text_delta("answer"));
        assert_eq!(events[2], StreamEvent::finish());
    }

    #[tokio::test]
    async fn tool_call_turn_dispatches_and_continues() {
        let mux = multiplexer(vec![
            vec![
                Ok(ModelEvent::TextDelta("Let me create that.".into())),
                Ok(ModelEvent::ToolCall(ModelToolCall {
                    tool_call_id: "call_1".into(),
                    tool_name: "CreateArtifactTool".into(),
                    args: json!({"title": "Flow", "type": "mermaid", "content": "graph TD\nA-->B"}),
                })),
            ],
            vec![Ok(ModelEvent::TextDelta("Done, see the panel.".into()))],
        ]);

        let events = mux
            .generate(request("diagram please", ChatMode::Artifact))
            .collect()
            .await;

        // Delta, call, result, second-turn delta, finish.
        assert_eq!(events.len(), 5);
        assert!(matches!(&events[1], StreamEvent::ToolCall { tool_call_id, .. } if tool_call_id == "call_1"));
        assert!(matches!(&events[2], StreamEvent::ToolResult { result, .. } if result["success"] == true));
        assert_eq!(events[3], StreamEvent::text_delta("Done, see the panel."));
        assert_eq!(events[4], StreamEvent::finish());

        // The full stream reconciles into ordered parts.
        let mut reconciler = PartReconciler::new();
        for event in &events {
            reconciler.apply(event);
        }
        assert_eq!(reconciler.parts().len(), 3);
        assert!(reconciler.is_finished());
    }

    #[tokio::test]
    async fn model_error_ends_stream_with_single_error_event() {
        let mux = multiplexer(vec![vec![
            Ok(ModelEvent::TextDelta("partial".into())),
            Err(ModelError::Api {
                status: 500,
                body: "upstream busy".into(),
            }),
        ]]);

        let events = mux.generate(request("hi", ChatMode::Chat)).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[1], StreamEvent::Error { message } if message.contains("500")));
    }

    #[tokio::test]
    async fn step_limit_stops_a_tool_loop() {
        // Every turn asks for another tool call; the loop must still end.
        let call = |id: &str| {
            vec![Ok(ModelEvent::ToolCall(ModelToolCall {
                tool_call_id: id.into(),
                tool_name: "CreateArtifactTool".into(),
                args: json!({"title": "T", "type": "text", "content": "x"}),
            }))]
        };
        let mux = multiplexer(vec![call("c1"), call("c2"), call("c3"), call("c4")])
            .with_max_steps(2);

        let events = mux
            .generate(request("loop", ChatMode::Artifact))
            .collect()
            .await;

        let tool_calls = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::ToolCall { .. }))
            .count();
        assert_eq!(tool_calls, 2);
        assert_eq!(events.last(), Some(&StreamEvent::finish()));
    }

    #[tokio::test]
    async fn failed_tool_call_feeds_error_back_and_continues() {
        let mux = multiplexer(vec![
            vec![Ok(ModelEvent::ToolCall(ModelToolCall {
                tool_call_id: "call_1".into(),
                tool_name: "ImageTool".into(),
                args: json!({"prompt": "x"}),
            }))],
            vec![Ok(ModelEvent::TextDelta(
                "I could not generate that image.".into(),
            ))],
        ]);

        let events = mux
            .generate(request("draw", ChatMode::Chat))
            .collect()
            .await;

        assert!(events
            .iter()
            .any(|e| matches!(e, StreamEvent::ToolError { .. })));
        assert_eq!(events.last(), Some(&StreamEvent::finish()));
    }

    #[test]
    fn wire_history_inlines_textual_attachments() {
        let messages = vec![Message::user_with_attachments(
            "summarize this",
            vec![
                Attachment {
                    name: "notes.md".into(),
                    content_type: "text/markdown".into(),
                    size: 11,
                    url: "data:text/markdown;base64,IyBoZWxsbw==".into(),
                    text_content: Some("# hello".into()),
                },
                Attachment {
                    name: "photo.png".into(),
                    content_type: "image/png".into(),
                    size: 4,
                    url: "data:image/png;base64,AAAA".into(),
                    text_content: None,
                },
            ],
        )];

        let wire = wire_history(&messages);
        assert_eq!(wire.len(), 1);
        let value = serde_json::to_value(&wire[0]).unwrap();
        assert_eq!(value["content"][0]["text"], "summarize this");
        assert!(value["content"][1]["text"]
            .as_str()
            .unwrap()
            .contains("# hello"));
        assert_eq!(value["content"][2]["type"], "image_url");
    }

    #[test]
    fn wire_history_uses_plain_text_without_attachments() {
        let messages = vec![
            Message::user("question"),
            Message::assistant(vec![Part::text("answer")]),
        ];
        let wire = wire_history(&messages);
        let user = serde_json::to_value(&wire[0]).unwrap();
        assert_eq!(user["content"], "question");
        let assistant = serde_json::to_value(&wire[1]).unwrap();
        assert_eq!(assistant["content"], "answer");
    }
}
