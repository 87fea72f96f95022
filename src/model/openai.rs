//! OpenAI-compatible streaming chat client.
//!
//! Speaks the `/chat/completions` protocol with `stream: true`, decoding
//! the SSE chunk stream into [`ModelEvent`]s. Tool call fragments arrive
//! spread across many chunks, keyed by index; they are accumulated here and
//! emitted as complete calls once the turn finishes.

use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use futures::StreamExt;

use super::sse::SseParser;
use super::{LanguageModel, ModelError, ModelEvent, ModelStream, ModelToolCall, TurnRequest};

const EVENT_BUFFER: usize = 64;

/// Client for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn request_body(&self, request: &TurnRequest) -> serde_json::Value {
        let mut messages = vec![json!({"role": "system", "content": request.system})];
        for msg in &request.messages {
            messages.push(serde_json::to_value(msg).unwrap_or_default());
        }

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tool_choice"] = json!("auto");
        }
        body
    }
}

#[async_trait::async_trait]
impl LanguageModel for OpenAiModel {
    async fn stream_turn(&self, request: TurnRequest) -> Result<ModelStream, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);
        debug!(model = %self.model, url = %url, "starting model turn");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "model request failed");
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut parser = SseParser::new();
            let mut accumulator = ToolCallAccumulator::default();

            'stream: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(ModelError::Http(e))).await;
                        return;
                    }
                };
                for payload in parser.feed_bytes(&chunk) {
                    if payload == "[DONE]" {
                        break 'stream;
                    }
                    let parsed: ChunkResponse = match serde_json::from_str(&payload) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            debug!(error = %e, "skipping unparseable stream chunk");
                            continue;
                        }
                    };
                    for choice in parsed.choices {
                        let reasoning = choice.delta.reasoning().map(str::to_string);
                        if let Some(text) = choice.delta.content {
                            if !text.is_empty() {
                                let _ = tx.send(Ok(ModelEvent::TextDelta(text))).await;
                            }
                        }
                        if let Some(text) = reasoning {
                            if !text.is_empty() {
                                let _ = tx.send(Ok(ModelEvent::ReasoningDelta(text))).await;
                            }
                        }
                        if let Some(fragments) = choice.delta.tool_calls {
                            accumulator.absorb(fragments);
                        }
                        if choice.finish_reason.is_some() {
                            for call in accumulator.drain() {
                                let _ = tx.send(Ok(ModelEvent::ToolCall(call))).await;
                            }
                        }
                    }
                }
            }

            // Some backends end the stream without a finish_reason chunk.
            for call in accumulator.drain() {
                let _ = tx.send(Ok(ModelEvent::ToolCall(call))).await;
            }
        });

        Ok(ModelStream::new(rx))
    }
}

/// Gathers tool call fragments, keyed by their chunk index.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    calls: Vec<PartialToolCall>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn absorb(&mut self, fragments: Vec<ToolCallDelta>) {
        for fragment in fragments {
            let index = fragment.index.unwrap_or(self.calls.len());
            while self.calls.len() <= index {
                self.calls.push(PartialToolCall::default());
            }
            let call = &mut self.calls[index];
            if let Some(id) = fragment.id {
                call.id = id;
            }
            if let Some(function) = fragment.function {
                if let Some(name) = function.name {
                    call.name.push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    call.arguments.push_str(&arguments);
                }
            }
        }
    }

    fn drain(&mut self) -> Vec<ModelToolCall> {
        std::mem::take(&mut self.calls)
            .into_iter()
            .filter(|c| !c.name.is_empty())
            .map(|c| {
                let args = if c.arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&c.arguments).unwrap_or_else(|e| {
                        warn!(tool = %c.name, error = %e, "tool arguments were not valid JSON");
                        json!({})
                    })
                };
                let tool_call_id = if c.id.is_empty() {
                    format!("call_{}", uuid::Uuid::new_v4())
                } else {
                    c.id
                };
                ModelToolCall {
                    tool_call_id,
                    tool_name: c.name,
                    args,
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    /// Reasoning channel; field name varies across compatible backends.
    reasoning_content: Option<String>,
    reasoning: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

impl ChunkDelta {
    fn reasoning(&self) -> Option<&str> {
        self.reasoning_content
            .as_deref()
            .or(self.reasoning.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: Option<usize>,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}
