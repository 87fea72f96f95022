//! Concurrent tool dispatch and the per-call state machine.
//!
//! Each call moves `dispatched -> succeeded | failed`; terminal states are
//! final and a failed call is never retried here. Retrying is a new call
//! with a new `tool_call_id`. Calls dispatched together run concurrently
//! and may complete in any order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use crate::stream::{EventSender, StreamEvent};

use super::registry::ToolRegistry;

/// A tool call parsed from the model response, awaiting execution.
#[derive(Debug, Clone)]
pub struct PendingToolCall {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: serde_json::Value,
}

/// Lifecycle state of one dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Dispatched,
    Succeeded,
    Failed,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallState::Dispatched)
    }
}

/// Runtime record for one live tool call. Created when the call is
/// dispatched, destroyed once the terminal outcome is folded into the
/// message part.
#[derive(Debug, Clone)]
pub struct ToolInvocationRecord {
    pub tool_call_id: String,
    pub tool_name: String,
    pub state: CallState,
    pub started_at: DateTime<Utc>,
}

impl ToolInvocationRecord {
    pub fn new(tool_call_id: &str, tool_name: &str) -> Self {
        Self {
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            state: CallState::Dispatched,
            started_at: Utc::now(),
        }
    }

    /// Apply a terminal transition. A second transition is ignored.
    pub fn complete(&mut self, success: bool) {
        if self.state.is_terminal() {
            warn!(
                tool_call_id = %self.tool_call_id,
                "ignoring transition on already-terminal call"
            );
            return;
        }
        self.state = if success {
            CallState::Succeeded
        } else {
            CallState::Failed
        };
    }
}

/// Terminal outcome of one call, keyed back to its id.
#[derive(Debug)]
pub struct CompletedCall {
    pub tool_call_id: String,
    pub tool_name: String,
    pub outcome: Result<serde_json::Value, String>,
}

/// Executes pending calls concurrently and emits their terminal events.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Run every pending call to completion, emitting `tool-result` /
    /// `tool-error` events as each finishes. Returns the outcomes in
    /// completion order.
    ///
    /// A panicking tool is contained by its task and surfaces as a failed
    /// call rather than aborting the stream.
    pub async fn dispatch(
        &self,
        calls: Vec<PendingToolCall>,
        events: &EventSender,
    ) -> Vec<CompletedCall> {
        let mut records: HashMap<String, ToolInvocationRecord> = calls
            .iter()
            .map(|c| {
                (
                    c.tool_call_id.clone(),
                    ToolInvocationRecord::new(&c.tool_call_id, &c.tool_name),
                )
            })
            .collect();

        let mut in_flight = FuturesUnordered::new();
        for call in calls {
            let tool = self.registry.get(&call.tool_name);
            in_flight.push(async move {
                let outcome = match tool {
                    Some(tool) => {
                        let args = call.args.clone();
                        match tokio::spawn(async move { tool.call(args).await }).await {
                            Ok(Ok(result)) => Ok(result),
                            Ok(Err(e)) => Err(e.to_string()),
                            Err(join_err) => Err(format!("tool crashed: {join_err}")),
                        }
                    }
                    None => Err(format!("Unknown tool: {}", call.tool_name)),
                };
                (call, outcome)
            });
        }

        let mut completed = Vec::new();
        while let Some((call, outcome)) = in_flight.next().await {
            if let Some(record) = records.get_mut(&call.tool_call_id) {
                record.complete(outcome.is_ok());
                debug!(
                    tool_call_id = %call.tool_call_id,
                    tool_name = %call.tool_name,
                    state = ?record.state,
                    "tool call finished"
                );
            }

            match &outcome {
                Ok(result) => {
                    events
                        .send(StreamEvent::tool_result(&call.tool_call_id, result.clone()))
                        .await;
                }
                Err(error) => {
                    events
                        .send(StreamEvent::tool_error(&call.tool_call_id, error.clone()))
                        .await;
                }
            }

            records.remove(&call.tool_call_id);
            completed.push(CompletedCall {
                tool_call_id: call.tool_call_id,
                tool_name: call.tool_name,
                outcome,
            });
        }

        completed
    }
}
