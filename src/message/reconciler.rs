//! Folds the multiplexed event stream into an ordered part list.
//!
//! The reconciler owns the in-flight assistant message. After every applied
//! event the part list is safe to render: parts are only appended or
//! transitioned in place, never removed or reordered. Tool invocation parts
//! are addressed through a `tool_call_id -> index` arena so a result landing
//! long after its call still joins the right part without a linear scan.

use std::collections::HashMap;

use tracing::warn;

use crate::stream::StreamEvent;

use super::{Part, ToolInvocation, ToolInvocationState};

/// Which delta channel the trailing part is currently accepting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenChannel {
    None,
    Text,
    Reasoning,
}

/// Reconciles stream events into the parts of one in-flight message.
#[derive(Debug)]
pub struct PartReconciler {
    parts: Vec<Part>,
    tool_index: HashMap<String, usize>,
    open: OpenChannel,
    finished: bool,
}

impl PartReconciler {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            tool_index: HashMap::new(),
            open: OpenChannel::None,
            finished: false,
        }
    }

    /// Apply one event. Events arriving after `finish` (late results for an
    /// abandoned generation) are discarded.
    pub fn apply(&mut self, event: &StreamEvent) {
        if self.finished {
            warn!(?event, "event after finish, discarding");
            return;
        }

        match event {
            StreamEvent::TextDelta { text } => self.append_text(text),
            StreamEvent::ReasoningDelta { text } => self.append_reasoning(text),
            StreamEvent::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => self.open_tool_call(tool_call_id, tool_name, args.clone()),
            StreamEvent::ToolResult {
                tool_call_id,
                result,
            } => self.resolve_tool_call(tool_call_id, result.clone()),
            StreamEvent::ToolError {
                tool_call_id,
                error,
            } => self.fail_tool_call(tool_call_id, error),
            StreamEvent::Finish => {
                self.open = OpenChannel::None;
                self.finished = true;
            }
            StreamEvent::Error { .. } => {
                // Transport failure: the partial message is preserved as-is
                // and no further events are accepted.
                self.open = OpenChannel::None;
                self.finished = true;
            }
        }
    }

    fn append_text(&mut self, delta: &str) {
        if self.open == OpenChannel::Text {
            if let Some(Part::Text { text }) = self.parts.last_mut() {
                text.push_str(delta);
                return;
            }
        }
        self.parts.push(Part::text(delta));
        self.open = OpenChannel::Text;
    }

    fn append_reasoning(&mut self, delta: &str) {
        if self.open == OpenChannel::Reasoning {
            if let Some(Part::Reasoning { reasoning }) = self.parts.last_mut() {
                reasoning.push_str(delta);
                return;
            }
        }
        self.parts.push(Part::reasoning(delta));
        self.open = OpenChannel::Reasoning;
    }

    /// A tool call always opens a new part at the current end of the list.
    /// This fixes the call's on-screen position even though its result may
    /// take arbitrarily long.
    fn open_tool_call(&mut self, tool_call_id: &str, tool_name: &str, args: serde_json::Value) {
        if self.tool_index.contains_key(tool_call_id) {
            warn!(tool_call_id, "duplicate tool-call event, discarding");
            return;
        }
        let index = self.parts.len();
        self.parts.push(Part::tool_invocation(ToolInvocation::call(
            tool_call_id,
            tool_name,
            args,
        )));
        self.tool_index.insert(tool_call_id.to_string(), index);
        self.open = OpenChannel::None;
    }

    fn resolve_tool_call(&mut self, tool_call_id: &str, result: serde_json::Value) {
        match self.invocation_mut(tool_call_id) {
            Some(invocation) if invocation.state == ToolInvocationState::Call => {
                invocation.resolve(result);
            }
            Some(_) => warn!(tool_call_id, "second terminal transition, discarding"),
            None => warn!(tool_call_id, "result for unknown tool call, discarding"),
        }
    }

    fn fail_tool_call(&mut self, tool_call_id: &str, error: &str) {
        match self.invocation_mut(tool_call_id) {
            Some(invocation) if invocation.state == ToolInvocationState::Call => {
                invocation.fail(error);
            }
            Some(_) => warn!(tool_call_id, "second terminal transition, discarding"),
            None => warn!(tool_call_id, "error for unknown tool call, discarding"),
        }
    }

    fn invocation_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolInvocation> {
        let index = *self.tool_index.get(tool_call_id)?;
        match self.parts.get_mut(index) {
            Some(Part::ToolInvocation { tool_invocation }) => Some(tool_invocation),
            _ => None,
        }
    }

    /// The parts reconciled so far, in render order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Whether the stream has reached a terminal event.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Concatenation of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Consume the reconciler, yielding the final part list.
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

impl Default for PartReconciler {
    fn default() -> Self {
        Self::new()
    }
}
