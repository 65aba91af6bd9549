//! Events emitted by the tool loop.
//!
//! The event stream is the only window a consumer has into a running
//! invocation. It is a finite, single-consumer sequence backed by a bounded
//! channel: emission blocks until the consumer advances, and a dropped
//! consumer cancels the loop at its next emission point.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::state::{AgentState, Todo};

/// Closed set of events produced during one agent invocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    /// Streamed assistant text delta.
    Text { text: String },
    StepStart { step: u64 },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        content: String,
    },
    TodosChanged { todos: Vec<Todo> },
    FileWriteStart { path: String },
    FileWritten { path: String },
    FileEdited { path: String, occurrences: u32 },
    FileRead { path: String },
    Ls { path: String },
    Glob { pattern: String, path: String },
    Grep {
        pattern: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    ExecuteStart { command: String },
    ExecuteFinish {
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
    WebSearchStart { query: String },
    WebSearchFinish { query: String, results: usize },
    HttpRequestStart { url: String, method: String },
    HttpRequestFinish {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
    FetchUrlStart { url: String },
    FetchUrlFinish { url: String, bytes: usize },
    SubagentStart { name: String, description: String },
    SubagentStep { name: String, step: u64 },
    SubagentFinish { name: String },
    /// One complete text block, emitted at a step boundary.
    TextSegment { text: String },
    UserMessage { content: String },
    Done {
        text: String,
        state: AgentState,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },
    Error { message: String },
    ApprovalRequested {
        approval_id: String,
        tool_call_id: String,
        tool_name: String,
        args: Value,
    },
    ApprovalResponse {
        approval_id: String,
        approved: bool,
    },
    CheckpointSaved { thread_id: String, step: u64 },
    CheckpointLoaded {
        thread_id: String,
        step: u64,
        messages_count: usize,
    },
}

/// Stream of events handed to the caller of [crate::agent::DeepAgent::run].
pub type AgentEventStream = ReceiverStream<AgentEvent>;

/// Sending half of the event stream, shared with every tool via the runtime.
///
/// A scoped emitter (see [EventEmitter::scoped]) is handed to subagent
/// loops: their step boundaries surface as `subagent-step` and their
/// lifecycle events are swallowed, while tool-level events pass through.
#[derive(Clone)]
pub struct EventEmitter {
    sender: mpsc::Sender<AgentEvent>,
    scope: Option<String>,
}

impl EventEmitter {
    /// Build an emitter plus the receiver the consumer will drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AgentEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                sender,
                scope: None,
            },
            receiver,
        )
    }

    /// Clone of this emitter that relabels loop-lifecycle events as
    /// subagent events for the given subagent name.
    pub fn scoped(&self, name: impl Into<String>) -> Self {
        Self {
            sender: self.sender.clone(),
            scope: Some(name.into()),
        }
    }

    /// Emit one event. Returns false when the consumer has gone away, which
    /// the loop treats as cancellation.
    pub async fn emit(&self, event: AgentEvent) -> bool {
        let event = match (&self.scope, event) {
            (Some(name), AgentEvent::StepStart { step }) => AgentEvent::SubagentStep {
                name: name.clone(),
                step,
            },
            // A subagent's own terminal and text events stay internal; the
            // parent reports subagent-finish and embeds the result itself.
            (Some(_), AgentEvent::Done { .. })
            | (Some(_), AgentEvent::Error { .. })
            | (Some(_), AgentEvent::Text { .. })
            | (Some(_), AgentEvent::TextSegment { .. })
            | (Some(_), AgentEvent::UserMessage { .. })
            | (Some(_), AgentEvent::CheckpointSaved { .. })
            | (Some(_), AgentEvent::CheckpointLoaded { .. }) => return true,
            (_, event) => event,
        };
        self.sender.send(event).await.is_ok()
    }

    /// Whether the consumer is still attached.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_tags() {
        let v = serde_json::to_value(AgentEvent::CheckpointSaved {
            thread_id: "t1".to_string(),
            step: 3,
        })
        .unwrap();
        assert_eq!(v["type"], "checkpoint-saved");

        let v = serde_json::to_value(AgentEvent::ToolCall {
            tool_call_id: "call_1".to_string(),
            tool_name: "ls".to_string(),
            args: serde_json::json!({}),
        })
        .unwrap();
        assert_eq!(v["type"], "tool-call");
    }

    #[tokio::test]
    async fn test_emitter_delivers_in_order() {
        let (emitter, mut rx) = EventEmitter::channel(4);
        assert!(emitter.emit(AgentEvent::StepStart { step: 0 }).await);
        assert!(
            emitter
                .emit(AgentEvent::Text {
                    text: "hi".to_string()
                })
                .await
        );
        assert_eq!(rx.recv().await, Some(AgentEvent::StepStart { step: 0 }));
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::Text {
                text: "hi".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_emitter_detects_dropped_consumer() {
        let (emitter, rx) = EventEmitter::channel(1);
        drop(rx);
        assert!(!emitter.emit(AgentEvent::StepStart { step: 0 }).await);
        assert!(!emitter.is_open());
    }

    #[tokio::test]
    async fn test_scoped_emitter_relabels_steps() {
        let (emitter, mut rx) = EventEmitter::channel(4);
        let scoped = emitter.scoped("researcher");
        assert!(scoped.emit(AgentEvent::StepStart { step: 2 }).await);
        assert!(
            scoped
                .emit(AgentEvent::Text {
                    text: "internal".to_string()
                })
                .await
        );
        assert!(scoped.emit(AgentEvent::Ls { path: "/".to_string() }).await);
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::SubagentStep {
                name: "researcher".to_string(),
                step: 2
            })
        );
        // Text was swallowed; the ls passthrough arrives next.
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::Ls {
                path: "/".to_string()
            })
        );
    }
}
