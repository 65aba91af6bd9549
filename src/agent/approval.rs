//! Human-in-the-loop approval gate.
//!
//! The gate composes at the tool level: a wrapped tool keeps its name,
//! description, and schema, and only execution changes. The decision is
//! made in [ApprovalGate::check_approval], which the loop consults before
//! it emits `tool-call` — so `approval-requested` always precedes the
//! `tool-call` it refers to. Without an approval callback the gate denies
//! deterministically, which is the documented fallback for resuming past
//! an interrupt.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::schemas::AgentEvent;
use crate::tools::{ApprovalDecision, Tool, ToolError, ToolRuntime};

/// Result text the model sees when the user (or the default) denies a call.
pub const DENIAL_MESSAGE: &str =
    "Tool execution denied by user. The tool call was not executed.";

/// One pending approval, handed to the caller's callback.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ApprovalRequest {
    pub approval_id: String,
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: Value,
}

/// Async approval callback supplied by the caller. Absent ⇒ default-deny.
pub type ApprovalCallback =
    Arc<dyn Fn(ApprovalRequest) -> BoxFuture<'static, bool> + Send + Sync>;

/// Async per-call predicate deciding whether a call needs approval.
pub type ApprovalPredicate = Arc<dyn Fn(Value) -> BoxFuture<'static, bool> + Send + Sync>;

/// Per-tool interrupt configuration: always, never, or decided per call.
#[derive(Clone)]
pub enum InterruptPolicy {
    Always,
    Never,
    When(ApprovalPredicate),
}

impl std::fmt::Debug for InterruptPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Never => write!(f, "Never"),
            Self::When(_) => write!(f, "When(..)"),
        }
    }
}

impl From<bool> for InterruptPolicy {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Always
        } else {
            Self::Never
        }
    }
}

impl InterruptPolicy {
    /// Build a predicate policy from an async closure over the call args.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, bool> + Send + Sync + 'static,
    {
        Self::When(Arc::new(predicate))
    }

    async fn needs_approval(&self, args: &Value) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::When(predicate) => predicate(args.clone()).await,
        }
    }
}

/// Wraps a tool with a pre-execution approval check. The loop consults
/// [Tool::check_approval] first and only runs the tool on approval; `run`
/// itself delegates untouched.
pub struct ApprovalGate {
    inner: Arc<dyn Tool>,
    policy: InterruptPolicy,
    callback: Option<ApprovalCallback>,
}

impl ApprovalGate {
    pub fn new(
        inner: Arc<dyn Tool>,
        policy: InterruptPolicy,
        callback: Option<ApprovalCallback>,
    ) -> Self {
        Self {
            inner,
            policy,
            callback,
        }
    }
}

#[async_trait]
impl Tool for ApprovalGate {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn description(&self) -> String {
        self.inner.description()
    }

    fn parameters(&self) -> Value {
        self.inner.parameters()
    }

    async fn check_approval(
        &self,
        args: &Value,
        runtime: &ToolRuntime,
    ) -> ApprovalDecision {
        if !self.policy.needs_approval(args).await {
            return ApprovalDecision::Approved;
        }

        let request = ApprovalRequest {
            approval_id: Uuid::new_v4().to_string(),
            tool_call_id: runtime.tool_call_id.clone(),
            tool_name: self.inner.name(),
            args: args.clone(),
        };
        runtime
            .emitter
            .emit(AgentEvent::ApprovalRequested {
                approval_id: request.approval_id.clone(),
                tool_call_id: request.tool_call_id.clone(),
                tool_name: request.tool_name.clone(),
                args: request.args.clone(),
            })
            .await;

        let approved = match &self.callback {
            Some(callback) => callback(request.clone()).await,
            None => {
                log::info!(
                    "no approval callback configured; denying {} by default",
                    request.tool_name
                );
                false
            }
        };
        runtime
            .emitter
            .emit(AgentEvent::ApprovalResponse {
                approval_id: request.approval_id,
                approved,
            })
            .await;

        if approved {
            ApprovalDecision::Approved
        } else {
            ApprovalDecision::Denied
        }
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        self.inner.run(input, runtime).await
    }
}

/// Wrap each tool whose name appears in `interrupt_on` with a gate.
pub(crate) fn gate_tools(
    tools: Vec<Arc<dyn Tool>>,
    interrupt_on: &HashMap<String, InterruptPolicy>,
    callback: Option<ApprovalCallback>,
) -> Vec<Arc<dyn Tool>> {
    tools
        .into_iter()
        .map(|tool| match interrupt_on.get(&tool.name()) {
            Some(InterruptPolicy::Never) | None => tool,
            Some(policy) => Arc::new(ApprovalGate::new(
                tool,
                policy.clone(),
                callback.clone(),
            )) as Arc<dyn Tool>,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FileBackend, StateBackend};
    use crate::schemas::EventEmitter;
    use crate::tools::fs::WriteFileTool;
    use futures::FutureExt;
    use serde_json::json;

    fn runtime(backend: Arc<StateBackend>) -> (ToolRuntime, tokio::sync::mpsc::Receiver<AgentEvent>) {
        let (emitter, rx) = EventEmitter::channel(32);
        (ToolRuntime::new(backend, emitter, "call_1"), rx)
    }

    #[tokio::test]
    async fn test_gate_default_denies_without_callback() {
        let backend = Arc::new(StateBackend::new());
        let gate = ApprovalGate::new(Arc::new(WriteFileTool), InterruptPolicy::Always, None);
        let (rt, mut rx) = runtime(backend.clone());

        let args = json!({ "path": "/a.txt", "content": "x" });
        let decision = gate.check_approval(&args, &rt).await;
        assert_eq!(decision, ApprovalDecision::Denied);
        // A denied call is never run, so it has no side effect.
        assert!(backend.read_raw("/a.txt").await.is_err());

        assert!(matches!(
            rx.recv().await,
            Some(AgentEvent::ApprovalRequested { .. })
        ));
        assert!(matches!(
            rx.recv().await,
            Some(AgentEvent::ApprovalResponse {
                approved: false,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_gate_runs_tool_on_approval() {
        let backend = Arc::new(StateBackend::new());
        let callback: ApprovalCallback = Arc::new(|_req| async { true }.boxed());
        let gate = ApprovalGate::new(
            Arc::new(WriteFileTool),
            InterruptPolicy::Always,
            Some(callback),
        );
        let (rt, _rx) = runtime(backend.clone());

        let args = json!({ "path": "/a.txt", "content": "x" });
        assert_eq!(
            gate.check_approval(&args, &rt).await,
            ApprovalDecision::Approved
        );
        let out = gate.run(args, &rt).await.unwrap();
        assert_eq!(out, "Wrote file /a.txt");
        assert!(backend.read_raw("/a.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_gate_async_predicate() {
        let backend = Arc::new(StateBackend::new());
        let policy = InterruptPolicy::when(|args: Value| {
            async move {
                args.get("path")
                    .and_then(Value::as_str)
                    .map(|p| p.starts_with("/protected/"))
                    .unwrap_or(false)
            }
            .boxed()
        });
        let gate = ApprovalGate::new(Arc::new(WriteFileTool), policy, None);
        let (rt, _rx) = runtime(backend.clone());

        // Unprotected path is approved without prompting.
        let args = json!({ "path": "/open.txt", "content": "x" });
        assert_eq!(
            gate.check_approval(&args, &rt).await,
            ApprovalDecision::Approved
        );
        let out = gate.run(args, &rt).await.unwrap();
        assert_eq!(out, "Wrote file /open.txt");

        // Protected path hits the default-deny.
        let args = json!({ "path": "/protected/a.txt", "content": "x" });
        assert_eq!(
            gate.check_approval(&args, &rt).await,
            ApprovalDecision::Denied
        );
    }

    #[test]
    fn test_gate_preserves_schema_and_name() {
        let inner: Arc<dyn Tool> = Arc::new(WriteFileTool);
        let gate = ApprovalGate::new(inner.clone(), InterruptPolicy::Always, None);
        assert_eq!(gate.name(), inner.name());
        assert_eq!(gate.parameters(), inner.parameters());
    }
}
