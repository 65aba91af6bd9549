use async_trait::async_trait;
use serde_json::{json, Value};

use crate::language_models::ToolDescriptor;

use super::runtime::ToolRuntime;
use super::ToolError;

/// Outcome of the pre-execution approval check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
}

/// A tool the model can call: stable name, JSON-schema input descriptor,
/// and an async execute over the shared runtime.
///
/// Tools are stateless carriers — the backend, event emitter, and provider
/// handles all arrive through the [ToolRuntime] so the same tool instance
/// can serve gated and ungated call sites alike.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable tool name the model calls.
    fn name(&self) -> String;

    /// What the tool does and when to use it.
    fn description(&self) -> String;

    /// JSON-schema-style input descriptor, e.g.
    /// ```json
    /// {
    ///     "type": "object",
    ///     "properties": {
    ///         "path": { "type": "string", "description": "File path" }
    ///     },
    ///     "required": ["path"]
    /// }
    /// ```
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": self.description()
                }
            },
            "required": ["input"]
        })
    }

    /// Consulted by the loop before it announces the call. Gated wrappers
    /// override this to ask the user; the decision is settled before the
    /// `tool-call` event goes out. Default: approved without prompting.
    async fn check_approval(
        &self,
        _args: &Value,
        _runtime: &ToolRuntime,
    ) -> ApprovalDecision {
        ApprovalDecision::Approved
    }

    /// Execute with parsed arguments. The returned string becomes the tool
    /// result the model sees; recoverable failures should be `"Error:"`
    /// strings rather than `Err`. The loop only calls this after
    /// [Tool::check_approval] returned [ApprovalDecision::Approved].
    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError>;
}

/// The descriptor advertised to the model for one tool.
pub fn tool_descriptor(tool: &dyn Tool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name(),
        description: tool.description(),
        parameters: tool.parameters(),
    }
}

/// Required string argument, or the matching [ToolError].
pub(crate) fn require_str(input: &Value, key: &str) -> Result<String, ToolError> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ToolError::MissingInput(key.to_string()))
}

pub(crate) fn optional_str(input: &Value, key: &str) -> Option<String> {
    input.get(key).and_then(Value::as_str).map(String::from)
}
