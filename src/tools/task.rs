//! task tool: delegate a subtask to an ephemeral subagent.
//!
//! The subagent runs an isolated inner tool loop: its own tools, prompt,
//! and approval config, sharing only the filesystem backend with the
//! parent. Its final assistant text becomes the parent's tool result,
//! verbatim.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::executor::run_subagent;
use crate::agent::{ApprovalCallback, SubagentSpec};
use crate::language_models::ChatModel;
use crate::schemas::AgentEvent;
use crate::tools::{require_str, Tool, ToolError, ToolRuntime};

pub struct TaskTool {
    specs: Vec<SubagentSpec>,
    by_name: HashMap<String, usize>,
    default_model: Arc<dyn ChatModel>,
    approval_callback: Option<ApprovalCallback>,
    token_threshold: usize,
    keep_messages: usize,
    eviction_limit: usize,
}

impl TaskTool {
    pub fn new(
        specs: Vec<SubagentSpec>,
        default_model: Arc<dyn ChatModel>,
        approval_callback: Option<ApprovalCallback>,
        token_threshold: usize,
        keep_messages: usize,
        eviction_limit: usize,
    ) -> Self {
        let by_name = specs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        Self {
            specs,
            by_name,
            default_model,
            approval_callback,
            token_threshold,
            keep_messages,
            eviction_limit,
        }
    }

    pub fn subagents(&self) -> &[SubagentSpec] {
        &self.specs
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> String {
        "task".to_string()
    }

    fn description(&self) -> String {
        let listing: Vec<String> = self
            .specs
            .iter()
            .map(|s| format!("{}: {}", s.name, s.description))
            .collect();
        format!(
            "Delegate a self-contained subtask to a subagent. Available subagents:\n{}",
            listing.join("\n")
        )
    }

    fn parameters(&self) -> Value {
        let names: Vec<Value> = self.specs.iter().map(|s| json!(s.name)).collect();
        json!({
            "type": "object",
            "properties": {
                "subagent_type": {
                    "type": "string",
                    "description": "Which subagent to use",
                    "enum": names
                },
                "description": {
                    "type": "string",
                    "description": "Short summary of the subtask"
                },
                "prompt": {
                    "type": "string",
                    "description": "Full task prompt for the subagent"
                }
            },
            "required": ["subagent_type", "description", "prompt"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let subagent_type = require_str(&input, "subagent_type")?;
        let description = require_str(&input, "description")?;
        let prompt = require_str(&input, "prompt")?;

        let Some(spec) = self.by_name.get(&subagent_type).map(|i| &self.specs[*i]) else {
            let known: Vec<&str> = self.specs.iter().map(|s| s.name.as_str()).collect();
            return Ok(format!(
                "Error: Unknown subagent '{}'. Available: {}",
                subagent_type,
                known.join(", ")
            ));
        };

        runtime
            .emitter
            .emit(AgentEvent::SubagentStart {
                name: spec.name.clone(),
                description,
            })
            .await;

        let result = run_subagent(
            spec,
            prompt,
            runtime,
            &self.default_model,
            self.approval_callback.clone(),
            self.token_threshold,
            self.keep_messages,
            self.eviction_limit,
        )
        .await;

        runtime
            .emitter
            .emit(AgentEvent::SubagentFinish {
                name: spec.name.clone(),
            })
            .await;

        match result {
            Ok(text) => Ok(text),
            Err(e) => Ok(format!("Error: Subagent '{}' failed: {}", spec.name, e)),
        }
    }
}
