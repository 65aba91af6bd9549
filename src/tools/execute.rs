//! execute tool: run a shell command through the configured sandbox.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::schemas::AgentEvent;
use crate::tools::web::NETWORK_TIMEOUT;
use crate::tools::{require_str, Tool, ToolError, ToolRuntime};

pub struct ExecuteTool;

#[async_trait]
impl Tool for ExecuteTool {
    fn name(&self) -> String {
        "execute".to_string()
    }

    fn description(&self) -> String {
        "Run a shell command in the sandbox and return stdout, stderr, and the exit code."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Command to run" }
            },
            "required": ["command"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let command = require_str(&input, "command")?;
        let sandbox = runtime.sandbox.clone().ok_or_else(|| {
            ToolError::ConfigurationError("execute requires a sandbox".to_string())
        })?;
        runtime
            .emitter
            .emit(AgentEvent::ExecuteStart {
                command: command.clone(),
            })
            .await;
        let outcome = match tokio::time::timeout(
            NETWORK_TIMEOUT,
            sandbox.exec(&command, NETWORK_TIMEOUT),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                runtime
                    .emitter
                    .emit(AgentEvent::ExecuteFinish { exit_code: None })
                    .await;
                return Ok(format!("Error: Command failed: {}", e));
            }
            Err(_) => {
                runtime
                    .emitter
                    .emit(AgentEvent::ExecuteFinish { exit_code: None })
                    .await;
                return Ok("Error: Command timed out after 30 seconds".to_string());
            }
        };
        runtime
            .emitter
            .emit(AgentEvent::ExecuteFinish {
                exit_code: Some(outcome.exit_code),
            })
            .await;
        let mut out = String::new();
        if !outcome.stdout.is_empty() {
            out.push_str(&outcome.stdout);
        }
        if !outcome.stderr.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("stderr:\n");
            out.push_str(&outcome.stderr);
        }
        if out.is_empty() {
            out.push_str("(no output)");
        }
        out.push_str(&format!("\n\nexit code: {}", outcome.exit_code));
        Ok(out)
    }
}
