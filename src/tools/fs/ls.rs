//! ls tool: list directory entries.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backends::FileKind;
use crate::schemas::AgentEvent;
use crate::tools::{optional_str, Tool, ToolError, ToolRuntime};

pub struct LsTool;

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> String {
        "ls".to_string()
    }

    fn description(&self) -> String {
        "List files and directories under a path. Directories end with '/'.".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory to list; defaults to /" }
            }
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let path = optional_str(&input, "path").unwrap_or_else(|| "/".to_string());
        runtime
            .emitter
            .emit(AgentEvent::Ls { path: path.clone() })
            .await;
        let entries = match runtime.backend.ls_info(&path).await {
            Ok(entries) => entries,
            Err(e) => return Ok(e),
        };
        if entries.is_empty() {
            return Ok(format!("No files found in {}", path));
        }
        let lines: Vec<String> = entries
            .iter()
            .map(|e| match e.kind {
                FileKind::Dir => format!("{}/", e.path),
                FileKind::File => e.path.clone(),
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FileBackend, StateBackend};
    use crate::schemas::EventEmitter;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ls_renders_dirs_with_slash() {
        let backend = Arc::new(StateBackend::new());
        backend.write("/docs/a.md", "1").await;
        backend.write("/top.txt", "2").await;
        let (emitter, mut rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(backend, emitter, "call_1");

        let out = LsTool.run(json!({}), &runtime).await.unwrap();
        assert_eq!(out, "/docs/\n/top.txt");
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::Ls {
                path: "/".to_string()
            })
        );
    }
}
