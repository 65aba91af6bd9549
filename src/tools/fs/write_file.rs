//! write_file tool: create a file through the backend.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::schemas::AgentEvent;
use crate::tools::{require_str, Tool, ToolError, ToolRuntime};

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> String {
        "write_file".to_string()
    }

    fn description(&self) -> String {
        "Create a new file with the given content. To change an existing file, read it and use edit_file."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path" },
                "content": { "type": "string", "description": "Full file content" }
            },
            "required": ["path", "content"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let path = require_str(&input, "path")?;
        let content = require_str(&input, "content")?;
        runtime
            .emitter
            .emit(AgentEvent::FileWriteStart { path: path.clone() })
            .await;
        let result = runtime.backend.write(&path, &content).await;
        if let Some(error) = result.error {
            return Ok(error);
        }
        let written = result.path.unwrap_or(path);
        runtime
            .emitter
            .emit(AgentEvent::FileWritten {
                path: written.clone(),
            })
            .await;
        Ok(format!("Wrote file {}", written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FileBackend, StateBackend};
    use crate::schemas::EventEmitter;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_write_file_emits_start_then_written() {
        let backend = Arc::new(StateBackend::new());
        let (emitter, mut rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(backend.clone(), emitter, "call_1");

        let out = WriteFileTool
            .run(json!({ "path": "notes.txt", "content": "hi" }), &runtime)
            .await
            .unwrap();
        assert_eq!(out, "Wrote file /notes.txt");
        assert!(backend.read_raw("/notes.txt").await.is_ok());
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::FileWriteStart {
                path: "notes.txt".to_string()
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::FileWritten {
                path: "/notes.txt".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_write_existing_file_returns_error_string() {
        let backend = Arc::new(StateBackend::new());
        backend.write("/a.txt", "old").await;
        let (emitter, _rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(backend, emitter, "call_1");
        let out = WriteFileTool
            .run(json!({ "path": "/a.txt", "content": "new" }), &runtime)
            .await
            .unwrap();
        assert!(out.contains("already exists"));
    }
}
