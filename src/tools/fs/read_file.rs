//! read_file tool: numbered-line reads with optional offset/limit.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::schemas::AgentEvent;
use crate::tools::{require_str, Tool, ToolError, ToolRuntime};

/// Default number of lines returned when the model omits `limit`.
const DEFAULT_READ_LIMIT: usize = 2000;

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> String {
        "read_file".to_string()
    }

    fn description(&self) -> String {
        "Read a file. Lines come back numbered. Use offset (0-based line) and limit for large files."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path" },
                "offset": { "type": "integer", "description": "First line to read (0-based)" },
                "limit": { "type": "integer", "description": "Max lines to return" }
            },
            "required": ["path"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let path = require_str(&input, "path")?;
        let offset = input.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
        let limit = input
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_READ_LIMIT as u64) as usize;
        runtime
            .emitter
            .emit(AgentEvent::FileRead { path: path.clone() })
            .await;
        match runtime.backend.read(&path, offset, limit).await {
            Ok(content) => Ok(content),
            Err(e) => Ok(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FileBackend, StateBackend};
    use crate::schemas::EventEmitter;
    use std::sync::Arc;

    fn runtime_with(backend: Arc<StateBackend>) -> ToolRuntime {
        // Tools tolerate a dropped consumer; events just stop flowing.
        let (emitter, _rx) = EventEmitter::channel(32);
        ToolRuntime::new(backend, emitter, "call_1")
    }

    #[tokio::test]
    async fn test_read_file_numbers_lines() {
        let backend = Arc::new(StateBackend::new());
        backend.write("/a.txt", "x\ny").await;
        let runtime = runtime_with(backend);
        let out = ReadFileTool
            .run(json!({ "path": "/a.txt" }), &runtime)
            .await
            .unwrap();
        assert_eq!(out, "     1\tx\n     2\ty");
    }

    #[tokio::test]
    async fn test_read_file_missing_returns_error_string() {
        let runtime = runtime_with(Arc::new(StateBackend::new()));
        let out = ReadFileTool
            .run(json!({ "path": "/gone.txt" }), &runtime)
            .await
            .unwrap();
        assert_eq!(out, "Error: File '/gone.txt' not found");
    }
}
