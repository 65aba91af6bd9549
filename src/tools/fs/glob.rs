//! glob tool: pattern-match file paths.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::schemas::AgentEvent;
use crate::tools::{optional_str, require_str, Tool, ToolError, ToolRuntime};

pub struct GlobTool;

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> String {
        "glob".to_string()
    }

    fn description(&self) -> String {
        "Find files matching a glob pattern. '**' crosses directories, '*' stays within one."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Glob pattern, e.g. **/*.rs" },
                "path": { "type": "string", "description": "Directory to search; defaults to /" }
            },
            "required": ["pattern"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let pattern = require_str(&input, "pattern")?;
        let path = optional_str(&input, "path").unwrap_or_else(|| "/".to_string());
        runtime
            .emitter
            .emit(AgentEvent::Glob {
                pattern: pattern.clone(),
                path: path.clone(),
            })
            .await;
        let hits = match runtime.backend.glob_info(&pattern, &path).await {
            Ok(hits) => hits,
            Err(e) => return Ok(e),
        };
        if hits.is_empty() {
            return Ok("No matches found".to_string());
        }
        Ok(hits
            .iter()
            .map(|h| h.path.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FileBackend, StateBackend};
    use crate::schemas::EventEmitter;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_glob_lists_matches() {
        let backend = Arc::new(StateBackend::new());
        backend.write("/src/a.rs", "1").await;
        backend.write("/src/b.txt", "2").await;
        let (emitter, _rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(backend, emitter, "call_1");
        let out = GlobTool
            .run(json!({ "pattern": "**/*.rs" }), &runtime)
            .await
            .unwrap();
        assert_eq!(out, "/src/a.rs");
    }

    #[tokio::test]
    async fn test_glob_no_matches() {
        let (emitter, _rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(Arc::new(StateBackend::new()), emitter, "call_1");
        let out = GlobTool
            .run(json!({ "pattern": "*.nope" }), &runtime)
            .await
            .unwrap();
        assert_eq!(out, "No matches found");
    }
}
