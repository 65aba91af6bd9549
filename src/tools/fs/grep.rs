//! grep tool: regex search across file contents.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::schemas::AgentEvent;
use crate::tools::{optional_str, require_str, Tool, ToolError, ToolRuntime};

pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> String {
        "grep".to_string()
    }

    fn description(&self) -> String {
        "Search file contents with a regular expression. Optionally restrict to a path and an \
         include glob."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Regular expression" },
                "path": { "type": "string", "description": "Directory to search; defaults to /" },
                "include": { "type": "string", "description": "Glob filter for file paths, e.g. *.rs" }
            },
            "required": ["pattern"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let pattern = require_str(&input, "pattern")?;
        let path = optional_str(&input, "path");
        let include = optional_str(&input, "include");
        runtime
            .emitter
            .emit(AgentEvent::Grep {
                pattern: pattern.clone(),
                path: path.clone(),
            })
            .await;
        let matches = match runtime
            .backend
            .grep_raw(&pattern, path.as_deref(), include.as_deref())
            .await
        {
            Ok(matches) => matches,
            Err(e) => return Ok(e),
        };
        if matches.is_empty() {
            return Ok("No matches found".to_string());
        }
        Ok(matches
            .iter()
            .map(|m| format!("{}:{}:{}", m.path, m.line, m.text))
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
    async fn test_grep_formats_matches() {
        let backend = Arc::new(StateBackend::new());
        backend.write("/a.txt", "one\ntwo needle three").await;
        let (emitter, _rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(backend, emitter, "call_1");
        let out = GrepTool
            .run(json!({ "pattern": "needle" }), &runtime)
            .await
            .unwrap();
        assert_eq!(out, "/a.txt:2:two needle three");
    }

    #[tokio::test]
    async fn test_grep_invalid_regex_passthrough() {
        let (emitter, _rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(Arc::new(StateBackend::new()), emitter, "call_1");
        let out = GrepTool
            .run(json!({ "pattern": "[invalid" }), &runtime)
            .await
            .unwrap();
        assert!(out.starts_with("Invalid regex pattern:"));
    }
}
