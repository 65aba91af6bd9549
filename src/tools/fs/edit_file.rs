//! edit_file tool: literal find/replace through the backend.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::schemas::AgentEvent;
use crate::tools::{require_str, Tool, ToolError, ToolRuntime};

pub struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> String {
        "edit_file".to_string()
    }

    fn description(&self) -> String {
        "Replace old_string with new_string in a file. The match is literal and must be unique \
         unless replace_all is true."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path" },
                "old_string": { "type": "string", "description": "Exact text to replace" },
                "new_string": { "type": "string", "description": "Replacement text" },
                "replace_all": { "type": "boolean", "description": "Replace every occurrence" }
            },
            "required": ["path", "old_string", "new_string"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let path = require_str(&input, "path")?;
        let old_string = require_str(&input, "old_string")?;
        let new_string = require_str(&input, "new_string")?;
        let replace_all = input
            .get("replace_all")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let result = runtime
            .backend
            .edit(&path, &old_string, &new_string, replace_all)
            .await;
        if let Some(error) = result.error {
            return Ok(error);
        }
        let edited = result.path.unwrap_or(path);
        let occurrences = result.occurrences.unwrap_or(0);
        runtime
            .emitter
            .emit(AgentEvent::FileEdited {
                path: edited.clone(),
                occurrences,
            })
            .await;
        Ok(format!(
            "Edited {} ({} occurrence{} replaced)",
            edited,
            occurrences,
            if occurrences == 1 { "" } else { "s" }
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FileBackend, StateBackend};
    use crate::schemas::EventEmitter;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_edit_file_unique_match() {
        let backend = Arc::new(StateBackend::new());
        backend.write("/a.txt", "hello world").await;
        let (emitter, mut rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(backend.clone(), emitter, "call_1");

        let out = EditFileTool
            .run(
                json!({ "path": "/a.txt", "old_string": "world", "new_string": "rust" }),
                &runtime,
            )
            .await
            .unwrap();
        assert_eq!(out, "Edited /a.txt (1 occurrence replaced)");
        assert_eq!(backend.read_raw("/a.txt").await.unwrap().to_text(), "hello rust");
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::FileEdited {
                path: "/a.txt".to_string(),
                occurrences: 1
            })
        );
    }

    #[tokio::test]
    async fn test_edit_file_ambiguous_reports_count() {
        let backend = Arc::new(StateBackend::new());
        backend.write("/a.txt", "x x").await;
        let (emitter, _rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(backend, emitter, "call_1");
        let out = EditFileTool
            .run(
                json!({ "path": "/a.txt", "old_string": "x", "new_string": "y" }),
                &runtime,
            )
            .await
            .unwrap();
        assert!(out.contains("appears 2 times"));
    }
}
