//! write_todos tool: replace or merge the planning list.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::schemas::{AgentEvent, Todo};
use crate::tools::{Tool, ToolError, ToolRuntime};

/// Tool that writes the todo list through the backend. `merge: true`
/// upserts by id instead of replacing the whole list.
pub struct WriteTodosTool;

#[async_trait]
impl Tool for WriteTodosTool {
    fn name(&self) -> String {
        "write_todos".to_string()
    }

    fn description(&self) -> String {
        "Write or update the todo list. Use it to break complex work into steps and track \
         progress: each item has an id, content, and a status of pending, in_progress, or \
         completed. Pass merge=true to update items by id without replacing the rest."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "description": "The todo items",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "content": { "type": "string" },
                            "status": { "type": "string", "enum": ["pending", "in_progress", "completed"] }
                        },
                        "required": ["id", "content"]
                    }
                },
                "merge": { "type": "boolean", "description": "Merge by id instead of replacing" }
            },
            "required": ["todos"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let todos_value = input
            .get("todos")
            .cloned()
            .ok_or_else(|| ToolError::MissingInput("todos".to_string()))?;
        let incoming: Vec<Todo> = serde_json::from_value(todos_value)
            .map_err(|e| ToolError::InvalidInput(format!("todos: {}", e)))?;
        let merge = input.get("merge").and_then(Value::as_bool).unwrap_or(false);

        let todos = if merge {
            let mut current = runtime.backend.get_todos().await;
            for item in incoming {
                match current.iter_mut().find(|t| t.id == item.id) {
                    Some(existing) => *existing = item,
                    None => current.push(item),
                }
            }
            current
        } else {
            incoming
        };

        runtime.backend.set_todos(todos.clone()).await;
        runtime
            .emitter
            .emit(AgentEvent::TodosChanged {
                todos: todos.clone(),
            })
            .await;
        Ok(format!("Updated todo list ({} items)", todos.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{FileBackend, StateBackend};
    use crate::schemas::{EventEmitter, TodoStatus};
    use std::sync::Arc;

    fn runtime() -> (ToolRuntime, Arc<StateBackend>) {
        let backend = Arc::new(StateBackend::new());
        let (emitter, _rx) = EventEmitter::channel(8);
        (ToolRuntime::new(backend.clone(), emitter, "call_1"), backend)
    }

    #[tokio::test]
    async fn test_write_todos_replaces_list() {
        let (runtime, backend) = runtime();
        let out = WriteTodosTool
            .run(
                json!({ "todos": [
                    { "id": "1", "content": "write spec" },
                    { "id": "2", "content": "draft tests", "status": "in_progress" }
                ]}),
                &runtime,
            )
            .await
            .unwrap();
        assert_eq!(out, "Updated todo list (2 items)");
        let todos = backend.get_todos().await;
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[1].status, TodoStatus::InProgress);
    }

    #[tokio::test]
    async fn test_write_todos_merge_upserts_by_id() {
        let (runtime, backend) = runtime();
        backend
            .set_todos(vec![Todo::new("1", "write spec"), Todo::new("2", "draft tests")])
            .await;
        WriteTodosTool
            .run(
                json!({ "merge": true, "todos": [
                    { "id": "2", "content": "draft tests", "status": "completed" },
                    { "id": "3", "content": "review" }
                ]}),
                &runtime,
            )
            .await
            .unwrap();
        let todos = backend.get_todos().await;
        assert_eq!(todos.len(), 3);
        assert_eq!(todos[1].status, TodoStatus::Completed);
        assert_eq!(todos[2].id, "3");
    }
}
