//! Wrapper overriding a tool's description (for custom_tool_descriptions).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{ApprovalDecision, Tool, ToolError, ToolRuntime};

/// Delegates everything to the inner tool except the description. Used to
/// re-document built-in tools without touching their behavior or schema.
pub struct ToolWithDescription {
    inner: Arc<dyn Tool>,
    description: String,
}

impl ToolWithDescription {
    pub fn new(inner: Arc<dyn Tool>, description: impl Into<String>) -> Self {
        Self {
            inner,
            description: description.into(),
        }
    }
}

#[async_trait]
impl Tool for ToolWithDescription {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn parameters(&self) -> Value {
        self.inner.parameters()
    }

    async fn check_approval(&self, args: &Value, runtime: &ToolRuntime) -> ApprovalDecision {
        self.inner.check_approval(args, runtime).await
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        self.inner.run(input, runtime).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fs::LsTool;

    #[test]
    fn test_wrapper_overrides_only_description() {
        let wrapped = ToolWithDescription::new(Arc::new(LsTool), "Custom listing docs");
        assert_eq!(wrapped.name(), "ls");
        assert_eq!(wrapped.description(), "Custom listing docs");
        assert_eq!(wrapped.parameters(), LsTool.parameters());
    }
}
