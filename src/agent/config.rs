//! Agent configuration.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::backends::FileBackend;
use crate::language_models::{ChatModel, ModelRequest};
use crate::persistence::Checkpointer;
use crate::tools::{HtmlConverter, Sandbox, Tool, WebSearchProvider};

use super::approval::{ApprovalCallback, InterruptPolicy};
use super::eviction::DEFAULT_EVICTION_LIMIT;
use super::summarization::{DEFAULT_KEEP_MESSAGES, DEFAULT_TOKEN_THRESHOLD};

/// Step bound for the main loop.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Step bound for subagent loops.
pub const DEFAULT_SUBAGENT_MAX_STEPS: usize = 50;

/// Hook wrapping every model call; chained in configuration order.
#[async_trait]
pub trait ModelMiddleware: Send + Sync {
    async fn before_model_call(&self, request: ModelRequest) -> ModelRequest {
        request
    }
}

/// One subagent the task tool can delegate to.
#[derive(Clone)]
pub struct SubagentSpec {
    /// Name the model passes as `subagent_type`.
    pub name: String,
    /// Description the model uses to pick this subagent.
    pub description: String,
    /// System prompt for the subagent's own loop.
    pub system_prompt: String,
    /// Tools for the subagent; empty means the built-in filesystem set.
    pub tools: Vec<Arc<dyn Tool>>,
    /// Per-tool approval config for the subagent; `None` inherits nothing
    /// (subagent runs ungated).
    pub interrupt_on: Option<HashMap<String, InterruptPolicy>>,
    /// Model override; `None` uses the parent's model.
    pub model: Option<Arc<dyn ChatModel>>,
    pub max_steps: usize,
}

impl SubagentSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
            interrupt_on: None,
            model: None,
            max_steps: DEFAULT_SUBAGENT_MAX_STEPS,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_interrupt_on(mut self, interrupt_on: HashMap<String, InterruptPolicy>) -> Self {
        self.interrupt_on = Some(interrupt_on);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

impl std::fmt::Debug for SubagentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubagentSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("tools", &self.tools.len())
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

/// Everything that shapes one agent: the model, tool surface, backend,
/// persistence, approval gating, and context-window management.
#[derive(Clone)]
pub struct AgentConfig {
    pub model: Arc<dyn ChatModel>,
    pub system_prompt: Option<String>,
    /// Additional user-supplied tools, merged after the built-ins.
    pub tools: Vec<Arc<dyn Tool>>,
    /// Filesystem backend; `None` means a fresh state backend per run.
    pub backend: Option<Arc<dyn FileBackend>>,
    pub checkpointer: Option<Arc<dyn Checkpointer>>,
    /// Per-tool approval policies.
    pub interrupt_on: HashMap<String, InterruptPolicy>,
    /// Async approval callback; absent means gated calls are denied.
    pub on_approval_request: Option<ApprovalCallback>,
    /// Resume/save key; persistence is active only when this and the
    /// checkpointer are both set.
    pub thread_id: Option<String>,
    pub max_steps: usize,
    pub token_threshold: usize,
    pub keep_messages: usize,
    pub eviction_limit: usize,
    pub middleware: Vec<Arc<dyn ModelMiddleware>>,
    pub subagents: Vec<SubagentSpec>,
    pub sandbox: Option<Arc<dyn Sandbox>>,
    pub web_search: Option<Arc<dyn WebSearchProvider>>,
    pub html_converter: Option<Arc<dyn HtmlConverter>>,
    /// Enables the http_request and fetch_url tools.
    pub enable_web_fetch: bool,
    /// JSON schema the final assistant message must satisfy; the parsed
    /// value rides on the `done` event as `output`.
    pub output_schema: Option<Value>,
    /// Description overrides for built-in tools, by tool name.
    pub custom_tool_descriptions: HashMap<String, String>,
    pub enable_planning: bool,
    pub enable_filesystem: bool,
}

impl AgentConfig {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            system_prompt: None,
            tools: Vec::new(),
            backend: None,
            checkpointer: None,
            interrupt_on: HashMap::new(),
            on_approval_request: None,
            thread_id: None,
            max_steps: DEFAULT_MAX_STEPS,
            token_threshold: DEFAULT_TOKEN_THRESHOLD,
            keep_messages: DEFAULT_KEEP_MESSAGES,
            eviction_limit: DEFAULT_EVICTION_LIMIT,
            middleware: Vec::new(),
            subagents: Vec::new(),
            sandbox: None,
            web_search: None,
            html_converter: None,
            enable_web_fetch: false,
            output_schema: None,
            custom_tool_descriptions: HashMap::new(),
            enable_planning: true,
            enable_filesystem: true,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn FileBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Require approval for one tool: pass `true`, `false`, or a policy.
    pub fn with_interrupt_on(
        mut self,
        tool_name: impl Into<String>,
        policy: impl Into<InterruptPolicy>,
    ) -> Self {
        self.interrupt_on.insert(tool_name.into(), policy.into());
        self
    }

    pub fn with_approval_callback(mut self, callback: ApprovalCallback) -> Self {
        self.on_approval_request = Some(callback);
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_token_threshold(mut self, threshold: usize) -> Self {
        self.token_threshold = threshold;
        self
    }

    pub fn with_keep_messages(mut self, keep: usize) -> Self {
        self.keep_messages = keep;
        self
    }

    pub fn with_eviction_limit(mut self, limit: usize) -> Self {
        self.eviction_limit = limit;
        self
    }

    pub fn with_middleware(mut self, middleware: Vec<Arc<dyn ModelMiddleware>>) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn with_subagent(mut self, spec: SubagentSpec) -> Self {
        self.subagents.push(spec);
        self
    }

    pub fn with_sandbox(mut self, sandbox: Arc<dyn Sandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn with_web_search(mut self, provider: Arc<dyn WebSearchProvider>) -> Self {
        self.web_search = Some(provider);
        self
    }

    pub fn with_html_converter(mut self, converter: Arc<dyn HtmlConverter>) -> Self {
        self.html_converter = Some(converter);
        self
    }

    pub fn with_web_fetch(mut self, enable: bool) -> Self {
        self.enable_web_fetch = enable;
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_custom_tool_description(
        mut self,
        tool_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.custom_tool_descriptions
            .insert(tool_name.into(), description.into());
        self
    }

    pub fn with_planning(mut self, enable: bool) -> Self {
        self.enable_planning = enable;
        self
    }

    pub fn with_filesystem(mut self, enable: bool) -> Self {
        self.enable_filesystem = enable;
        self
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("system_prompt", &self.system_prompt.as_deref().map(|_| ".."))
            .field("tools", &self.tools.len())
            .field("backend", &self.backend.as_ref().map(|_| ".."))
            .field("checkpointer", &self.checkpointer.as_ref().map(|_| ".."))
            .field("interrupt_on", &self.interrupt_on)
            .field("thread_id", &self.thread_id)
            .field("max_steps", &self.max_steps)
            .field("token_threshold", &self.token_threshold)
            .field("keep_messages", &self.keep_messages)
            .field("eviction_limit", &self.eviction_limit)
            .field("subagents", &self.subagents)
            .field("enable_planning", &self.enable_planning)
            .field("enable_filesystem", &self.enable_filesystem)
            .finish()
    }
}
