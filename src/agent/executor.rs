//! The tool-loop driver: streams the model, dispatches tool calls, applies
//! eviction and summarization, and checkpoints after every step.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;

use crate::backends::{FileBackend, StateBackend};
use crate::language_models::{ChatModel, ModelRequest, StreamPart, ToolDescriptor};
use crate::persistence::{Checkpoint, Checkpointer};
use crate::schemas::{AgentEvent, ContentPart, EventEmitter, Message, MessageRole};
use crate::tools::{
    tool_descriptor, ApprovalDecision, EditFileTool, ExecuteTool, FetchUrlTool, GlobTool,
    GrepTool, HttpRequestTool, LsTool, ReadFileTool, TaskTool, Tool, ToolRuntime,
    ToolWithDescription, WebSearchTool, WriteFileTool, WriteTodosTool,
};

use super::approval::{gate_tools, DENIAL_MESSAGE};
use super::config::{AgentConfig, ModelMiddleware, SubagentSpec};
use super::eviction::maybe_evict;
use super::summarization::maybe_summarize;

/// Default system prompt when the caller supplies none.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a deep agent with planning, file system, and \
delegation tools. Use write_todos to break complex work into steps and track progress. Use ls, \
read_file, write_file, edit_file, glob, and grep to work inside the virtual filesystem. Use the \
task tool to delegate self-contained subtasks to subagents when available.";

/// Input for one invocation: a fresh user prompt or a full message list.
pub enum AgentInput {
    Prompt(String),
    Messages(Vec<Message>),
}

impl From<String> for AgentInput {
    fn from(prompt: String) -> Self {
        Self::Prompt(prompt)
    }
}

impl From<&str> for AgentInput {
    fn from(prompt: &str) -> Self {
        Self::Prompt(prompt.to_string())
    }
}

impl From<Vec<Message>> for AgentInput {
    fn from(messages: Vec<Message>) -> Self {
        Self::Messages(messages)
    }
}

/// Everything one loop (main or subagent) needs.
pub(crate) struct LoopEnv {
    pub model: Arc<dyn ChatModel>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub backend: Arc<dyn FileBackend>,
    pub emitter: EventEmitter,
    pub sandbox: Option<Arc<dyn crate::tools::Sandbox>>,
    pub web_search: Option<Arc<dyn crate::tools::WebSearchProvider>>,
    pub html_converter: Option<Arc<dyn crate::tools::HtmlConverter>>,
    pub http: reqwest::Client,
    pub checkpoint: Option<(Arc<dyn Checkpointer>, String)>,
    pub middleware: Vec<Arc<dyn ModelMiddleware>>,
    pub max_steps: usize,
    pub token_threshold: usize,
    pub keep_messages: usize,
    pub eviction_limit: usize,
}

/// How a loop ended. `Failed` has already emitted its `error` event (the
/// scoped subagent emitter swallows it, so the message rides along for the
/// parent's tool result).
pub(crate) enum LoopOutcome {
    Finished { text: String },
    MaxSteps { text: String },
    Cancelled,
    Failed { message: String },
}

impl LoopEnv {
    fn runtime_for(&self, tool_call_id: &str) -> ToolRuntime {
        ToolRuntime::new(
            Arc::clone(&self.backend),
            self.emitter.clone(),
            tool_call_id,
        )
        .with_sandbox(self.sandbox.clone())
        .with_web_search(self.web_search.clone())
        .with_html_converter(self.html_converter.clone())
        .with_http(self.http.clone())
    }

    /// Save a checkpoint for `step`. `Err` carries the outcome to bubble.
    async fn save_checkpoint(
        &self,
        messages: &[Message],
        step: u64,
    ) -> Result<(), LoopOutcome> {
        let Some((checkpointer, thread_id)) = &self.checkpoint else {
            return Ok(());
        };
        let state = self.backend.state_snapshot().await;
        let checkpoint = Checkpoint::new(thread_id.clone(), step, messages.to_vec(), state);
        if let Err(e) = checkpointer.save(&checkpoint).await {
            let message = format!("checkpoint save failed for thread {}: {}", thread_id, e);
            self.emitter
                .emit(AgentEvent::Error {
                    message: message.clone(),
                })
                .await;
            return Err(LoopOutcome::Failed { message });
        }
        if !self
            .emitter
            .emit(AgentEvent::CheckpointSaved {
                thread_id: thread_id.clone(),
                step,
            })
            .await
        {
            return Err(LoopOutcome::Cancelled);
        }
        Ok(())
    }

    async fn fail(&self, message: String) -> LoopOutcome {
        self.emitter
            .emit(AgentEvent::Error {
                message: message.clone(),
            })
            .await;
        LoopOutcome::Failed { message }
    }
}

/// Drive the loop until the model finishes, `max_steps` elapse, the
/// consumer goes away, or an unrecoverable error fires.
pub(crate) async fn run_loop(
    env: &LoopEnv,
    messages: &mut Vec<Message>,
    start_step: u64,
) -> LoopOutcome {
    let descriptors: Vec<ToolDescriptor> = env
        .tools
        .iter()
        .map(|t| tool_descriptor(t.as_ref()))
        .collect();
    let tool_map: HashMap<String, Arc<dyn Tool>> = env
        .tools
        .iter()
        .map(|t| (t.name(), Arc::clone(t)))
        .collect();

    let mut step = start_step;
    for _ in 0..env.max_steps {
        match maybe_summarize(
            std::mem::take(messages),
            &env.model,
            env.token_threshold,
            env.keep_messages,
        )
        .await
        {
            Ok(compacted) => *messages = compacted,
            Err(e) => return env.fail(format!("summarization failed: {}", e)).await,
        }

        if !env.emitter.emit(AgentEvent::StepStart { step }).await {
            return LoopOutcome::Cancelled;
        }

        let mut request = ModelRequest::new(messages.clone()).with_tools(descriptors.clone());
        for mw in &env.middleware {
            request = mw.before_model_call(request).await;
        }

        let mut stream = match env.model.stream(request).await {
            Ok(stream) => stream,
            Err(e) => return env.fail(format!("model call failed: {}", e)).await,
        };

        let mut text = String::new();
        let mut tool_calls: Vec<(String, String, Value)> = Vec::new();
        while let Some(part) = stream.next().await {
            match part {
                Ok(StreamPart::TextDelta { text: delta }) => {
                    if !env
                        .emitter
                        .emit(AgentEvent::Text {
                            text: delta.clone(),
                        })
                        .await
                    {
                        return LoopOutcome::Cancelled;
                    }
                    text.push_str(&delta);
                }
                Ok(StreamPart::ToolCall { id, name, args }) => {
                    tool_calls.push((id, name, args));
                }
                Ok(StreamPart::StepFinish) => break,
                Ok(StreamPart::Finish { usage }) => {
                    log::debug!(
                        "model finished step {} ({} in / {} out tokens)",
                        step,
                        usage.input_tokens,
                        usage.output_tokens
                    );
                    break;
                }
                Err(e) => return env.fail(format!("model stream failed: {}", e)).await,
            }
        }
        drop(stream);

        if !text.is_empty()
            && !env
                .emitter
                .emit(AgentEvent::TextSegment { text: text.clone() })
                .await
        {
            return LoopOutcome::Cancelled;
        }

        messages.push(assistant_message(&text, &tool_calls));

        if tool_calls.is_empty() {
            step += 1;
            if let Err(outcome) = env.save_checkpoint(messages, step).await {
                return outcome;
            }
            return LoopOutcome::Finished { text };
        }

        for (id, name, args) in tool_calls {
            let tool = tool_map.get(&name);
            let runtime = env.runtime_for(&id);

            // The approval decision is settled (and approval-requested /
            // approval-response emitted) before the call is announced.
            let decision = match tool {
                Some(tool) => tool.check_approval(&args, &runtime).await,
                None => ApprovalDecision::Approved,
            };

            if !env
                .emitter
                .emit(AgentEvent::ToolCall {
                    tool_call_id: id.clone(),
                    tool_name: name.clone(),
                    args: args.clone(),
                })
                .await
            {
                return LoopOutcome::Cancelled;
            }

            let result = match (tool, decision) {
                (None, _) => format!("Error: Tool '{}' not found", name),
                (Some(_), ApprovalDecision::Denied) => DENIAL_MESSAGE.to_string(),
                (Some(tool), ApprovalDecision::Approved) => {
                    match tool.run(args, &runtime).await {
                        Ok(result) => result,
                        Err(e) => {
                            log::info!("tool {} returned an error: {}", name, e);
                            format!("Error: {}", e)
                        }
                    }
                }
            };
            let result = maybe_evict(result, &name, &id, &env.backend, env.eviction_limit).await;

            messages.push(Message::tool_result(id.clone(), result.clone()));
            if !env
                .emitter
                .emit(AgentEvent::ToolResult {
                    tool_call_id: id,
                    tool_name: name,
                    content: result,
                })
                .await
            {
                return LoopOutcome::Cancelled;
            }
        }

        step += 1;
        if let Err(outcome) = env.save_checkpoint(messages, step).await {
            return outcome;
        }
    }

    log::warn!("loop reached max steps ({})", env.max_steps);
    let text = messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| m.text())
        .unwrap_or_default();
    LoopOutcome::MaxSteps { text }
}

fn assistant_message(text: &str, tool_calls: &[(String, String, Value)]) -> Message {
    if tool_calls.is_empty() {
        return Message::assistant(text);
    }
    let mut parts = Vec::with_capacity(tool_calls.len() + 1);
    if !text.is_empty() {
        parts.push(ContentPart::Text {
            text: text.to_string(),
        });
    }
    for (id, name, args) in tool_calls {
        parts.push(ContentPart::ToolCall {
            id: id.clone(),
            name: name.clone(),
            args: args.clone(),
        });
    }
    Message::assistant_parts(parts)
}

/// Built-in tool set for a config (before gating and user tools).
fn build_toolset(config: &AgentConfig) -> Vec<Arc<dyn Tool>> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    if config.enable_planning {
        tools.push(Arc::new(WriteTodosTool));
    }
    if config.enable_filesystem {
        tools.push(Arc::new(LsTool));
        tools.push(Arc::new(ReadFileTool));
        tools.push(Arc::new(WriteFileTool));
        tools.push(Arc::new(EditFileTool));
        tools.push(Arc::new(GlobTool));
        tools.push(Arc::new(GrepTool));
    }
    if config.sandbox.is_some() {
        tools.push(Arc::new(ExecuteTool));
    }
    if config.web_search.is_some() {
        tools.push(Arc::new(WebSearchTool));
    }
    if config.enable_web_fetch {
        tools.push(Arc::new(HttpRequestTool));
        tools.push(Arc::new(FetchUrlTool));
    }
    if !config.subagents.is_empty() {
        tools.push(Arc::new(TaskTool::new(
            config.subagents.clone(),
            Arc::clone(&config.model),
            config.on_approval_request.clone(),
            config.token_threshold,
            config.keep_messages,
            config.eviction_limit,
        )));
    }
    tools.extend(config.tools.iter().cloned());

    if config.custom_tool_descriptions.is_empty() {
        return tools;
    }
    tools
        .into_iter()
        .map(|tool| match config.custom_tool_descriptions.get(&tool.name()) {
            Some(description) => {
                Arc::new(ToolWithDescription::new(tool, description.clone())) as Arc<dyn Tool>
            }
            None => tool,
        })
        .collect()
}

/// Parse the final assistant text against the configured output schema.
fn parse_output(schema: &Value, text: &str) -> Option<Value> {
    let trimmed = text.trim();
    let candidate = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);
    let value: Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("final message is not valid JSON for the output schema: {}", e);
            return None;
        }
    };
    match jsonschema::JSONSchema::compile(schema) {
        Ok(compiled) if compiled.is_valid(&value) => Some(value),
        Ok(_) => {
            log::warn!("final message does not satisfy the output schema");
            None
        }
        Err(e) => {
            log::warn!("invalid output schema: {}", e);
            None
        }
    }
}

/// Drive one full invocation, emitting into `emitter`.
pub(crate) async fn drive(config: AgentConfig, input: AgentInput, emitter: EventEmitter) {
    let backend: Arc<dyn FileBackend> = config
        .backend
        .clone()
        .unwrap_or_else(|| Arc::new(StateBackend::new()));

    let mut messages: Vec<Message> = Vec::new();
    let mut start_step: u64 = 0;

    let checkpoint = match (&config.checkpointer, &config.thread_id) {
        (Some(checkpointer), Some(thread_id)) => {
            Some((Arc::clone(checkpointer), thread_id.clone()))
        }
        _ => None,
    };

    if let Some((checkpointer, thread_id)) = &checkpoint {
        match checkpointer.load(thread_id).await {
            Ok(Some(cp)) => {
                start_step = cp.step;
                messages = cp.messages;
                backend.restore_state(cp.state).await;
                if !emitter
                    .emit(AgentEvent::CheckpointLoaded {
                        thread_id: thread_id.clone(),
                        step: start_step,
                        messages_count: messages.len(),
                    })
                    .await
                {
                    return;
                }
            }
            Ok(None) => {}
            // A failed load starts the thread fresh; the next save overwrites.
            Err(e) => log::warn!("failed to load checkpoint for {}: {}", thread_id, e),
        }
    }

    match input {
        AgentInput::Prompt(prompt) => {
            if !emitter
                .emit(AgentEvent::UserMessage {
                    content: prompt.clone(),
                })
                .await
            {
                return;
            }
            messages.push(Message::user(prompt));
        }
        AgentInput::Messages(list) => messages.extend(list),
    }

    if !messages
        .iter()
        .any(|m| m.role == MessageRole::System && !m.summary)
    {
        let prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        messages.insert(0, Message::system(prompt));
    }

    let tools = gate_tools(
        build_toolset(&config),
        &config.interrupt_on,
        config.on_approval_request.clone(),
    );

    let env = LoopEnv {
        model: Arc::clone(&config.model),
        tools,
        backend,
        emitter: emitter.clone(),
        sandbox: config.sandbox.clone(),
        web_search: config.web_search.clone(),
        html_converter: config.html_converter.clone(),
        http: reqwest::Client::new(),
        checkpoint,
        middleware: config.middleware.clone(),
        max_steps: config.max_steps,
        token_threshold: config.token_threshold,
        keep_messages: config.keep_messages,
        eviction_limit: config.eviction_limit,
    };

    match run_loop(&env, &mut messages, start_step).await {
        LoopOutcome::Finished { text } | LoopOutcome::MaxSteps { text } => {
            let output = config
                .output_schema
                .as_ref()
                .and_then(|schema| parse_output(schema, &text));
            let state = env.backend.state_snapshot().await;
            emitter
                .emit(AgentEvent::Done {
                    text,
                    state,
                    output,
                })
                .await;
        }
        LoopOutcome::Cancelled | LoopOutcome::Failed { .. } => {}
    }
}

/// Run one subagent to completion and return its final text. Shares the
/// parent's backend; isolates messages, tools, and gating.
pub(crate) async fn run_subagent(
    spec: &SubagentSpec,
    prompt: String,
    runtime: &ToolRuntime,
    default_model: &Arc<dyn ChatModel>,
    callback: Option<super::approval::ApprovalCallback>,
    token_threshold: usize,
    keep_messages: usize,
    eviction_limit: usize,
) -> Result<String, String> {
    let tools = if spec.tools.is_empty() {
        default_subagent_tools()
    } else {
        spec.tools.clone()
    };
    let tools = match &spec.interrupt_on {
        Some(interrupt_on) => gate_tools(tools, interrupt_on, callback),
        None => tools,
    };

    let env = LoopEnv {
        model: spec
            .model
            .clone()
            .unwrap_or_else(|| Arc::clone(default_model)),
        tools,
        backend: Arc::clone(&runtime.backend),
        emitter: runtime.emitter.scoped(spec.name.as_str()),
        sandbox: runtime.sandbox.clone(),
        web_search: runtime.web_search.clone(),
        html_converter: runtime.html_converter.clone(),
        http: runtime.http.clone(),
        checkpoint: None,
        middleware: Vec::new(),
        max_steps: spec.max_steps,
        token_threshold,
        keep_messages,
        eviction_limit,
    };

    let mut messages = vec![Message::system(spec.system_prompt.clone()), Message::user(prompt)];
    match run_loop(&env, &mut messages, 0).await {
        LoopOutcome::Finished { text } | LoopOutcome::MaxSteps { text } => Ok(text),
        LoopOutcome::Cancelled => Err("run cancelled".to_string()),
        LoopOutcome::Failed { message } => Err(message),
    }
}

/// The default tool set a subagent gets when its spec lists none.
fn default_subagent_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(WriteTodosTool) as Arc<dyn Tool>,
        Arc::new(LsTool),
        Arc::new(ReadFileTool),
        Arc::new(WriteFileTool),
        Arc::new(EditFileTool),
        Arc::new(GlobTool),
        Arc::new(GrepTool),
    ]
}
