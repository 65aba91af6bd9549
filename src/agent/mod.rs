//! The agent core: configuration, the approval gate, context-window
//! management, and the streaming tool-loop driver.
//!
//! A [DeepAgent] wraps an [AgentConfig]. Each call to [DeepAgent::run]
//! drives one invocation on a spawned task and returns the event stream;
//! dropping the stream cancels the invocation at its next suspension
//! point. Two agents may run concurrently as long as they do not share a
//! backend without its own serialization.

mod config;
pub use config::{
    AgentConfig, ModelMiddleware, SubagentSpec, DEFAULT_MAX_STEPS, DEFAULT_SUBAGENT_MAX_STEPS,
};

mod approval;
pub use approval::{
    ApprovalCallback, ApprovalGate, ApprovalPredicate, ApprovalRequest, InterruptPolicy,
    DENIAL_MESSAGE,
};

mod eviction;
pub use eviction::{maybe_evict, DEFAULT_EVICTION_LIMIT, EVICTION_DIR};

mod summarization;
pub use summarization::{
    estimate_buffer_tokens, maybe_summarize, DEFAULT_KEEP_MESSAGES, DEFAULT_TOKEN_THRESHOLD,
    MAX_TOKEN_THRESHOLD,
};

pub(crate) mod executor;
pub use executor::{AgentInput, DEFAULT_SYSTEM_PROMPT};

use crate::schemas::{AgentEventStream, EventEmitter};

/// Channel capacity for the event stream. Small on purpose: the producer
/// blocks when the consumer stops draining.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// A configured deep agent. Cheap to clone per invocation via the config.
pub struct DeepAgent {
    config: AgentConfig,
}

impl DeepAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one invocation. Accepts a prompt string or a full message list;
    /// returns the event stream for this invocation.
    pub fn run(&self, input: impl Into<AgentInput>) -> AgentEventStream {
        let (emitter, receiver) = EventEmitter::channel(EVENT_CHANNEL_CAPACITY);
        let config = self.config.clone();
        let input = input.into();
        tokio::spawn(async move {
            executor::drive(config, input, emitter).await;
        });
        AgentEventStream::new(receiver)
    }
}

/// Build an agent straight from a config.
pub fn create_deep_agent(config: AgentConfig) -> DeepAgent {
    DeepAgent::new(config)
}
