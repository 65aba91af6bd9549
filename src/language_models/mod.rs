//! Provider-agnostic model interface.
//!
//! The loop only requires a streaming generate with tool-call semantics:
//! given messages and tool descriptors, the model yields text deltas and
//! tool calls, closing each step with a boundary marker and the whole call
//! with a terminal usage record. Provider SDKs implement [ChatModel]
//! outside this crate.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::schemas::Message;

/// Errors surfaced by a model provider.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Request error: {0}")]
    Request(String),
}

/// Token accounting reported by the terminal stream part.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Tool surface advertised to the model: name, description, JSON-schema
/// input descriptor.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One request to the model.
#[derive(Clone, Debug)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDescriptor>,
}

impl ModelRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }
}

/// One part of a streamed model response.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamPart {
    TextDelta { text: String },
    ToolCall { id: String, name: String, args: Value },
    /// Boundary after a batch of tool calls within one response.
    StepFinish,
    /// Terminal part carrying usage metrics.
    Finish { usage: Usage },
}

pub type ModelStream = Pin<Box<dyn Stream<Item = Result<StreamPart, ModelError>> + Send>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Stream one response for the given messages and tools.
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, ModelError>;

    /// Collect a full text response; used internally for summarization.
    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError> {
        let mut stream = self.stream(request).await?;
        let mut text = String::new();
        while let Some(part) = stream.next().await {
            if let StreamPart::TextDelta { text: delta } = part? {
                text.push_str(&delta);
            }
        }
        Ok(text)
    }
}
