//! # deepagents
//!
//! Turn any chat-style language model into a long-running, tool-using
//! **deep agent**: an autonomous tool loop with todo planning, a pluggable
//! virtual filesystem, ephemeral subagents, per-thread checkpointing,
//! human-in-the-loop approval, and context-window management (tool-result
//! eviction and history summarization).
//!
//! The provider stays outside the crate: implement
//! [ChatModel](language_models::ChatModel) for your SDK of choice and hand
//! it to [AgentConfig](agent::AgentConfig).
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use deepagents::agent::{AgentConfig, DeepAgent};
//! use deepagents::persistence::InMemorySaver;
//! use tokio_stream::StreamExt;
//!
//! let config = AgentConfig::new(model)
//!     .with_checkpointer(Arc::new(InMemorySaver::new()))
//!     .with_thread_id("thread-1")
//!     .with_interrupt_on("write_file", true);
//! let agent = DeepAgent::new(config);
//!
//! let mut events = agent.run("Summarize the notes in /docs");
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//! }
//! ```

pub mod agent;
pub mod backends;
pub mod error;
pub mod language_models;
pub mod persistence;
pub mod schemas;
pub mod tools;
pub mod utils;

pub use agent::{AgentConfig, DeepAgent};
pub use schemas::{AgentEvent, AgentEventStream, AgentState, Message, Todo};
