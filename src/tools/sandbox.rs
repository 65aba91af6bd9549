//! Sandbox capability for the optional `execute` tool.

use std::time::Duration;

use async_trait::async_trait;

/// Outcome of one sandboxed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Pass-through interface to whatever isolation the host provides. The
/// harness never runs shell code itself; it only forwards the command and
/// formats the outcome.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn exec(&self, command: &str, timeout: Duration) -> Result<ExecOutcome, String>;
}
