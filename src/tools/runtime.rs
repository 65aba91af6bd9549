use std::sync::Arc;

use crate::backends::FileBackend;
use crate::schemas::EventEmitter;

use super::sandbox::Sandbox;
use super::web::{HtmlConverter, WebSearchProvider};

/// Everything a tool can reach during one execution: the shared backend,
/// the event emitter, the current tool-call id, and optional provider
/// handles. Injected by the loop; never exposed in the model-facing schema.
///
/// Tools hold the backend by reference for the duration of one call only —
/// ownership stays with the agent core.
#[derive(Clone)]
pub struct ToolRuntime {
    pub backend: Arc<dyn FileBackend>,
    pub emitter: EventEmitter,
    pub tool_call_id: String,
    pub sandbox: Option<Arc<dyn Sandbox>>,
    pub web_search: Option<Arc<dyn WebSearchProvider>>,
    pub html_converter: Option<Arc<dyn HtmlConverter>>,
    pub http: reqwest::Client,
}

impl ToolRuntime {
    pub fn new(
        backend: Arc<dyn FileBackend>,
        emitter: EventEmitter,
        tool_call_id: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            emitter,
            tool_call_id: tool_call_id.into(),
            sandbox: None,
            web_search: None,
            html_converter: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_sandbox(mut self, sandbox: Option<Arc<dyn Sandbox>>) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_web_search(mut self, provider: Option<Arc<dyn WebSearchProvider>>) -> Self {
        self.web_search = provider;
        self
    }

    pub fn with_html_converter(mut self, converter: Option<Arc<dyn HtmlConverter>>) -> Self {
        self.html_converter = converter;
        self
    }

    pub fn with_http(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }
}
