//! Web tools: search (via a provider), raw HTTP requests, and URL fetching.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use crate::schemas::AgentEvent;
use crate::tools::{optional_str, require_str, Tool, ToolError, ToolRuntime};

/// Network-bound tools share one timeout.
pub(crate) const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// One web search hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// External search capability; the harness never talks to a search API
/// directly.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, String>;
}

/// External HTML-to-Markdown conversion; when absent, fetched pages come
/// back as raw text.
pub trait HtmlConverter: Send + Sync {
    fn convert(&self, html: &str) -> String;
}

pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> String {
        "web_search".to_string()
    }

    fn description(&self) -> String {
        "Search the web and return result titles, URLs, and snippets.".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" }
            },
            "required": ["query"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let query = require_str(&input, "query")?;
        let provider = runtime.web_search.clone().ok_or_else(|| {
            ToolError::ConfigurationError("web_search requires a search provider".to_string())
        })?;
        runtime
            .emitter
            .emit(AgentEvent::WebSearchStart {
                query: query.clone(),
            })
            .await;
        let results = match tokio::time::timeout(NETWORK_TIMEOUT, provider.search(&query)).await {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                runtime
                    .emitter
                    .emit(AgentEvent::WebSearchFinish {
                        query: query.clone(),
                        results: 0,
                    })
                    .await;
                return Ok(format!("Error: Web search failed: {}", e));
            }
            Err(_) => {
                runtime
                    .emitter
                    .emit(AgentEvent::WebSearchFinish {
                        query: query.clone(),
                        results: 0,
                    })
                    .await;
                return Ok("Error: Web search timed out after 30 seconds".to_string());
            }
        };
        runtime
            .emitter
            .emit(AgentEvent::WebSearchFinish {
                query: query.clone(),
                results: results.len(),
            })
            .await;
        if results.is_empty() {
            return Ok(format!("No results for '{}'", query));
        }
        Ok(results
            .iter()
            .map(|r| format!("{}\n{}\n{}", r.title, r.url, r.snippet))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

pub struct HttpRequestTool;

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> String {
        "http_request".to_string()
    }

    fn description(&self) -> String {
        "Make an HTTP request and return the status and body.".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Request URL" },
                "method": { "type": "string", "description": "HTTP method; defaults to GET" },
                "headers": { "type": "object", "description": "Request headers" },
                "body": { "type": "string", "description": "Request body" }
            },
            "required": ["url"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let url = require_str(&input, "url")?;
        if let Err(e) = Url::parse(&url) {
            return Ok(format!("Error: Invalid URL '{}': {}", url, e));
        }
        let method = optional_str(&input, "method")
            .unwrap_or_else(|| "GET".to_string())
            .to_uppercase();
        let method = match reqwest::Method::from_bytes(method.as_bytes()) {
            Ok(m) => m,
            Err(_) => return Ok(format!("Error: Invalid HTTP method '{}'", method)),
        };

        runtime
            .emitter
            .emit(AgentEvent::HttpRequestStart {
                url: url.clone(),
                method: method.to_string(),
            })
            .await;

        let mut request = runtime
            .http
            .request(method, &url)
            .timeout(NETWORK_TIMEOUT);
        if let Some(headers) = input.get("headers").and_then(Value::as_object) {
            for (name, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(name, v);
                }
            }
        }
        if let Some(body) = optional_str(&input, "body") {
            request = request.body(body);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                runtime
                    .emitter
                    .emit(AgentEvent::HttpRequestFinish {
                        url: url.clone(),
                        status: None,
                    })
                    .await;
                return Ok(format!("Error: HTTP request failed: {}", e));
            }
        };
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        runtime
            .emitter
            .emit(AgentEvent::HttpRequestFinish {
                url: url.clone(),
                status: Some(status),
            })
            .await;
        Ok(format!("HTTP {}\n\n{}", status, body))
    }
}

pub struct FetchUrlTool;

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> String {
        "fetch_url".to_string()
    }

    fn description(&self) -> String {
        "Fetch a URL and return its content, converted to Markdown when a converter is available."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "URL to fetch" }
            },
            "required": ["url"]
        })
    }

    async fn run(&self, input: Value, runtime: &ToolRuntime) -> Result<String, ToolError> {
        let url = require_str(&input, "url")?;
        if let Err(e) = Url::parse(&url) {
            return Ok(format!("Error: Invalid URL '{}': {}", url, e));
        }
        runtime
            .emitter
            .emit(AgentEvent::FetchUrlStart { url: url.clone() })
            .await;
        let response = match runtime
            .http
            .get(&url)
            .timeout(NETWORK_TIMEOUT)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                runtime
                    .emitter
                    .emit(AgentEvent::FetchUrlFinish {
                        url: url.clone(),
                        bytes: 0,
                    })
                    .await;
                return Ok(format!("Error: Fetch failed: {}", e));
            }
        };
        let body = response.text().await.unwrap_or_default();
        let content = match &runtime.html_converter {
            Some(converter) => converter.convert(&body),
            None => body,
        };
        runtime
            .emitter
            .emit(AgentEvent::FetchUrlFinish {
                url: url.clone(),
                bytes: content.len(),
            })
            .await;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::StateBackend;
    use crate::schemas::EventEmitter;
    use std::sync::Arc;

    struct StaticSearch;

    #[async_trait]
    impl WebSearchProvider for StaticSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, String> {
            Ok(vec![SearchResult {
                url: "https://example.com".to_string(),
                title: "Example".to_string(),
                snippet: "An example result".to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn test_web_search_formats_results() {
        let (emitter, mut rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(Arc::new(StateBackend::new()), emitter, "call_1")
            .with_web_search(Some(Arc::new(StaticSearch)));
        let out = WebSearchTool
            .run(json!({ "query": "rust agents" }), &runtime)
            .await
            .unwrap();
        assert!(out.contains("Example"));
        assert!(out.contains("https://example.com"));
        assert!(matches!(
            rx.recv().await,
            Some(AgentEvent::WebSearchStart { .. })
        ));
        assert_eq!(
            rx.recv().await,
            Some(AgentEvent::WebSearchFinish {
                query: "rust agents".to_string(),
                results: 1
            })
        );
    }

    #[tokio::test]
    async fn test_http_request_rejects_bad_url() {
        let (emitter, _rx) = EventEmitter::channel(8);
        let runtime = ToolRuntime::new(Arc::new(StateBackend::new()), emitter, "call_1");
        let out = HttpRequestTool
            .run(json!({ "url": "not a url" }), &runtime)
            .await
            .unwrap();
        assert!(out.starts_with("Error: Invalid URL"));
    }
}
