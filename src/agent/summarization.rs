//! History summarization: compress the older part of the message buffer
//! into one model-generated summary message.

use std::sync::Arc;

use crate::language_models::{ChatModel, ModelError, ModelRequest};
use crate::schemas::{Message, MessageRole};
use crate::utils::estimate_tokens;

/// Default token threshold that triggers summarization.
pub const DEFAULT_TOKEN_THRESHOLD: usize = 170_000;

/// Hard ceiling for the configurable threshold.
pub const MAX_TOKEN_THRESHOLD: usize = 200_000;

/// How many recent messages survive summarization untouched.
pub const DEFAULT_KEEP_MESSAGES: usize = 6;

const SUMMARIZATION_PROMPT: &str = "Summarize the following conversation history, preserving key \
information: decisions made, file paths touched, open questions, and any state the assistant \
needs to continue the task.";

/// Estimated token footprint of the whole buffer.
pub fn estimate_buffer_tokens(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|m| {
            let text = m.text();
            let calls: usize = m
                .tool_calls()
                .iter()
                .map(|(_, name, args)| name.len() + args.to_string().len())
                .sum();
            estimate_tokens(&text) + calls.div_ceil(crate::utils::CHARS_PER_TOKEN)
        })
        .sum()
}

fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::System => "system",
                MessageRole::Tool => "tool",
            };
            let calls = m
                .tool_calls()
                .iter()
                .map(|(_, name, args)| format!(" [called {} with {}]", name, args))
                .collect::<String>();
            format!("{}: {}{}", role, m.text(), calls)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summarize `messages` when they exceed `threshold` estimated tokens.
///
/// The last `keep` messages survive verbatim; the split point moves earlier
/// if it would separate a tool result from the assistant message that
/// issued the call. Buffers at or under the threshold, or shorter than
/// `keep`, come back unchanged — calling twice in a row is a no-op the
/// second time.
pub async fn maybe_summarize(
    messages: Vec<Message>,
    model: &Arc<dyn ChatModel>,
    threshold: usize,
    keep: usize,
) -> Result<Vec<Message>, ModelError> {
    let threshold = threshold.min(MAX_TOKEN_THRESHOLD);
    if messages.len() <= keep || estimate_buffer_tokens(&messages) <= threshold {
        return Ok(messages);
    }

    let mut split = messages.len() - keep;
    // Never strand a tool result from its tool call.
    while split > 0 && messages[split].role == MessageRole::Tool {
        split -= 1;
    }
    if split == 0 {
        return Ok(messages);
    }

    log::info!(
        "summarizing {} of {} messages (buffer over {} tokens)",
        split,
        messages.len(),
        threshold
    );
    let transcript = render_transcript(&messages[..split]);
    let request = ModelRequest::new(vec![
        Message::system(SUMMARIZATION_PROMPT),
        Message::user(transcript),
    ]);
    let summary_text = model.generate(request).await?;

    let mut out = Vec::with_capacity(1 + messages.len() - split);
    out.push(Message::summary(format!(
        "Summary of the earlier conversation:\n{}",
        summary_text
    )));
    out.extend(messages[split..].iter().cloned());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use serde_json::json;

    use crate::language_models::{ModelStream, StreamPart, Usage};
    use crate::schemas::ContentPart;

    struct FixedSummary;

    #[async_trait]
    impl ChatModel for FixedSummary {
        async fn stream(&self, _request: ModelRequest) -> Result<ModelStream, ModelError> {
            Ok(Box::pin(stream::iter(vec![
                Ok(StreamPart::TextDelta {
                    text: "condensed history".to_string(),
                }),
                Ok(StreamPart::Finish {
                    usage: Usage::default(),
                }),
            ])))
        }
    }

    fn chatty(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question {} {}", i, "x".repeat(100)))
                } else {
                    Message::assistant(format!("answer {} {}", i, "y".repeat(100)))
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_buffer_under_threshold_unchanged() {
        let model: Arc<dyn ChatModel> = Arc::new(FixedSummary);
        let messages = chatty(12);
        let out = maybe_summarize(messages.clone(), &model, 1_000_000, 6)
            .await
            .unwrap();
        assert_eq!(out, messages);
    }

    #[tokio::test]
    async fn test_summarize_keeps_last_n_plus_summary() {
        let model: Arc<dyn ChatModel> = Arc::new(FixedSummary);
        let messages = chatty(12);
        let out = maybe_summarize(messages.clone(), &model, 10, 6).await.unwrap();
        assert_eq!(out.len(), 7);
        assert!(out[0].summary);
        assert_eq!(out[0].role, MessageRole::System);
        assert_eq!(out[1..], messages[6..]);
    }

    #[tokio::test]
    async fn test_summarize_is_idempotent_under_threshold() {
        let model: Arc<dyn ChatModel> = Arc::new(FixedSummary);
        let once = maybe_summarize(chatty(12), &model, 10, 6).await.unwrap();
        // The compressed buffer is now small; a second pass changes nothing.
        let twice = maybe_summarize(once.clone(), &model, 1_000_000, 6)
            .await
            .unwrap();
        assert_eq!(twice, once);
    }

    #[tokio::test]
    async fn test_split_never_strands_tool_results() {
        let model: Arc<dyn ChatModel> = Arc::new(FixedSummary);
        let mut messages = chatty(6);
        messages.push(Message::assistant_parts(vec![ContentPart::ToolCall {
            id: "call_1".to_string(),
            name: "ls".to_string(),
            args: json!({}),
        }]));
        messages.push(Message::tool_result("call_1", "a\nb"));
        messages.extend(chatty(4));
        // keep = 5 would split between the tool call (index 6) and its
        // result (index 7); the boundary must back up to the call.
        let out = maybe_summarize(messages, &model, 10, 5).await.unwrap();
        let first_kept = &out[1];
        assert!(first_kept.has_tool_calls());
    }

    #[tokio::test]
    async fn test_short_buffer_skipped() {
        let model: Arc<dyn ChatModel> = Arc::new(FixedSummary);
        let messages = chatty(4);
        let out = maybe_summarize(messages.clone(), &model, 1, 6).await.unwrap();
        assert_eq!(out, messages);
    }
}
