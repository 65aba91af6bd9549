//! Tool-result eviction: park oversized results in the filesystem and leave
//! a pointer in the message buffer.

use std::sync::Arc;

use crate::backends::FileBackend;
use crate::utils::estimate_tokens;

/// Default eviction threshold in estimated tokens.
pub const DEFAULT_EVICTION_LIMIT: usize = 20_000;

/// Virtual directory receiving evicted results.
pub const EVICTION_DIR: &str = "/tool-results";

/// Replace `result` with a short notice when it exceeds `limit` tokens,
/// after writing the full text to the backend. The result is never lost:
/// on a write failure the original text is kept in the buffer.
pub async fn maybe_evict(
    result: String,
    tool_name: &str,
    tool_call_id: &str,
    backend: &Arc<dyn FileBackend>,
    limit: usize,
) -> String {
    if estimate_tokens(&result) <= limit {
        return result;
    }
    let path = format!("{}/{}-{}.txt", EVICTION_DIR, tool_name, tool_call_id);
    let write = backend.write(&path, &result).await;
    match write.error {
        None => {
            log::debug!("evicted {} chars of {} output to {}", result.len(), tool_name, path);
            format!(
                "Tool result too large for the context window ({} chars). Full output saved to {} — use read_file to inspect it.",
                result.len(),
                path
            )
        }
        Some(e) => {
            log::warn!("failed to evict tool result to {}: {}", path, e);
            result
        }
    }
}
