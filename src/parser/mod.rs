//! Turning free text into a [`StructuredRecord`].
//!
//! The language understanding itself lives in an external agent; this module
//! only defines the seam ([`EntryParser`]) and the response handling shared by
//! implementations.

pub mod agent;

use serde_json::Value;

use crate::error::{JournalError, Result};
use crate::journal::types::StructuredRecord;

pub use agent::AgentParser;

/// Text in, validated record out. Must not panic on bad input.
pub trait EntryParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<StructuredRecord>;
}

/// Pull the structured record out of an agent response body.
///
/// The body is a JSON array of chat messages. The last message with role
/// `assistant` carries the record, either as a JSON object or as a string
/// holding JSON (optionally wrapped in a markdown code fence).
pub fn extract_record(body: &str) -> Result<StructuredRecord> {
    let messages: Value = serde_json::from_str(body)
        .map_err(|e| JournalError::ParseFailure(format!("agent response is not JSON: {e}")))?;
    let messages = messages
        .as_array()
        .ok_or_else(|| JournalError::ParseFailure("agent response is not a message list".into()))?;

    let content = messages
        .iter()
        .rev()
        .find(|m| m.get("role").and_then(Value::as_str) == Some("assistant"))
        .and_then(|m| m.get("content"))
        .ok_or_else(|| JournalError::ParseFailure("no assistant message returned".into()))?;

    let record = match content {
        Value::String(text) => serde_json::from_str(strip_code_fence(text)).map_err(|e| {
            JournalError::ParseFailure(format!("assistant content is not valid JSON: {e}"))
        })?,
        other => other.clone(),
    };

    StructuredRecord::from_value(&record)
}

/// Strip a surrounding ```` ``` ```` or ```` ```json ```` fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
