//! HTTP client for the hosted structuring agent.

use std::time::Duration;

use serde_json::json;

use super::{extract_record, EntryParser};
use crate::config::AgentConfig;
use crate::error::{JournalError, Result};
use crate::journal::types::StructuredRecord;

/// Sends entry text to the agent runtime and validates the reply.
///
/// Uses the blocking client, so call it from a blocking context (the server
/// wraps journal calls in `spawn_blocking`).
pub struct AgentParser {
    endpoint: String,
    timeout: Duration,
}

impl AgentParser {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            endpoint: config.endpoint(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl EntryParser for AgentParser {
    fn parse(&self, text: &str) -> Result<StructuredRecord> {
        let payload = json!({
            "eventName": "messages",
            "eventInput": {"messages": [{"role": "user", "content": text}]},
        });

        // Built per call: the blocking client must not be dropped inside an
        // async runtime, and a parse only ever runs on a blocking thread.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| JournalError::ParseFailure(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(endpoint = %self.endpoint, chars = text.len(), "calling agent");
        let body = client
            .put(&self.endpoint)
            .json(&payload)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "agent call failed");
                JournalError::ParseFailure(format!("agent call failed: {e}"))
            })?;

        extract_record(&body)
    }
}
