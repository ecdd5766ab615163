//! MCP `confirm_clarification` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `confirm_clarification` MCP tool.
///
/// `decisions` is kept as raw JSON here and decoded into
/// [`crate::journal::Decisions`] by the handler.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ConfirmClarificationParams {
    #[schemars(
        description = "Answers keyed by the flagged item's new_index. Shape: {\"relationships\": {\"0\": {\"action\": \"update\", \"candidate\": 0} | {\"action\": \"separate\"} | {\"action\": \"discard\"}}, \"schedule\": {\"1\": \"replace\" | \"keep_both\" | \"discard\"}, \"missing\": {\"2\": {\"event_date\": \"2025-05-03\", \"time\": \"15:00\"}}}. Every relationship and schedule conflict needs an answer; a missing item left out is dropped. Omit to retry a failed commit with the previous answers."
    )]
    pub decisions: Option<serde_json::Value>,
}
