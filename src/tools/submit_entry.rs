//! MCP `submit_entry` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `submit_entry` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SubmitEntryParams {
    #[schemars(description = "Free-text journal entry, e.g. 'Lunch with Alice at 1pm, she moved to Berlin'")]
    pub text: String,

    #[schemars(
        description = "Day this entry is for (YYYY-MM-DD or DD/MM/YYYY). Defaults to today. Used as the journal date when the schedule does not name a single day."
    )]
    pub date: Option<String>,
}
