use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchJournalParams {
    #[schemars(description = "Text to look for (case-insensitive) in entries, tasks, people and thoughts")]
    pub query: String,

    #[schemars(description = "Maximum number of entries to return. Defaults to the configured search limit.")]
    pub limit: Option<usize>,
}
