//! MCP `purge_task` / `purge_person` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `purge_task` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PurgeTaskParams {
    #[schemars(description = "Task name to remove from every entry (case-insensitive)")]
    pub task: String,

    #[schemars(description = "Must be true. Safety gate for an irreversible delete.")]
    pub confirm: Option<bool>,
}

/// Parameters for the `purge_person` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PurgePersonParams {
    #[schemars(description = "Person name to remove from every entry (case-insensitive)")]
    pub name: String,

    #[schemars(description = "Must be true. Safety gate for an irreversible delete.")]
    pub confirm: Option<bool>,
}
