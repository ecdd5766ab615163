use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct JournalDayParams {
    #[schemars(description = "Day to show (YYYY-MM-DD). Defaults to today.")]
    pub date: Option<String>,
}
