pub mod confirm_clarification;
pub mod journal_day;
pub mod purge;
pub mod search_journal;
pub mod submit_entry;

use chrono::NaiveDate;
use confirm_clarification::ConfirmClarificationParams;
use journal_day::JournalDayParams;
use purge::{PurgePersonParams, PurgeTaskParams};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_journal::SearchJournalParams;
use std::sync::Arc;
use submit_entry::SubmitEntryParams;

use crate::journal::datetime::parse_date;
use crate::journal::{Decisions, Journal, SubmitOutcome};

/// The journal MCP tool handler. Holds the shared [`Journal`] and the session
/// id this connection's clarifications are filed under.
#[derive(Clone)]
pub struct JournalTools {
    tool_router: ToolRouter<Self>,
    journal: Arc<Journal>,
    session: String,
}

#[tool_router]
impl JournalTools {
    pub fn new(journal: Arc<Journal>, session: impl Into<String>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            journal,
            session: session.into(),
        }
    }

    /// Parse and file a free-text journal entry.
    #[tool(description = "Submit a free-text journal entry. It is parsed into schedule items, people and thoughts and checked against what is already known. Returns status 'saved' with the entry id, or 'needs_clarification' with the conflicts and missing fields to answer via confirm_clarification.")]
    async fn submit_entry(
        &self,
        Parameters(params): Parameters<SubmitEntryParams>,
    ) -> Result<String, String> {
        let today = today();
        let selected = day_or_today(params.date.as_deref())?;

        tracing::info!(
            session = %self.session,
            text_len = params.text.len(),
            date = %selected,
            "submit_entry called"
        );

        let text = params.text;
        let outcome = self
            .run("submit", move |journal, session| {
                journal.submit(session, &text, selected, today)
            })
            .await?;

        match &outcome {
            SubmitOutcome::Saved(saved) => {
                tracing::info!(entry_id = %saved.entry_id, "entry saved")
            }
            SubmitOutcome::NeedsClarification(p) => {
                tracing::info!(pending = %p.id, flagged = p.assessment.flagged(), "entry parked")
            }
        }

        to_json(&outcome)
    }

    /// Answer an open clarification and commit the entry.
    #[tool(description = "Answer the pending clarification for this session and commit the entry. Relationship conflicts take update (optionally naming a candidate index), separate, or discard; schedule conflicts take replace, keep_both, or discard; missing items take an event_date and time.")]
    async fn confirm_clarification(
        &self,
        Parameters(params): Parameters<ConfirmClarificationParams>,
    ) -> Result<String, String> {
        let decisions: Option<Decisions> = params
            .decisions
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| format!("invalid decisions: {e}"))?;

        tracing::info!(
            session = %self.session,
            retry = decisions.is_none(),
            "confirm_clarification called"
        );

        let saved = self
            .run("confirm", move |journal, session| journal.confirm(session, decisions))
            .await?;
        to_json(&saved)
    }

    /// Show the open clarification, if any.
    #[tool(description = "Show the pending clarification for this session: flagged conflicts with their candidates, and schedule items missing a date or time.")]
    async fn pending_clarification(&self) -> Result<String, String> {
        let pending = self
            .run("pending", |journal, session| journal.pending(session))
            .await?;
        Ok(match pending {
            Some(p) => serde_json::json!({ "status": "awaiting_input", "pending": p }),
            None => serde_json::json!({ "status": "idle" }),
        }
        .to_string())
    }

    /// Drop the open clarification.
    #[tool(description = "Discard the pending clarification for this session without saving anything.")]
    async fn cancel_clarification(&self) -> Result<String, String> {
        let cancelled = self
            .run("cancel", |journal, session| journal.cancel(session))
            .await?;
        Ok(serde_json::json!({ "cancelled": cancelled }).to_string())
    }

    /// The journal for one day.
    #[tool(description = "Show one day of the journal: schedule grouped into Morning, Afternoon, Evening, Night and Future, plus the people and thoughts recorded.")]
    async fn journal_day(
        &self,
        Parameters(params): Parameters<JournalDayParams>,
    ) -> Result<String, String> {
        let today = today();
        let date = day_or_today(params.date.as_deref())?;
        let view = self
            .run("view", move |journal, _| journal.view(date, today))
            .await?;
        to_json(&view)
    }

    /// Search past entries.
    #[tool(description = "Search journal entries by text (case-insensitive), newest first.")]
    async fn search_journal(
        &self,
        Parameters(params): Parameters<SearchJournalParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, "search_journal called");
        let query = params.query;
        let limit = params.limit;
        let entries = self
            .run("search", move |journal, _| journal.search(&query, limit))
            .await?;
        to_json(&serde_json::json!({ "total": entries.len(), "entries": entries }))
    }

    /// Remove a task everywhere.
    #[tool(description = "Remove every stored schedule item with this task name. Requires confirm=true as a safety gate.")]
    async fn purge_task(
        &self,
        Parameters(params): Parameters<PurgeTaskParams>,
    ) -> Result<String, String> {
        if params.confirm != Some(true) {
            return Err("purge_task requires confirm=true".into());
        }
        let task = params.task;
        let task_for_purge = task.clone();
        let removed = self
            .run("purge", move |journal, _| journal.purge_task(&task_for_purge))
            .await?;
        Ok(serde_json::json!({ "task": task, "removed": removed }).to_string())
    }

    /// Remove a person everywhere.
    #[tool(description = "Remove every stored mention of this person. Requires confirm=true as a safety gate.")]
    async fn purge_person(
        &self,
        Parameters(params): Parameters<PurgePersonParams>,
    ) -> Result<String, String> {
        if params.confirm != Some(true) {
            return Err("purge_person requires confirm=true".into());
        }
        let name = params.name;
        let name_for_purge = name.clone();
        let removed = self
            .run("purge", move |journal, _| journal.purge_person(&name_for_purge))
            .await?;
        Ok(serde_json::json!({ "name": name, "removed": removed }).to_string())
    }
}

impl JournalTools {
    /// Run a blocking journal call off the async runtime.
    async fn run<T, F>(&self, what: &'static str, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&Journal, &str) -> crate::error::Result<T> + Send + 'static,
    {
        let journal = Arc::clone(&self.journal);
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || f(&journal, &session))
            .await
            .map_err(|e| format!("{what} task failed: {e}"))?
            .map_err(|e| {
                if e.is_retryable() {
                    format!("{what} failed (retryable): {e}")
                } else {
                    format!("{what} failed: {e}")
                }
            })
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn day_or_today(raw: Option<&str>) -> Result<NaiveDate, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(today()),
        Some(s) => parse_date(s).ok_or_else(|| format!("invalid date: {s}")),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_handler]
impl ServerHandler for JournalTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "ME Journal keeps a personal journal. Use submit_entry to file free text; \
                 if it returns needs_clarification, ask the user the listed questions and \
                 answer with confirm_clarification. Use journal_day to read a day and \
                 search_journal to look things up."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_date_means_today() {
        assert_eq!(day_or_today(None).unwrap(), today());
        assert_eq!(day_or_today(Some("  ")).unwrap(), today());
    }

    #[test]
    fn dates_are_parsed_leniently() {
        let d = NaiveDate::from_ymd_opt(2025, 5, 3).unwrap();
        assert_eq!(day_or_today(Some("2025-05-03")).unwrap(), d);
        assert_eq!(day_or_today(Some("03/05/2025")).unwrap(), d);
        assert!(day_or_today(Some("someday")).is_err());
    }
}
