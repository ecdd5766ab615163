//! Storage seams for the journal.
//!
//! The reconciliation core only talks to these traits. The SQLite adapter in
//! [`crate::db::store`] implements both; tests can wrap it to inject failures.

use chrono::NaiveDate;

use super::clarify::{ClarificationState, CommitPlan};
use super::types::{Entry, StructuredRecord};
use crate::error::Result;

/// Append-only store of committed journal entries.
pub trait EntryStore: Send + Sync {
    /// Persist one entry atomically and return its id.
    fn append(
        &self,
        prompt: &str,
        structured: &StructuredRecord,
        journal_date: NaiveDate,
    ) -> Result<String>;

    /// Entries filed under `date`, oldest first.
    fn query_by_date(&self, date: NaiveDate) -> Result<Vec<Entry>>;

    /// Entries with at least one schedule item dated within
    /// `[from, from + horizon_days]`, oldest first.
    fn query_future_events(&self, from: NaiveDate, horizon_days: u32) -> Result<Vec<Entry>>;

    /// Every entry, oldest first.
    fn query_all(&self) -> Result<Vec<Entry>>;

    /// Remove every stored schedule item whose task key equals `task_key`.
    /// Returns the number of items removed.
    fn purge_schedule_item(&self, task_key: &str) -> Result<usize>;

    /// Remove every stored relationship mention whose name key equals
    /// `name_key`. Returns the number of mentions removed.
    fn purge_relationship(&self, name_key: &str) -> Result<usize>;

    /// Case-insensitive substring search over prompts and record text,
    /// newest first.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Entry>>;

    /// Apply a resolved plan for `session` as one write: purge the plan's
    /// task keys, append its record, and reset the session's clarification
    /// state to idle. Returns the new entry id.
    fn commit(&self, plan: &CommitPlan, session: &str) -> Result<String>;
}

/// Per-session clarification state.
pub trait SessionStore: Send + Sync {
    /// The stored state, or `Idle` for an unknown session.
    fn load_session(&self, session: &str) -> Result<ClarificationState>;

    fn save_session(&self, session: &str, state: &ClarificationState) -> Result<()>;
}
