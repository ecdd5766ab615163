//! SQLite-backed [`EntryStore`] and [`SessionStore`].

use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::Connection;

use super::{entries, sessions};
use crate::error::{JournalError, Result};
use crate::journal::clarify::{ClarificationState, CommitPlan};
use crate::journal::store::{EntryStore, SessionStore};
use crate::journal::types::{Entry, StructuredRecord};

/// One connection behind a mutex, shared by entry and session access.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| JournalError::StorageFailure(format!("lock poisoned: {e}")))
    }
}

impl EntryStore for SqliteStore {
    fn append(
        &self,
        prompt: &str,
        structured: &StructuredRecord,
        journal_date: NaiveDate,
    ) -> Result<String> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = entries::append_entry(&tx, prompt, structured, journal_date)?;
        tx.commit()?;
        Ok(id)
    }

    fn query_by_date(&self, date: NaiveDate) -> Result<Vec<Entry>> {
        let conn = self.lock()?;
        entries::entries_by_date(&conn, date)
    }

    fn query_future_events(&self, from: NaiveDate, horizon_days: u32) -> Result<Vec<Entry>> {
        let conn = self.lock()?;
        entries::entries_with_future_events(&conn, from, horizon_days)
    }

    fn query_all(&self) -> Result<Vec<Entry>> {
        let conn = self.lock()?;
        entries::all_entries(&conn)
    }

    fn purge_schedule_item(&self, task_key: &str) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = entries::purge_schedule_item(&tx, task_key)?;
        tx.commit()?;
        tracing::info!(task = task_key, removed, "purged schedule items");
        Ok(removed)
    }

    fn purge_relationship(&self, name_key: &str) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = entries::purge_relationship(&tx, name_key)?;
        tx.commit()?;
        tracing::info!(name = name_key, removed, "purged relationship mentions");
        Ok(removed)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<Entry>> {
        let conn = self.lock()?;
        entries::search_entries(&conn, query, limit)
    }

    fn commit(&self, plan: &CommitPlan, session: &str) -> Result<String> {
        let mut conn = self.lock()?;
        entries::commit_plan(&mut conn, plan, session)
    }
}

impl SessionStore for SqliteStore {
    fn load_session(&self, session: &str) -> Result<ClarificationState> {
        let conn = self.lock()?;
        sessions::load_session(&conn, session)
    }

    fn save_session(&self, session: &str, state: &ClarificationState) -> Result<()> {
        let conn = self.lock()?;
        sessions::save_session(&conn, session, state)
    }
}
