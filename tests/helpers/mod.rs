#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveTime};
use me_journal::config::{JournalSettings, KnowledgeScope};
use me_journal::db::{self, SqliteStore};
use me_journal::error::{JournalError, Result};
use me_journal::journal::clarify::{ClarificationState, CommitPlan};
use me_journal::journal::{
    Entry, EntryStore, Journal, MindSpaceItem, Relationship, ScheduleItem, SessionStore,
    StructuredRecord,
};
use me_journal::parser::EntryParser;
use rusqlite::Connection;

pub const SESSION: &str = "test-session";

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

pub fn test_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::new(test_db()))
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
}

pub fn at(h: u32, m: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h, m, 0)
}

pub fn schedule(items: Vec<ScheduleItem>) -> StructuredRecord {
    StructuredRecord {
        schedule: items,
        ..Default::default()
    }
}

pub fn people(items: Vec<Relationship>) -> StructuredRecord {
    StructuredRecord {
        relationships: items,
        ..Default::default()
    }
}

pub fn thought(text: &str) -> MindSpaceItem {
    MindSpaceItem {
        thought: text.into(),
    }
}

/// Parser that answers from a fixed table of prompt -> record.
#[derive(Default)]
pub struct StubParser {
    records: Mutex<HashMap<String, StructuredRecord>>,
    calls: AtomicUsize,
}

impl StubParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, prompt: &str, record: StructuredRecord) -> Self {
        self.add(prompt, record);
        self
    }

    pub fn add(&self, prompt: &str, record: StructuredRecord) {
        self.records.lock().unwrap().insert(prompt.to_string(), record);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EntryParser for StubParser {
    fn parse(&self, text: &str) -> Result<StructuredRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .ok_or_else(|| JournalError::ParseFailure(format!("no stub record for {text:?}")))
    }
}

/// Store wrapper whose next commits or session saves fail with a storage error.
pub struct FlakyStore {
    pub inner: Arc<SqliteStore>,
    fail_commits: AtomicUsize,
    fail_saves: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_commits: AtomicUsize::new(0),
            fail_saves: AtomicUsize::new(0),
        })
    }

    pub fn fail_next_commits(&self, n: usize) {
        self.fail_commits.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_saves(&self, n: usize) {
        self.fail_saves.store(n, Ordering::SeqCst);
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl EntryStore for FlakyStore {
    fn append(
        &self,
        prompt: &str,
        structured: &StructuredRecord,
        journal_date: NaiveDate,
    ) -> Result<String> {
        self.inner.append(prompt, structured, journal_date)
    }
    fn query_by_date(&self, date: NaiveDate) -> Result<Vec<Entry>> {
        self.inner.query_by_date(date)
    }
    fn query_future_events(&self, from: NaiveDate, horizon_days: u32) -> Result<Vec<Entry>> {
        self.inner.query_future_events(from, horizon_days)
    }
    fn query_all(&self) -> Result<Vec<Entry>> {
        self.inner.query_all()
    }
    fn purge_schedule_item(&self, task_key: &str) -> Result<usize> {
        self.inner.purge_schedule_item(task_key)
    }
    fn purge_relationship(&self, name_key: &str) -> Result<usize> {
        self.inner.purge_relationship(name_key)
    }
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Entry>> {
        self.inner.search(query, limit)
    }
    fn commit(&self, plan: &CommitPlan, session: &str) -> Result<String> {
        if take_failure(&self.fail_commits) {
            return Err(JournalError::StorageFailure("disk I/O error".into()));
        }
        self.inner.commit(plan, session)
    }
}

impl SessionStore for FlakyStore {
    fn load_session(&self, session: &str) -> Result<ClarificationState> {
        self.inner.load_session(session)
    }
    fn save_session(&self, session: &str, state: &ClarificationState) -> Result<()> {
        if take_failure(&self.fail_saves) {
            return Err(JournalError::StorageFailure("session table locked".into()));
        }
        self.inner.save_session(session, state)
    }
}

pub fn settings(scope: KnowledgeScope) -> JournalSettings {
    JournalSettings {
        knowledge_scope: scope,
        ..Default::default()
    }
}

pub fn journal(store: Arc<SqliteStore>, parser: Arc<StubParser>) -> Journal {
    Journal::new(store.clone(), store, parser, JournalSettings::default())
}

pub fn journal_with(
    store: Arc<SqliteStore>,
    parser: Arc<StubParser>,
    settings: JournalSettings,
) -> Journal {
    Journal::new(store.clone(), store, parser, settings)
}
