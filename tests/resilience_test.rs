mod helpers;

use std::sync::Arc;

use helpers::{day, people, StubParser, SESSION};
use me_journal::db::{self, SqliteStore};
use me_journal::error::JournalError;
use me_journal::journal::{EntryStore, Relationship, SubmitOutcome};
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");

    // Should not exist yet
    assert!(!db_path.exists());

    let conn = db::open_database(&db_path).unwrap();

    // Should have been created
    assert!(db_path.exists());

    // Should be functional
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_database(&db_path).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn malformed_structured_json_is_rejected_by_the_table() {
    let conn = helpers::test_db();
    let result = conn.execute(
        "INSERT INTO entries (id, prompt, structured, journal_date, created_at) \
         VALUES ('x', 'p', 'not json', '2025-05-02', '2025-05-02T00:00:00Z')",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn health_check_counts_entries_sessions_and_log() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("journal.db");
    let store = Arc::new(SqliteStore::new(db::open_database(&db_path).unwrap()));
    store
        .append("met John", &people(vec![Relationship::new("John").with_role("Friend")]), day(2))
        .unwrap();
    let parser = Arc::new(StubParser::new().on(
        "john at work",
        people(vec![Relationship::new("John").with_role("Colleague")]),
    ));
    let j = helpers::journal(store.clone(), parser);
    j.submit(SESSION, "john at work", day(2), day(2)).unwrap();

    let conn = helpers::test_db();
    let empty = db::check_database_health(&conn).unwrap();
    assert!(empty.integrity_ok);
    assert!(!empty.sqlite_version.is_empty());
    assert_eq!(empty.entry_count, 0);
    assert_eq!(empty.log_count, 0);

    // a second connection sees the committed state through WAL
    let report = db::check_database_health(&db::open_database(&db_path).unwrap()).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.entry_count, 1);
    assert_eq!(report.session_count, 1);
    assert_eq!(report.pending_sessions, 1);
    assert_eq!(report.log_count, 1);
}

#[test]
fn entries_and_pending_state_persist_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("journal.db");
    let parser = Arc::new(
        StubParser::new()
            .on("met John", people(vec![Relationship::new("John").with_role("Friend")]))
            .on("john at work", people(vec![Relationship::new("John").with_role("Colleague")])),
    );

    {
        let store = Arc::new(SqliteStore::new(db::open_database(&db_path).unwrap()));
        let j = helpers::journal(store, parser.clone());
        assert!(matches!(
            j.submit(SESSION, "met John", day(2), day(2)).unwrap(),
            SubmitOutcome::Saved(_)
        ));
        assert!(matches!(
            j.submit(SESSION, "john at work", day(2), day(2)).unwrap(),
            SubmitOutcome::NeedsClarification(_)
        ));
    }

    let store = Arc::new(SqliteStore::new(db::open_database(&db_path).unwrap()));
    assert_eq!(store.query_all().unwrap().len(), 1);
    let j = helpers::journal(store, parser);
    let pending = j.pending(SESSION).unwrap().expect("pending survives reopen");
    assert_eq!(pending.assessment.relationship_conflicts[0].labels, vec!["role"]);
}

#[test]
fn corrupt_session_row_is_reported_until_cancelled() {
    let conn = helpers::test_db();
    conn.execute(
        "INSERT INTO sessions (id, state, updated_at) \
         VALUES (?1, '{\"state\":\"bogus\"}', 'now')",
        [SESSION],
    )
    .unwrap();
    let store = Arc::new(SqliteStore::new(conn));
    let parser = Arc::new(StubParser::new().on("hello", people(vec![Relationship::new("Priya")])));
    let j = helpers::journal(store, parser.clone());

    let err = j.pending(SESSION).unwrap_err();
    assert!(matches!(err, JournalError::StorageFailure(_)));
    assert!(j.submit(SESSION, "hello", day(2), day(2)).is_err());
    assert_eq!(parser.calls(), 0);

    assert!(j.cancel(SESSION).unwrap());
    assert!(j.pending(SESSION).unwrap().is_none());
    assert!(matches!(
        j.submit(SESSION, "hello", day(2), day(2)).unwrap(),
        SubmitOutcome::Saved(_)
    ));
}
