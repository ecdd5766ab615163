//! Entry table access: append, date queries, search, purges, and audit logging.
//!
//! Free functions over a `&Connection` so they run equally inside or outside a
//! transaction. [`commit_plan`] is the transactional write path used by the
//! clarification workflow.

use chrono::{Days, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, Params, Row};

use super::sessions;
use crate::error::{JournalError, Result};
use crate::journal::clarify::{ClarificationState, CommitPlan};
use crate::journal::keys::{normalize, relationship_key, schedule_key};
use crate::journal::types::{Entry, StructuredRecord};

const SELECT_ENTRIES: &str = "SELECT id, prompt, structured, journal_date, created_at FROM entries";

/// Raw row before JSON and date decoding.
struct EntryRow {
    id: String,
    prompt: String,
    structured: String,
    journal_date: String,
    created_at: String,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            prompt: row.get(1)?,
            structured: row.get(2)?,
            journal_date: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_entry(self) -> Result<Entry> {
        let structured: StructuredRecord = serde_json::from_str(&self.structured)
            .map_err(|e| JournalError::MalformedRecord(format!("entry {}: {e}", self.id)))?;
        let journal_date = NaiveDate::parse_from_str(&self.journal_date, "%Y-%m-%d").map_err(|e| {
            JournalError::MalformedRecord(format!("entry {}: bad journal_date: {e}", self.id))
        })?;
        Ok(Entry {
            id: self.id,
            prompt: self.prompt,
            structured,
            journal_date,
            created_at: self.created_at,
        })
    }
}

/// Fixed-width UTC timestamp so `created_at` sorts lexically.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encode(record: &StructuredRecord) -> Result<String> {
    serde_json::to_string(record)
        .map_err(|e| JournalError::StorageFailure(format!("failed to encode record: {e}")))
}

fn query_entries<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Entry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, EntryRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(EntryRow::into_entry).collect()
}

/// Insert one entry and its audit row. Returns the new UUID v7.
pub fn append_entry(
    conn: &Connection,
    prompt: &str,
    structured: &StructuredRecord,
    journal_date: NaiveDate,
) -> Result<String> {
    let id = uuid::Uuid::now_v7().to_string();
    let json = encode(structured)?;

    conn.execute(
        "INSERT INTO entries (id, prompt, structured, journal_date, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, prompt, json, journal_date.to_string(), now()],
    )?;

    let details = serde_json::json!({
        "journal_date": journal_date.to_string(),
        "schedule": structured.schedule.len(),
        "relationships": structured.relationships.len(),
        "mind_space": structured.mind_space.len(),
    });
    write_audit_log(conn, "append", &id, Some(&details))?;

    Ok(id)
}

/// Entries filed under `date`, oldest first.
pub fn entries_by_date(conn: &Connection, date: NaiveDate) -> Result<Vec<Entry>> {
    query_entries(
        conn,
        &format!("{SELECT_ENTRIES} WHERE journal_date = ?1 ORDER BY created_at, id"),
        params![date.to_string()],
    )
}

/// Entries with a schedule item dated in `[from, from + horizon_days]`,
/// oldest first.
pub fn entries_with_future_events(
    conn: &Connection,
    from: NaiveDate,
    horizon_days: u32,
) -> Result<Vec<Entry>> {
    let until = from
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .unwrap_or(NaiveDate::MAX);
    query_entries(
        conn,
        &format!(
            "{SELECT_ENTRIES} e WHERE EXISTS (\
                SELECT 1 FROM json_each(e.structured, '$.Schedule') s \
                WHERE json_extract(s.value, '$.event_date') BETWEEN ?1 AND ?2\
             ) ORDER BY created_at, id"
        ),
        params![from.to_string(), until.to_string()],
    )
}

/// Every entry, oldest first.
pub fn all_entries(conn: &Connection) -> Result<Vec<Entry>> {
    query_entries(conn, &format!("{SELECT_ENTRIES} ORDER BY created_at, id"), [])
}

/// Case-insensitive substring match over the prompt and every text field of
/// the record. Newest first, at most `limit` results.
pub fn search_entries(conn: &Connection, query: &str, limit: usize) -> Result<Vec<Entry>> {
    let needle = normalize(query);
    let mut stmt = conn.prepare(&format!("{SELECT_ENTRIES} ORDER BY created_at DESC, id DESC"))?;
    let mut rows = stmt.query([])?;

    let mut found = Vec::new();
    while found.len() < limit {
        let Some(row) = rows.next()? else { break };
        let entry = EntryRow::from_row(row)?.into_entry()?;
        if entry_matches(&entry, &needle) {
            found.push(entry);
        }
    }
    Ok(found)
}

fn entry_matches(entry: &Entry, needle: &str) -> bool {
    let r = &entry.structured;
    std::iter::once(entry.prompt.as_str())
        .chain(r.mind_space.iter().map(|m| m.thought.as_str()))
        .chain(r.schedule.iter().map(|s| s.task.as_str()))
        .chain(r.relationships.iter().flat_map(|rel| {
            std::iter::once(rel.name.as_str())
                .chain(rel.role.as_deref())
                .chain(rel.details.values().map(String::as_str))
                .chain(rel.notes.iter().map(String::as_str))
        }))
        .any(|text| text.to_lowercase().contains(needle))
}

/// Remove every schedule item whose task key equals `task_key` from every
/// stored entry. Returns the number of items removed.
pub fn purge_schedule_item(conn: &Connection, task_key: &str) -> Result<usize> {
    let key = normalize(task_key);
    purge_where(conn, "task", &key, |record| {
        let before = record.schedule.len();
        record.schedule.retain(|s| schedule_key(s) != key);
        before - record.schedule.len()
    })
}

/// Remove every relationship mention whose name key equals `name_key` from
/// every stored entry. Returns the number of mentions removed.
pub fn purge_relationship(conn: &Connection, name_key: &str) -> Result<usize> {
    let key = normalize(name_key);
    purge_where(conn, "name", &key, |record| {
        let before = record.relationships.len();
        record.relationships.retain(|r| relationship_key(r) != key);
        before - record.relationships.len()
    })
}

fn purge_where(
    conn: &Connection,
    field: &str,
    key: &str,
    mut strip: impl FnMut(&mut StructuredRecord) -> usize,
) -> Result<usize> {
    let mut removed = 0;
    for mut entry in all_entries(conn)? {
        let n = strip(&mut entry.structured);
        if n == 0 {
            continue;
        }
        conn.execute(
            "UPDATE entries SET structured = ?1 WHERE id = ?2",
            params![encode(&entry.structured)?, entry.id],
        )?;
        let details = serde_json::json!({ field: key, "removed": n });
        write_audit_log(conn, "purge", &entry.id, Some(&details))?;
        removed += n;
    }
    Ok(removed)
}

/// Purge the plan's task keys, append its record, and reset `session` to idle,
/// in one transaction.
pub fn commit_plan(conn: &mut Connection, plan: &CommitPlan, session: &str) -> Result<String> {
    let tx = conn.transaction()?;

    let mut purged = 0;
    for key in &plan.purge_tasks {
        purged += purge_schedule_item(&tx, key)?;
    }
    let id = append_entry(&tx, &plan.prompt, &plan.record, plan.journal_date)?;
    sessions::save_session(&tx, session, &ClarificationState::Idle)?;

    tx.commit()?;

    tracing::info!(
        session,
        entry_id = %id,
        journal_date = %plan.journal_date,
        purged,
        "committed journal entry"
    );
    Ok(id)
}

/// Write an entry to the journal_log audit table.
pub(crate) fn write_audit_log(
    conn: &Connection,
    operation: &str,
    entry_id: &str,
    details: Option<&serde_json::Value>,
) -> Result<()> {
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO journal_log (operation, entry_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, entry_id, details_json, now()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::clarify::PendingClarification;
    use crate::journal::conflict::Assessment;
    use crate::journal::types::{MindSpaceItem, Relationship, ScheduleItem};
    use chrono::NaiveTime;

    fn test_db() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn at(h: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, 0, 0)
    }

    fn record(schedule: Vec<ScheduleItem>) -> StructuredRecord {
        StructuredRecord {
            schedule,
            ..Default::default()
        }
    }

    fn log_count(conn: &Connection, op: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM journal_log WHERE operation = ?1",
            params![op],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn append_then_query_by_date() {
        let conn = test_db();
        let rec = StructuredRecord {
            schedule: vec![ScheduleItem::new("Gym", at(18), Some(day(2)))],
            relationships: vec![Relationship::new("John").with_role("Friend")],
            mind_space: vec![MindSpaceItem {
                thought: "Feeling good".into(),
            }],
        };
        let id = append_entry(&conn, "went to the gym", &rec, day(2)).unwrap();

        let found = entries_by_date(&conn, day(2)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].structured, rec);
        assert!(entries_by_date(&conn, day(3)).unwrap().is_empty());
        assert_eq!(log_count(&conn, "append"), 1);
    }

    #[test]
    fn future_events_respect_horizon() {
        let conn = test_db();
        let dated = |task: &str, date: Option<NaiveDate>| {
            record(vec![ScheduleItem::new(task, at(9), date)])
        };
        append_entry(&conn, "a", &dated("Soon", Some(day(10))), day(2)).unwrap();
        append_entry(&conn, "b", &dated("Later", Some(day(30))), day(2)).unwrap();
        append_entry(&conn, "c", &dated("Past", Some(day(1))), day(1)).unwrap();
        append_entry(&conn, "d", &dated("Undated", None), day(2)).unwrap();

        let soon: Vec<String> = entries_with_future_events(&conn, day(2), 10)
            .unwrap()
            .into_iter()
            .map(|e| e.prompt)
            .collect();
        assert_eq!(soon, vec!["a"]);

        assert_eq!(entries_with_future_events(&conn, day(2), 60).unwrap().len(), 2);
    }

    #[test]
    fn purge_schedule_item_removes_across_entries() {
        let conn = test_db();
        append_entry(
            &conn,
            "a",
            &record(vec![
                ScheduleItem::new("Team Meeting", at(11), Some(day(2))),
                ScheduleItem::new("Lunch", at(12), Some(day(2))),
            ]),
            day(2),
        )
        .unwrap();
        let moved = record(vec![ScheduleItem::new("team meeting ", at(14), Some(day(3)))]);
        append_entry(&conn, "b", &moved, day(3)).unwrap();

        assert_eq!(purge_schedule_item(&conn, "TEAM MEETING").unwrap(), 2);
        let left: Vec<String> = all_entries(&conn)
            .unwrap()
            .into_iter()
            .flat_map(|e| e.structured.schedule)
            .map(|s| s.task)
            .collect();
        assert_eq!(left, vec!["Lunch"]);
        assert_eq!(log_count(&conn, "purge"), 2);

        assert_eq!(purge_schedule_item(&conn, "team meeting").unwrap(), 0);
    }

    #[test]
    fn purge_relationship_removes_mentions() {
        let conn = test_db();
        let rec = StructuredRecord {
            relationships: vec![Relationship::new("John"), Relationship::new("Alice")],
            ..Default::default()
        };
        append_entry(&conn, "a", &rec, day(2)).unwrap();
        assert_eq!(purge_relationship(&conn, " john").unwrap(), 1);
        let remaining = &all_entries(&conn).unwrap()[0].structured.relationships;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "Alice");
    }

    #[test]
    fn search_is_case_insensitive_and_newest_first() {
        let conn = test_db();
        append_entry(&conn, "Coffee with Alice", &StructuredRecord::default(), day(1)).unwrap();
        let rec = StructuredRecord {
            mind_space: vec![MindSpaceItem {
                thought: "Should call ALICE back".into(),
            }],
            ..Default::default()
        };
        append_entry(&conn, "evening notes", &rec, day(2)).unwrap();
        append_entry(&conn, "nothing relevant", &StructuredRecord::default(), day(3)).unwrap();

        let hits: Vec<String> = search_entries(&conn, "alice", 10)
            .unwrap()
            .into_iter()
            .map(|e| e.prompt)
            .collect();
        assert_eq!(hits, vec!["evening notes", "Coffee with Alice"]);
        assert_eq!(search_entries(&conn, "alice", 1).unwrap().len(), 1);
    }

    #[test]
    fn commit_plan_purges_then_appends_atomically() {
        let mut conn = test_db();
        let old = record(vec![ScheduleItem::new("Team Meeting", at(11), Some(day(2)))]);
        append_entry(&conn, "old", &old, day(2)).unwrap();

        let plan = CommitPlan {
            prompt: "moved".into(),
            record: record(vec![ScheduleItem::new("team meeting", at(14), Some(day(2)))]),
            journal_date: day(2),
            purge_tasks: vec!["team meeting".into()],
        };
        commit_plan(&mut conn, &plan, "s1").unwrap();

        let times: Vec<Option<NaiveTime>> = all_entries(&conn)
            .unwrap()
            .into_iter()
            .flat_map(|e| e.structured.schedule)
            .map(|s| s.time)
            .collect();
        assert_eq!(times, vec![at(14)]);
    }

    #[test]
    fn commit_plan_clears_the_session_with_the_entry() {
        let mut conn = test_db();
        let pending = ClarificationState::AwaitingInput(PendingClarification {
            id: "p1".into(),
            prompt: "moved".into(),
            fallback_date: day(2),
            assessment: Assessment::default(),
            decisions: None,
        });
        sessions::save_session(&conn, "s1", &pending).unwrap();
        sessions::save_session(&conn, "s2", &pending).unwrap();

        let plan = CommitPlan {
            prompt: "moved".into(),
            record: StructuredRecord::default(),
            journal_date: day(2),
            purge_tasks: vec![],
        };
        commit_plan(&mut conn, &plan, "s1").unwrap();

        assert!(sessions::load_session(&conn, "s1").unwrap().is_idle());
        assert!(!sessions::load_session(&conn, "s2").unwrap().is_idle());
        assert_eq!(all_entries(&conn).unwrap().len(), 1);
    }
}
