//! Per-session clarification state, stored as JSON in the `sessions` table.

use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{JournalError, Result};
use crate::journal::clarify::ClarificationState;

/// Load a session's state. Unknown sessions are idle.
///
/// A row that no longer decodes is a storage failure: the pending record is
/// kept on disk and `cancel` can still clear it.
pub fn load_session(conn: &Connection, session: &str) -> Result<ClarificationState> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT state FROM sessions WHERE id = ?1",
            params![session],
            |row| row.get(0),
        )
        .optional()?;

    let Some(raw) = raw else {
        return Ok(ClarificationState::Idle);
    };
    serde_json::from_str(&raw).map_err(|e| {
        tracing::warn!(session, error = %e, "undecodable session state");
        JournalError::StorageFailure(format!("session {session} state does not decode: {e}"))
    })
}

/// Store a session's state. Idle sessions are deleted.
pub fn save_session(conn: &Connection, session: &str, state: &ClarificationState) -> Result<()> {
    if state.is_idle() {
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session])?;
        return Ok(());
    }

    let json = serde_json::to_string(state)
        .map_err(|e| JournalError::StorageFailure(format!("failed to encode session: {e}")))?;
    conn.execute(
        "INSERT INTO sessions (id, state, updated_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
        params![session, json, Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)],
    )?;
    Ok(())
}

/// Delete every session whose state was last written more than `ttl_days`
/// days ago. Returns the number of sessions removed.
pub fn expire_sessions(conn: &Connection, ttl_days: u32) -> Result<usize> {
    let cutoff = Utc::now() - Duration::days(i64::from(ttl_days));
    let removed = conn.execute(
        "DELETE FROM sessions WHERE updated_at < ?1",
        params![cutoff.to_rfc3339_opts(SecondsFormat::Micros, true)],
    )?;
    if removed > 0 {
        tracing::info!(removed, ttl_days, "expired stale clarification sessions");
    }
    Ok(removed)
}
