//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use crate::config::JournalConfig;
use crate::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &JournalConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("ME Journal Health Report");
    println!("========================");
    println!();
    println!("Agent endpoint:    {}", config.agent.endpoint());
    if !config.agent.is_configured() {
        println!("  WARNING: agent_id or run_id not set; entries cannot be parsed.");
    }
    println!("Timeout:           {}s", config.agent.timeout_secs);
    println!();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `me-journal serve` or `me-journal submit` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let conn = db::open_database(&db_path)
        .context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn)
        .context("failed to run health check")?;

    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("SQLite:            v{}", report.sqlite_version);
    println!();
    println!("Row counts:");
    println!("  Entries:         {}", report.entry_count);
    println!("  Sessions:        {} ({} pending)", report.session_count, report.pending_sessions);
    println!("  Audit log:       {}", report.log_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.me-journal/journal.db");
        println!("  2. Or export what is still readable: me-journal export > backup.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
