//! CLI `purge` command: remove a task or person from every entry after
//! user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use crate::config::JournalConfig;
use crate::server::open_journal;

pub fn purge(config: &JournalConfig, name: &str, person: bool) -> Result<()> {
    let what = if person { "person" } else { "task" };

    println!("WARNING: This will permanently remove the {what} \"{name}\" from every journal entry.");
    println!("Database: {}", config.resolved_db_path().display());
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("purge cancelled");
    }

    let journal = open_journal(config)?;
    let removed = if person {
        journal.purge_person(name)?
    } else {
        journal.purge_task(name)?
    };

    println!("Removed {removed} item(s).");
    Ok(())
}
