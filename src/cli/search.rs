use anyhow::Result;

use crate::config::JournalConfig;
use crate::server::open_journal;

/// Search entries from the terminal.
pub fn search(config: &JournalConfig, query: &str, limit: Option<usize>) -> Result<()> {
    let journal = open_journal(config)?;
    let entries = journal.search(query, limit)?;

    if entries.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} entr{}\n", entries.len(), if entries.len() == 1 { "y" } else { "ies" });

    for (i, entry) in entries.iter().enumerate() {
        let preview: String = entry.prompt.chars().take(120).collect();
        let ellipsis = if entry.prompt.chars().count() > 120 { "..." } else { "" };

        println!("  {}. [{}] {}", i + 1, entry.journal_date, entry.id);
        println!("     {preview}{ellipsis}");
        println!();
    }

    Ok(())
}
