use anyhow::Result;
use serde::Serialize;

use crate::config::JournalConfig;
use crate::journal::Entry;
use crate::server::open_journal;

/// Export format.
#[derive(Debug, Serialize)]
struct ExportData {
    entries: Vec<Entry>,
}

/// Export every entry as JSON to stdout.
pub fn export(config: &JournalConfig) -> Result<()> {
    let journal = open_journal(config)?;
    let data = ExportData {
        entries: journal.export()?,
    };

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!("Exported {} entries.", data.entries.len());

    Ok(())
}
