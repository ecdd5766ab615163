//! CLI `show` command: print one day of the journal.

use anyhow::Result;

use super::{selected_date, today};
use crate::config::JournalConfig;
use crate::journal::datetime::format_time;
use crate::journal::knowledge::DaySection;
use crate::server::open_journal;

pub fn show(config: &JournalConfig, date: Option<&str>) -> Result<()> {
    let journal = open_journal(config)?;
    let date = selected_date(date)?;
    let view = journal.view(date, today())?;

    println!("Journal for {}", view.date);
    println!("====================");

    for section in &view.sections {
        println!();
        println!("{}", section.section);
        if section.items.is_empty() {
            println!("  (nothing)");
        }
        for item in &section.items {
            let when = match (section.section, item.event_date) {
                (DaySection::Future, Some(d)) => format!("{d} {}", format_time(item.time)),
                _ => format_time(item.time),
            };
            println!("  {when:>16}  {}", item.task);
        }
    }

    println!();
    println!("People");
    if view.relationships.is_empty() {
        println!("  (nobody)");
    }
    for person in &view.relationships {
        println!("  {}: {}", person.name, person.label());
        for note in &person.notes {
            println!("    - {note}");
        }
    }

    println!();
    println!("Mind Space");
    if view.mind_space.is_empty() {
        println!("  (empty)");
    }
    for item in &view.mind_space {
        println!("  - {}", item.thought);
    }

    Ok(())
}
