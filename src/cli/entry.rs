//! CLI `submit`, `pending`, `confirm` and `cancel` commands.

use anyhow::{Context, Result};
use std::io::IsTerminal;

use super::clarify::{ask, describe};
use super::{selected_date, today};
use crate::config::JournalConfig;
use crate::journal::{Decisions, Journal, PendingClarification, Saved, SubmitOutcome};
use crate::server::open_journal;

/// Parse and file one entry. When it needs clarification and stdin is a
/// terminal, ask right away.
pub fn submit(config: &JournalConfig, text: &str, date: Option<&str>) -> Result<()> {
    let journal = open_journal(config)?;
    let session = &config.storage.default_session;
    let selected = selected_date(date)?;

    match journal.submit(session, text, selected, today())? {
        SubmitOutcome::Saved(saved) => print_saved(&saved),
        SubmitOutcome::NeedsClarification(pending) => {
            describe(&pending, &mut std::io::stdout())?;
            if std::io::stdin().is_terminal() {
                answer(&journal, session, &pending)?;
            } else {
                println!();
                println!("Answer with `me-journal confirm` (interactive) or");
                println!("`me-journal confirm --decisions '<json>'`.");
            }
        }
    }
    Ok(())
}

/// Show the open clarification for the default session.
pub fn pending(config: &JournalConfig) -> Result<()> {
    let journal = open_journal(config)?;
    match journal.pending(&config.storage.default_session)? {
        Some(p) => describe(&p, &mut std::io::stdout())?,
        None => println!("Nothing pending."),
    }
    Ok(())
}

/// Resolve the open clarification from a JSON document, the retained answers
/// of a failed commit, or interactive prompts.
pub fn confirm(config: &JournalConfig, decisions: Option<&str>, retry: bool) -> Result<()> {
    let journal = open_journal(config)?;
    let session = &config.storage.default_session;

    if retry {
        print_saved(&journal.confirm(session, None)?);
        return Ok(());
    }

    if let Some(raw) = decisions {
        let decisions: Decisions =
            serde_json::from_str(raw).context("invalid --decisions JSON")?;
        print_saved(&journal.confirm(session, Some(decisions))?);
        return Ok(());
    }

    let Some(pending) = journal.pending(session)? else {
        println!("Nothing pending.");
        return Ok(());
    };
    describe(&pending, &mut std::io::stdout())?;
    answer(&journal, session, &pending)
}

/// Drop the open clarification.
pub fn cancel(config: &JournalConfig) -> Result<()> {
    let journal = open_journal(config)?;
    if journal.cancel(&config.storage.default_session)? {
        println!("Pending clarification discarded.");
    } else {
        println!("Nothing pending.");
    }
    Ok(())
}

fn answer(journal: &Journal, session: &str, pending: &PendingClarification) -> Result<()> {
    let decisions = ask(pending, &mut std::io::stdin().lock(), &mut std::io::stdout())?;
    match journal.confirm(session, Some(decisions)) {
        Ok(saved) => {
            print_saved(&saved);
            Ok(())
        }
        Err(e) if e.is_retryable() => {
            eprintln!("Saving failed: {e}");
            eprintln!("Your answers were kept; run `me-journal confirm --retry` to try again.");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_saved(saved: &Saved) {
    println!("Saved entry {} under {}.", saved.entry_id, saved.journal_date);
}
