//! Terminal rendering of a pending clarification and the interactive
//! question loop behind `submit` and `confirm`.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::io::{BufRead, Write};

use crate::journal::datetime::{format_time, parse_date, parse_time};
use crate::journal::{
    Decisions, MissingFields, PendingClarification, RelationshipDecision, ScheduleDecision,
};

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "—".into())
}

/// Print every open question, without asking for answers.
pub fn describe(p: &PendingClarification, out: &mut impl Write) -> Result<()> {
    let a = &p.assessment;
    writeln!(out, "Pending clarification {} ({} question(s))", p.id, a.flagged())?;
    writeln!(out, "  Entry: {}", p.prompt)?;

    for c in &a.relationship_conflicts {
        writeln!(out)?;
        writeln!(
            out,
            "  Relationship #{}: \"{}\" conflicts on {}",
            c.new_index,
            c.incoming.name,
            c.labels.join(", ")
        )?;
        writeln!(out, "    new:          {}", c.incoming.label())?;
        for (i, cand) in c.candidates.iter().enumerate() {
            writeln!(out, "    candidate {i}:  {}", cand.label())?;
        }
    }

    for c in &a.schedule_conflicts {
        writeln!(out)?;
        writeln!(out, "  Schedule #{}: \"{}\" is already planned", c.new_index, c.incoming.task)?;
        writeln!(
            out,
            "    existing:     {} {}",
            format_date(c.existing.event_date),
            format_time(c.existing.time)
        )?;
        writeln!(
            out,
            "    new:          {} {}",
            format_date(c.incoming.event_date),
            format_time(c.incoming.time)
        )?;
    }

    for &idx in &a.missing {
        if let Some(item) = a.record.schedule.get(idx) {
            writeln!(out)?;
            writeln!(
                out,
                "  Schedule #{idx}: \"{}\" needs a date and time (have {} {})",
                item.task,
                format_date(item.event_date),
                format_time(item.time)
            )?;
        }
    }
    Ok(())
}

/// Ask for every decision on `input`, echoing prompts to `out`.
pub fn ask(
    p: &PendingClarification,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<Decisions> {
    let a = &p.assessment;
    let mut decisions = Decisions::default();

    for c in &a.relationship_conflicts {
        writeln!(out)?;
        writeln!(
            out,
            "\"{}\" ({}): new {}",
            c.incoming.name,
            c.labels.join(", "),
            c.incoming.label()
        )?;
        for (i, cand) in c.candidates.iter().enumerate() {
            writeln!(out, "  {}) same person as: {}", i + 1, cand.label())?;
        }
        writeln!(out, "  s) someone new with the same name")?;
        writeln!(out, "  d) discard the new information")?;

        let decision = loop {
            let answer = prompt(input, out, "choice: ")?;
            match answer.as_str() {
                "s" => break RelationshipDecision::Separate,
                "d" => break RelationshipDecision::Discard,
                n => match n.parse::<usize>() {
                    Ok(k) if (1..=c.candidates.len()).contains(&k) => {
                        break RelationshipDecision::Update { candidate: k - 1 }
                    }
                    _ => writeln!(out, "  please answer 1-{}, s or d", c.candidates.len())?,
                },
            }
        };
        decisions.relationships.insert(c.new_index, decision);
    }

    for c in &a.schedule_conflicts {
        writeln!(out)?;
        writeln!(
            out,
            "\"{}\" was at {} {}, now {} {}",
            c.incoming.task,
            format_date(c.existing.event_date),
            format_time(c.existing.time),
            format_date(c.incoming.event_date),
            format_time(c.incoming.time)
        )?;
        writeln!(out, "  r) replace   k) keep both   d) discard new")?;

        let decision = loop {
            match prompt(input, out, "choice: ")?.as_str() {
                "r" => break ScheduleDecision::Replace,
                "k" => break ScheduleDecision::KeepBoth,
                "d" => break ScheduleDecision::Discard,
                _ => writeln!(out, "  please answer r, k or d")?,
            }
        };
        decisions.schedule.insert(c.new_index, decision);
    }

    for &idx in &a.missing {
        let Some(item) = a.record.schedule.get(idx) else {
            continue;
        };
        writeln!(out)?;
        writeln!(out, "\"{}\" needs a date and time (blank drops the item)", item.task)?;

        let mut fill = MissingFields::default();
        if item.event_date.is_none() {
            fill.event_date = ask_value(input, out, "date (YYYY-MM-DD): ", parse_date)?;
        }
        if item.time.is_none() && (item.event_date.is_some() || fill.event_date.is_some()) {
            fill.time = ask_value(input, out, "time (HH:MM): ", parse_time)?;
        }
        decisions.missing.insert(idx, fill);
    }

    Ok(decisions)
}

/// Read one trimmed, lowercased line. End of input is an error.
fn prompt(input: &mut impl BufRead, out: &mut impl Write, label: &str) -> Result<String> {
    write!(out, "{label}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input ended before every question was answered");
    }
    Ok(line.trim().to_lowercase())
}

/// Ask until the answer parses or is blank.
fn ask_value<T>(
    input: &mut impl BufRead,
    out: &mut impl Write,
    label: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>> {
    loop {
        let answer = prompt(input, out, label)?;
        if answer.is_empty() {
            return Ok(None);
        }
        match parse(&answer) {
            Some(v) => return Ok(Some(v)),
            None => writeln!(out, "  could not read \"{answer}\", try again")?,
        }
    }
}
