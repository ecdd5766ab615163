//! The accumulated knowledge base and the day view built on it.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;

use super::keys::{relationship_key, schedule_key};
use super::merge::{dedup_relationships, dedup_schedule};
use super::types::{Entry, MindSpaceItem, Relationship, ScheduleItem};

/// Everything known for a scope of entries, reduced by dedup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KnowledgeBase {
    pub reference_date: NaiveDate,
    pub schedule: Vec<ScheduleItem>,
    pub relationships: Vec<Relationship>,
    pub mind_space: Vec<MindSpaceItem>,
}

impl KnowledgeBase {
    /// Fold entries into a knowledge base.
    ///
    /// Entries may come from several overlapping queries: duplicates (by id) are
    /// dropped and the rest are ordered oldest to newest before folding.
    pub fn from_entries(entries: Vec<Entry>, reference_date: NaiveDate) -> Self {
        let mut seen = HashSet::new();
        let mut entries: Vec<Entry> = entries
            .into_iter()
            .filter(|e| seen.insert(e.id.clone()))
            .collect();
        entries.sort_by(|a, b| (&a.created_at, &a.id).cmp(&(&b.created_at, &b.id)));

        let schedule = dedup_schedule(
            entries.iter().flat_map(|e| e.structured.schedule.iter().cloned()),
            reference_date,
        );
        let relationships = dedup_relationships(
            entries
                .iter()
                .flat_map(|e| e.structured.relationships.iter().cloned()),
        );
        let mind_space = entries
            .iter()
            .flat_map(|e| e.structured.mind_space.iter().cloned())
            .collect();

        Self {
            reference_date,
            schedule,
            relationships,
            mind_space,
        }
    }

    /// All known people whose name key matches `key`.
    pub fn relationship_candidates(&self, key: &str) -> Vec<&Relationship> {
        self.relationships
            .iter()
            .filter(|r| relationship_key(r) == key)
            .collect()
    }

    /// All known schedule items whose task key matches `key`.
    pub fn schedule_candidates(&self, key: &str) -> Vec<&ScheduleItem> {
        self.schedule
            .iter()
            .filter(|s| schedule_key(s) == key)
            .collect()
    }
}

/// Pick the day an entry is filed under: the one event date its schedule
/// agrees on, otherwise `fallback`.
pub fn determine_journal_date(schedule: &[ScheduleItem], fallback: NaiveDate) -> NaiveDate {
    let dates: HashSet<NaiveDate> = schedule.iter().filter_map(|s| s.event_date).collect();
    if dates.len() == 1 {
        if let Some(d) = dates.into_iter().next() {
            return d;
        }
    }
    fallback
}

/// Part of the day a schedule item falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DaySection {
    Morning,
    Afternoon,
    Evening,
    Night,
    Future,
}

impl DaySection {
    pub const ALL: [DaySection; 5] = [
        Self::Morning,
        Self::Afternoon,
        Self::Evening,
        Self::Night,
        Self::Future,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Evening => "Evening",
            Self::Night => "Night",
            Self::Future => "Future",
        }
    }

    /// Classify one item against the selected day. A missing date means the
    /// selected day, a missing time means noon.
    pub fn classify(item: &ScheduleItem, selected: NaiveDate) -> Self {
        if item.event_date.unwrap_or(selected) > selected {
            return Self::Future;
        }
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        match item.time.unwrap_or(noon).hour() {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=20 => Self::Evening,
            _ => Self::Night,
        }
    }
}

impl std::fmt::Display for DaySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group a (sorted) schedule into day sections. Every section is present,
/// possibly empty, in display order.
pub fn day_sections(
    schedule: &[ScheduleItem],
    selected: NaiveDate,
) -> Vec<(DaySection, Vec<&ScheduleItem>)> {
    DaySection::ALL
        .iter()
        .map(|&section| {
            let items = schedule
                .iter()
                .filter(|s| DaySection::classify(s, selected) == section)
                .collect();
            (section, items)
        })
        .collect()
}
