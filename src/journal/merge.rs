//! Additive merge and left-fold deduplication.
//!
//! Everything here is pure. Inputs must be ordered oldest to newest so that
//! "most recent wins" means what it says.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::keys::{relationship_key, schedule_key};
use super::types::{Relationship, ScheduleItem};

/// Who a relationship mention refers to: its name key, plus the person id a
/// human assigned when splitting two people who share a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonIdentity {
    pub key: String,
    pub person_id: Option<String>,
}

impl PersonIdentity {
    pub fn of(r: &Relationship) -> Self {
        Self {
            key: relationship_key(r),
            person_id: r.person_id.clone(),
        }
    }
}

/// Fold `incoming` into `existing`.
///
/// A non-empty incoming role replaces the old one, incoming details are applied
/// key by key, and incoming notes are appended unless already present (compared
/// after trimming). Name and person id stay those of `existing`.
///
/// Callers must run conflict detection first: overlapping detail keys are
/// overwritten here without question.
pub fn merge_additive(existing: &Relationship, incoming: &Relationship) -> Relationship {
    let mut merged = existing.clone();

    if let Some(role) = incoming.role() {
        merged.role = Some(role.to_string());
    }

    for (k, v) in &incoming.details {
        merged.details.insert(k.clone(), v.clone());
    }

    for note in &incoming.notes {
        let trimmed = note.trim();
        if !merged.notes.iter().any(|n| n.trim() == trimmed) {
            merged.notes.push(note.clone());
        }
    }

    merged
}

/// Collapse relationship mentions to one entry per person, in first-seen order.
pub fn dedup_relationships(items: impl IntoIterator<Item = Relationship>) -> Vec<Relationship> {
    let mut out: Vec<Relationship> = Vec::new();
    let mut index: HashMap<PersonIdentity, usize> = HashMap::new();

    for r in items {
        let id = PersonIdentity::of(&r);
        match index.get(&id) {
            Some(&i) => out[i] = merge_additive(&out[i], &r),
            None => {
                index.insert(id, out.len());
                out.push(r);
            }
        }
    }

    out
}

/// Collapse schedule items to one per task, the latest write replacing the
/// earlier one wholesale, then sort by `(event_date, time)`.
///
/// An item without a date sorts as `reference_date`; one without a time sorts
/// before timed items on the same day.
pub fn dedup_schedule(
    items: impl IntoIterator<Item = ScheduleItem>,
    reference_date: NaiveDate,
) -> Vec<ScheduleItem> {
    let mut out: Vec<ScheduleItem> = Vec::new();
    let mut index: HashMap<(String, Option<String>), usize> = HashMap::new();

    for item in items {
        let id = (schedule_key(&item), item.occurrence.clone());
        match index.get(&id) {
            Some(&i) => out[i] = item,
            None => {
                index.insert(id, out.len());
                out.push(item);
            }
        }
    }

    out.sort_by_key(|s| (s.event_date.unwrap_or(reference_date), s.time));
    out
}
