//! Conflict detection between an incoming record and the knowledge base.
//!
//! [`assess`] is the entry point: it walks an incoming record item by item and
//! sorts each one into "safe to merge", "conflicting", or "missing fields".
//! Nothing here writes anything; the clarification workflow decides what
//! happens to flagged items.

use serde::{Deserialize, Serialize};

use super::keys::{relationship_key, schedule_key};
use super::knowledge::KnowledgeBase;
use super::merge::merge_additive;
use super::types::{Relationship, ScheduleItem, StructuredRecord};

/// Label for a mention that could refer to more than one known person.
pub const IDENTITY_LABEL: &str = "identity";

/// Compare two mentions of the same person.
///
/// Flags `"role"` when both roles are set and differ, and `"detail:<key>"` for
/// every detail both sides set to different values. A field the incoming
/// mention leaves empty never conflicts.
pub fn diff_conflicts(existing: &Relationship, incoming: &Relationship) -> (bool, Vec<String>) {
    let mut labels = Vec::new();

    if let (Some(old), Some(new)) = (existing.role(), incoming.role()) {
        if old != new {
            labels.push("role".to_string());
        }
    }

    for (key, new) in &incoming.details {
        if let Some(old) = existing.details.get(key) {
            if old != new {
                labels.push(format!("detail:{key}"));
            }
        }
    }

    (!labels.is_empty(), labels)
}

/// `true` if two items for the same task disagree on time or date.
pub fn schedule_conflicts(existing: &ScheduleItem, incoming: &ScheduleItem) -> bool {
    existing.time != incoming.time || existing.event_date != incoming.event_date
}

/// An incoming relationship that cannot be merged without a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipConflict {
    /// Position of the mention in the incoming record.
    pub new_index: usize,
    pub incoming: Relationship,
    /// Known people it may refer to. One entry for a plain attribute conflict,
    /// several when the name was split before.
    pub candidates: Vec<Relationship>,
    pub labels: Vec<String>,
}

/// An incoming schedule item whose task already exists with a different time or date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub new_index: usize,
    pub incoming: ScheduleItem,
    pub existing: ScheduleItem,
}

/// Result of checking one incoming record against the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// The incoming record, with unflagged relationship mentions already merged
    /// into the person they matched. Indices line up with the parser output.
    pub record: StructuredRecord,
    pub relationship_conflicts: Vec<RelationshipConflict>,
    pub schedule_conflicts: Vec<ScheduleConflict>,
    /// Schedule indices lacking a date or a time.
    pub missing: Vec<usize>,
}

impl Assessment {
    pub fn needs_clarification(&self) -> bool {
        !self.relationship_conflicts.is_empty()
            || !self.schedule_conflicts.is_empty()
            || !self.missing.is_empty()
    }

    /// Number of questions a human has to answer.
    pub fn flagged(&self) -> usize {
        self.relationship_conflicts.len() + self.schedule_conflicts.len() + self.missing.len()
    }
}

/// Check every item of `incoming` against `kb`.
///
/// A relationship whose name matches exactly one known, never-split person is
/// merged when [`diff_conflicts`] finds nothing, and flagged otherwise. A name
/// that matches a split person, or several people, is always flagged with
/// [`IDENTITY_LABEL`] so a human picks which one is meant.
///
/// A schedule item is flagged as conflicting when its task is known and no
/// known occurrence has the same time and date. Independently, an item missing
/// its date or time is listed in [`Assessment::missing`].
pub fn assess(incoming: StructuredRecord, kb: &KnowledgeBase) -> Assessment {
    let mut record = incoming;
    let mut relationship_conflicts = Vec::new();
    let mut flagged_schedule = Vec::new();
    let mut missing = Vec::new();

    for (idx, rel) in record.relationships.iter_mut().enumerate() {
        let candidates = kb.relationship_candidates(&relationship_key(rel));
        match candidates.as_slice() {
            [] => {}
            [only] if only.person_id.is_none() => {
                let (has_conflict, labels) = diff_conflicts(only, rel);
                if has_conflict {
                    relationship_conflicts.push(RelationshipConflict {
                        new_index: idx,
                        incoming: rel.clone(),
                        candidates: vec![(*only).clone()],
                        labels,
                    });
                } else {
                    *rel = merge_additive(only, rel);
                }
            }
            many => {
                relationship_conflicts.push(RelationshipConflict {
                    new_index: idx,
                    incoming: rel.clone(),
                    candidates: many.iter().map(|c| (*c).clone()).collect(),
                    labels: vec![IDENTITY_LABEL.to_string()],
                });
            }
        }
    }

    for (idx, item) in record.schedule.iter_mut().enumerate() {
        if item.is_missing_fields() {
            missing.push(idx);
        }

        let candidates = kb.schedule_candidates(&schedule_key(item));
        if candidates.is_empty() {
            continue;
        }
        // a repeat of a known occurrence updates that occurrence
        if let Some(same) = candidates.iter().find(|c| !schedule_conflicts(c, &*item)) {
            item.occurrence = same.occurrence.clone();
            continue;
        }
        let existing = candidates
            .iter()
            .find(|c| c.occurrence.is_none())
            .unwrap_or(&candidates[0]);
        flagged_schedule.push(ScheduleConflict {
            new_index: idx,
            incoming: item.clone(),
            existing: (*existing).clone(),
        });
    }

    tracing::debug!(
        relationship_conflicts = relationship_conflicts.len(),
        schedule_conflicts = flagged_schedule.len(),
        missing = missing.len(),
        "assessed incoming record"
    );

    Assessment {
        record,
        relationship_conflicts,
        schedule_conflicts: flagged_schedule,
        missing,
    }
}
