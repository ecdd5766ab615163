//! Human-in-the-loop clarification as a pure state machine.
//!
//! A session is either idle, waiting for a human to answer questions about a
//! flagged record, or resolving (a commit is in flight). [`step`] maps a state
//! and an [`Event`] to the next state plus the [`Effect`]s the caller has to
//! carry out. It never touches storage, so the whole workflow is testable
//! without a database.
//!
//! ```text
//! Idle ──Parsed(flagged)──▶ AwaitingInput ──Confirmed──▶ Resolving ──CommitSucceeded──▶ Idle
//!   │                            ▲                           │
//!   └──Parsed(clean)──▶ Resolving└───────CommitFailed────────┘
//! ```
//!
//! A failed direct commit goes back to `Idle`; a failed confirmed commit goes
//! back to `AwaitingInput` with the decisions kept, so the human can retry
//! without answering again.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::conflict::Assessment;
use super::datetime::hhmm;
use super::keys::schedule_key;
use super::knowledge::determine_journal_date;
use super::merge::merge_additive;
use super::types::{Relationship, StructuredRecord};
use crate::error::{JournalError, Result};

/// Answer for a flagged relationship mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RelationshipDecision {
    /// Merge into a known person. `candidate` indexes the conflict's candidate
    /// list and defaults to the first.
    Update {
        #[serde(default)]
        candidate: usize,
    },
    /// A different person who happens to share the name.
    Separate,
    /// Drop the new information.
    Discard,
}

/// Answer for a flagged schedule item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleDecision {
    /// Purge every stored item for this task, then keep the new one.
    Replace,
    /// Keep the new item next to the existing one.
    KeepBoth,
    /// Drop the new item.
    Discard,
}

/// Date and time supplied for an item that arrived without them. Blank fields
/// leave the item incomplete, which cancels it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingFields {
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    #[serde(default, with = "hhmm")]
    pub time: Option<NaiveTime>,
}

/// Every answer for one pending record, keyed by the item's index in the
/// incoming record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decisions {
    #[serde(default, with = "index_keys")]
    pub relationships: BTreeMap<usize, RelationshipDecision>,
    #[serde(default, with = "index_keys")]
    pub schedule: BTreeMap<usize, ScheduleDecision>,
    #[serde(default, with = "index_keys")]
    pub missing: BTreeMap<usize, MissingFields>,
}

/// Index-keyed maps as JSON objects with string keys.
///
/// Decisions are stored inside the internally tagged [`ClarificationState`],
/// whose buffered deserializer hands map keys over as strings. Keys are parsed
/// here so they load the same way from a session row and from a request.
mod index_keys {
    use std::collections::BTreeMap;

    use serde::de::{self, Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    pub fn serialize<T, S>(map: &BTreeMap<usize, T>, s: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        s.collect_map(map.iter().map(|(k, v)| (k.to_string(), v)))
    }

    pub fn deserialize<'de, T, D>(d: D) -> Result<BTreeMap<usize, T>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        BTreeMap::<String, T>::deserialize(d)?
            .into_iter()
            .map(|(k, v)| match k.trim().parse::<usize>() {
                Ok(idx) => Ok((idx, v)),
                Err(_) => Err(de::Error::custom(format!("invalid item index {k:?}"))),
            })
            .collect()
    }
}

/// A flagged record waiting for answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingClarification {
    /// Stable id, also used to derive person and occurrence ids.
    pub id: String,
    pub prompt: String,
    /// Journal date used when the schedule does not settle on one.
    pub fallback_date: NaiveDate,
    pub assessment: Assessment,
    /// Decisions from a confirm whose commit failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decisions: Option<Decisions>,
}

/// Everything the store needs to write one resolved record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPlan {
    pub prompt: String,
    pub record: StructuredRecord,
    pub journal_date: NaiveDate,
    /// Task keys whose stored schedule items are removed before the append.
    #[serde(default)]
    pub purge_tasks: Vec<String>,
}

/// A commit that is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolving {
    /// The clarification being committed, `None` for a direct commit.
    pub pending: Option<PendingClarification>,
    pub plan: CommitPlan,
}

/// Per-session workflow state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClarificationState {
    #[default]
    Idle,
    AwaitingInput(PendingClarification),
    Resolving(Resolving),
}

impl ClarificationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn pending(&self) -> Option<&PendingClarification> {
        match self {
            Self::Idle => None,
            Self::AwaitingInput(p) => Some(p),
            Self::Resolving(r) => r.pending.as_ref(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingInput(_) => "awaiting_input",
            Self::Resolving(_) => "resolving",
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// A freshly parsed and assessed record.
    Parsed {
        id: String,
        prompt: String,
        assessment: Assessment,
        fallback_date: NaiveDate,
    },
    /// The human's answers. `None` retries with the retained decisions.
    Confirmed(Option<Decisions>),
    CommitSucceeded { entry_id: String },
    CommitFailed { reason: String },
}

/// Work the caller performs after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the plan to the entry store, then report back with
    /// `CommitSucceeded` or `CommitFailed`.
    Commit(CommitPlan),
    /// Ask the human `flagged` questions.
    AwaitHuman { flagged: usize },
    Saved { entry_id: String, journal_date: NaiveDate },
    Failed { reason: String },
}

/// Result of [`step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ClarificationState,
    pub effects: Vec<Effect>,
}

/// Advance the workflow. On error the caller keeps the current state.
pub fn step(state: &ClarificationState, event: Event) -> Result<Transition> {
    use ClarificationState as S;

    match (state, event) {
        (
            S::Idle,
            Event::Parsed {
                id,
                prompt,
                assessment,
                fallback_date,
            },
        ) => {
            if assessment.needs_clarification() {
                let flagged = assessment.flagged();
                let pending = PendingClarification {
                    id,
                    prompt,
                    fallback_date,
                    assessment,
                    decisions: None,
                };
                return Ok(Transition {
                    state: S::AwaitingInput(pending),
                    effects: vec![Effect::AwaitHuman { flagged }],
                });
            }
            let journal_date = determine_journal_date(&assessment.record.schedule, fallback_date);
            let plan = CommitPlan {
                prompt,
                record: assessment.record,
                journal_date,
                purge_tasks: Vec::new(),
            };
            Ok(Transition {
                state: S::Resolving(Resolving {
                    pending: None,
                    plan: plan.clone(),
                }),
                effects: vec![Effect::Commit(plan)],
            })
        }
        (S::AwaitingInput(_), Event::Parsed { .. }) => Err(JournalError::ClarificationPending),
        (S::Idle, Event::Confirmed(_)) => Err(JournalError::NothingPending),
        (S::AwaitingInput(pending), Event::Confirmed(decisions)) => {
            let decisions = decisions
                .or_else(|| pending.decisions.clone())
                .ok_or_else(|| {
                    JournalError::InvalidDecision("no decisions supplied and none retained".into())
                })?;
            let plan = resolve(pending, &decisions)?;
            let mut pending = pending.clone();
            pending.decisions = Some(decisions);
            Ok(Transition {
                state: S::Resolving(Resolving {
                    pending: Some(pending),
                    plan: plan.clone(),
                }),
                effects: vec![Effect::Commit(plan)],
            })
        }
        (S::Resolving(r), Event::CommitSucceeded { entry_id }) => Ok(Transition {
            state: S::Idle,
            effects: vec![Effect::Saved {
                entry_id,
                journal_date: r.plan.journal_date,
            }],
        }),
        (S::Resolving(r), Event::CommitFailed { reason }) => Ok(Transition {
            state: r.pending.clone().map_or(S::Idle, S::AwaitingInput),
            effects: vec![Effect::Failed { reason }],
        }),
        (S::Resolving(_), _) => Err(JournalError::InvalidTransition(
            "a commit is in flight for this session".into(),
        )),
        (_, Event::CommitSucceeded { .. } | Event::CommitFailed { .. }) => Err(
            JournalError::InvalidTransition("no commit is in flight for this session".into()),
        ),
    }
}

/// Apply decisions to a pending record and produce the commit plan.
pub fn resolve(pending: &PendingClarification, decisions: &Decisions) -> Result<CommitPlan> {
    let a = &pending.assessment;
    check_decisions(a, decisions)?;

    let mut relationships: Vec<Relationship> = Vec::with_capacity(a.record.relationships.len());
    for (idx, rel) in a.record.relationships.iter().enumerate() {
        let Some(conflict) = a.relationship_conflicts.iter().find(|c| c.new_index == idx) else {
            relationships.push(rel.clone());
            continue;
        };
        match &decisions.relationships[&idx] {
            RelationshipDecision::Discard => {}
            RelationshipDecision::Update { candidate } => {
                let existing = conflict.candidates.get(*candidate).ok_or_else(|| {
                    JournalError::InvalidDecision(format!(
                        "relationship {idx} ({}) has no candidate {candidate}",
                        rel.name
                    ))
                })?;
                relationships.push(merge_additive(existing, rel));
            }
            RelationshipDecision::Separate => relationships.push(Relationship {
                person_id: Some(format!("{}-p{idx}", pending.id)),
                ..rel.clone()
            }),
        }
    }

    let mut schedule = Vec::with_capacity(a.record.schedule.len());
    let mut purge_tasks: Vec<String> = Vec::new();
    for (idx, item) in a.record.schedule.iter().enumerate() {
        let mut item = item.clone();

        if a.missing.contains(&idx) {
            let fill = decisions.missing.get(&idx).cloned().unwrap_or_default();
            item.event_date = fill.event_date.or(item.event_date);
            item.time = fill.time.or(item.time);
            if item.is_missing_fields() {
                tracing::debug!(task = %item.task, "schedule item left incomplete, dropping");
                continue;
            }
        }

        match decisions.schedule.get(&idx) {
            None => {}
            Some(ScheduleDecision::Discard) => continue,
            Some(ScheduleDecision::Replace) => {
                let key = schedule_key(&item);
                if !purge_tasks.contains(&key) {
                    purge_tasks.push(key);
                }
            }
            Some(ScheduleDecision::KeepBoth) => {
                item.occurrence = Some(format!("{}-s{idx}", pending.id));
            }
        }
        schedule.push(item);
    }

    let journal_date = determine_journal_date(&schedule, pending.fallback_date);
    Ok(CommitPlan {
        prompt: pending.prompt.clone(),
        record: StructuredRecord {
            schedule,
            relationships,
            mind_space: a.record.mind_space.clone(),
        },
        journal_date,
        purge_tasks,
    })
}

/// Every flagged conflict needs exactly one decision, and decisions may only
/// name flagged items. Missing-field answers are optional (blank cancels).
fn check_decisions(a: &Assessment, d: &Decisions) -> Result<()> {
    for c in &a.relationship_conflicts {
        if !d.relationships.contains_key(&c.new_index) {
            return Err(JournalError::InvalidDecision(format!(
                "no decision for relationship {} ({})",
                c.new_index, c.incoming.name
            )));
        }
    }
    for idx in d.relationships.keys() {
        if !a.relationship_conflicts.iter().any(|c| c.new_index == *idx) {
            return Err(JournalError::InvalidDecision(format!(
                "relationship {idx} was not flagged"
            )));
        }
    }

    for c in &a.schedule_conflicts {
        if !d.schedule.contains_key(&c.new_index) {
            return Err(JournalError::InvalidDecision(format!(
                "no decision for schedule item {} ({})",
                c.new_index, c.incoming.task
            )));
        }
    }
    for idx in d.schedule.keys() {
        if !a.schedule_conflicts.iter().any(|c| c.new_index == *idx) {
            return Err(JournalError::InvalidDecision(format!(
                "schedule item {idx} was not flagged"
            )));
        }
    }

    for idx in d.missing.keys() {
        if !a.missing.contains(idx) {
            return Err(JournalError::InvalidDecision(format!(
                "schedule item {idx} is not missing any fields"
            )));
        }
    }

    Ok(())
}
