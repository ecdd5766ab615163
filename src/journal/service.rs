//! The journal facade: submit, confirm, view, search, purge.
//!
//! [`Journal`] owns no state of its own. It loads a session's
//! [`ClarificationState`] from the [`SessionStore`], feeds events through
//! [`step`], performs the resulting effects against the [`EntryStore`], and
//! saves the new state. All calls block; async callers wrap them in
//! `spawn_blocking`.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::clarify::{
    step, ClarificationState, CommitPlan, Decisions, Effect, Event, PendingClarification,
    Transition,
};
use super::conflict::assess;
use super::knowledge::{day_sections, DaySection, KnowledgeBase};
use super::store::{EntryStore, SessionStore};
use super::types::{Entry, MindSpaceItem, Relationship, ScheduleItem};
use crate::config::{JournalSettings, KnowledgeScope};
use crate::error::{JournalError, Result};
use crate::parser::EntryParser;

/// A committed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Saved {
    pub entry_id: String,
    pub journal_date: NaiveDate,
}

/// What happened to a submitted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Saved(Saved),
    NeedsClarification(PendingClarification),
}

/// One part of the day with its schedule items.
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub section: DaySection,
    pub items: Vec<ScheduleItem>,
}

/// Everything shown for one selected day.
#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub sections: Vec<SectionView>,
    pub relationships: Vec<Relationship>,
    pub mind_space: Vec<MindSpaceItem>,
}

pub struct Journal {
    entries: Arc<dyn EntryStore>,
    sessions: Arc<dyn SessionStore>,
    parser: Arc<dyn EntryParser>,
    settings: JournalSettings,
}

impl Journal {
    pub fn new(
        entries: Arc<dyn EntryStore>,
        sessions: Arc<dyn SessionStore>,
        parser: Arc<dyn EntryParser>,
        settings: JournalSettings,
    ) -> Self {
        Self {
            entries,
            sessions,
            parser,
            settings,
        }
    }

    /// Parse `prompt`, check it against what is known, and either commit it
    /// or park it for clarification.
    ///
    /// `selected` is the day the user is journaling for and the fallback
    /// journal date; `today` decides whether upcoming events join the
    /// knowledge base.
    pub fn submit(
        &self,
        session: &str,
        prompt: &str,
        selected: NaiveDate,
        today: NaiveDate,
    ) -> Result<SubmitOutcome> {
        if prompt.trim().is_empty() {
            return Err(JournalError::EmptyPrompt);
        }
        let state = self.sessions.load_session(session)?;
        if !state.is_idle() {
            return Err(JournalError::ClarificationPending);
        }

        let record = self.parser.parse(prompt).inspect_err(|e| {
            tracing::warn!(session, error = %e, "entry could not be parsed");
        })?;
        let kb = self.knowledge_base(selected, today)?;
        let assessment = assess(record, &kb);

        let t = step(
            &state,
            Event::Parsed {
                id: uuid::Uuid::now_v7().to_string(),
                prompt: prompt.to_string(),
                assessment,
                fallback_date: selected,
            },
        )?;

        let Transition { state, effects } = t;
        match effects.into_iter().next() {
            Some(Effect::AwaitHuman { flagged }) => {
                self.sessions.save_session(session, &state)?;
                tracing::info!(session, flagged, "entry needs clarification");
                let pending = state.pending().cloned().ok_or_else(|| {
                    JournalError::InvalidTransition(
                        "awaiting input without a pending record".into(),
                    )
                })?;
                Ok(SubmitOutcome::NeedsClarification(pending))
            }
            Some(Effect::Commit(plan)) => {
                self.commit(session, &state, &plan).map(SubmitOutcome::Saved)
            }
            other => Err(unexpected(other)),
        }
    }

    /// Resolve the session's pending clarification and commit it. `None`
    /// retries with the decisions kept from a failed commit.
    pub fn confirm(&self, session: &str, decisions: Option<Decisions>) -> Result<Saved> {
        let state = self.sessions.load_session(session)?;
        let Transition { state, effects } = step(&state, Event::Confirmed(decisions))?;
        match effects.into_iter().next() {
            Some(Effect::Commit(plan)) => self.commit(session, &state, &plan),
            other => Err(unexpected(other)),
        }
    }

    /// The session's open clarification, if any.
    pub fn pending(&self, session: &str) -> Result<Option<PendingClarification>> {
        Ok(self.sessions.load_session(session)?.pending().cloned())
    }

    /// Drop the session's open clarification without writing anything.
    /// Returns `false` when nothing was pending. A state row that no longer
    /// decodes is cleared as well.
    pub fn cancel(&self, session: &str) -> Result<bool> {
        let pending = match self.sessions.load_session(session) {
            Ok(state) => !state.is_idle(),
            Err(JournalError::StorageFailure(reason)) => {
                tracing::warn!(session, %reason, "clearing unreadable session state");
                true
            }
            Err(e) => return Err(e),
        };
        if !pending {
            return Ok(false);
        }
        self.sessions.save_session(session, &ClarificationState::Idle)?;
        tracing::info!(session, "clarification cancelled");
        Ok(true)
    }

    /// The day view for `date`: schedule grouped into parts of the day, plus
    /// the people and thoughts of that day.
    pub fn view(&self, date: NaiveDate, today: NaiveDate) -> Result<DayView> {
        let kb = KnowledgeBase::from_entries(self.view_entries(date, today)?, date);
        let sections = day_sections(&kb.schedule, date)
            .into_iter()
            .map(|(section, items)| SectionView {
                section,
                items: items.into_iter().cloned().collect(),
            })
            .collect();
        Ok(DayView {
            date,
            sections,
            relationships: kb.relationships,
            mind_space: kb.mind_space,
        })
    }

    /// Case-insensitive search, newest first. `limit` defaults to the
    /// configured search limit.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<Entry>> {
        self.entries
            .search(query, limit.unwrap_or(self.settings.search_limit))
    }

    /// Remove a task from every stored entry.
    pub fn purge_task(&self, task: &str) -> Result<usize> {
        self.entries.purge_schedule_item(task)
    }

    /// Remove a person from every stored entry.
    pub fn purge_person(&self, name: &str) -> Result<usize> {
        self.entries.purge_relationship(name)
    }

    /// Every stored entry, oldest first.
    pub fn export(&self) -> Result<Vec<Entry>> {
        self.entries.query_all()
    }

    /// Knowledge base that incoming records are checked against.
    fn knowledge_base(&self, selected: NaiveDate, today: NaiveDate) -> Result<KnowledgeBase> {
        let entries = match self.settings.knowledge_scope {
            KnowledgeScope::View => self.view_entries(selected, today)?,
            KnowledgeScope::All => self.entries.query_all()?,
        };
        Ok(KnowledgeBase::from_entries(entries, selected))
    }

    fn view_entries(&self, selected: NaiveDate, today: NaiveDate) -> Result<Vec<Entry>> {
        let mut entries = self.entries.query_by_date(selected)?;
        if selected == today {
            entries.extend(
                self.entries
                    .query_future_events(today, self.settings.future_horizon_days)?,
            );
        }
        Ok(entries)
    }

    /// Run a commit effect and feed its outcome back into the state machine.
    ///
    /// On success the store has already reset the session to idle in the same
    /// transaction as the entry, so a retried confirm cannot append twice.
    fn commit(
        &self,
        session: &str,
        resolving: &ClarificationState,
        plan: &CommitPlan,
    ) -> Result<Saved> {
        match self.entries.commit(plan, session) {
            Ok(entry_id) => {
                let Transition { state, effects } =
                    step(resolving, Event::CommitSucceeded { entry_id })?;
                if !state.is_idle() {
                    return Err(JournalError::InvalidTransition(format!(
                        "commit left session in state {}",
                        state.name()
                    )));
                }
                match effects.into_iter().next() {
                    Some(Effect::Saved {
                        entry_id,
                        journal_date,
                    }) => Ok(Saved {
                        entry_id,
                        journal_date,
                    }),
                    other => Err(unexpected(other)),
                }
            }
            Err(e) => {
                tracing::warn!(session, error = %e, "commit failed");
                let back = step(resolving, Event::CommitFailed { reason: e.to_string() })?;
                if let Err(save_err) = self.sessions.save_session(session, &back.state) {
                    tracing::error!(
                        session,
                        error = %save_err,
                        "could not store session state after a failed commit"
                    );
                }
                Err(e)
            }
        }
    }
}

fn unexpected(effect: Option<Effect>) -> JournalError {
    JournalError::InvalidTransition(format!("unexpected workflow effect: {effect:?}"))
}
