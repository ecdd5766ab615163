//! Reconciliation core: typed records, identity keys, merging, conflict
//! detection, and the clarification workflow.
//!
//! Everything below [`service`] is pure and storage-free. [`service::Journal`]
//! wires it to an [`store::EntryStore`], a [`store::SessionStore`], and a
//! [`crate::parser::EntryParser`].

pub mod clarify;
pub mod conflict;
pub mod datetime;
pub mod keys;
pub mod knowledge;
pub mod merge;
pub mod service;
pub mod store;
pub mod types;

pub use clarify::{
    ClarificationState, CommitPlan, Decisions, MissingFields, PendingClarification,
    RelationshipDecision, ScheduleDecision,
};
pub use service::{DayView, Journal, Saved, SubmitOutcome};
pub use store::{EntryStore, SessionStore};
pub use types::{Entry, MindSpaceItem, Relationship, ScheduleItem, StructuredRecord};
