//! Life-journal reconciliation engine.
//!
//! Free-text journal entries are turned into structured records (schedule,
//! people, thoughts) by an external LLM agent. This crate merges each record
//! into the knowledge built up from earlier entries, flags anything that
//! disagrees with what is already known, and asks a human before committing.
//!
//! # Architecture
//!
//! - **Parsing**: an HTTP agent returns the record as JSON, validated at the
//!   boundary into typed structs
//! - **Reconciliation**: pure key derivation, additive merge, conflict
//!   detection, and a clarification state machine
//! - **Storage**: SQLite, with per-session clarification state so a pending
//!   question survives restarts
//! - **Transport**: MCP over stdio or streamable HTTP, plus a CLI
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, health checks, and the store adapter
//! - [`error`]: the [`error::JournalError`] kinds
//! - [`journal`]: reconciliation core and the [`journal::Journal`] facade
//! - [`parser`]: the [`parser::EntryParser`] seam and the agent client

pub mod config;
pub mod db;
pub mod error;
pub mod journal;
pub mod parser;
