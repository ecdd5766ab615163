//! Typed journal records.
//!
//! [`StructuredRecord`] is what one journal entry becomes after parsing: a
//! schedule, the people mentioned, and free-floating thoughts. The stored
//! document uses the agent's section names (`"Schedule"`, `"Relationships"`,
//! `"Mind Space"`) so stored rows and agent output share one shape.
//!
//! Agent output is untrusted and goes through [`StructuredRecord::from_value`],
//! which rejects records missing a task, name, or thought. Stored rows are
//! trusted and use the derived `Deserialize`.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::datetime::{self, hhmm};
use crate::error::{JournalError, Result};

/// One scheduled task or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub task: String,
    #[serde(default, with = "hhmm")]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    /// Set when a human chose to keep this item next to an existing one with the
    /// same task name. Items with different occurrences never collapse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<String>,
}

impl ScheduleItem {
    pub fn new(
        task: impl Into<String>,
        time: Option<NaiveTime>,
        event_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            task: task.into(),
            time,
            event_date,
            occurrence: None,
        }
    }

    /// `true` if the item lacks a date or a time and cannot be committed as-is.
    pub fn is_missing_fields(&self) -> bool {
        self.event_date.is_none() || self.time.is_none()
    }
}

/// A person mentioned in an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    #[serde(default)]
    pub notes: Vec<String>,
    /// Set when a human declared this mention a different person from an
    /// existing one with the same name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
}

impl Relationship {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// The role, treating an empty or whitespace string as absent.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }

    /// One-line label used when listing candidates for a clarification,
    /// e.g. `Friend | birthday:March 15`.
    pub fn label(&self) -> String {
        let role = self.role().unwrap_or("—");
        if self.details.is_empty() {
            return role.to_string();
        }
        let details: Vec<String> = self.details.iter().map(|(k, v)| format!("{k}:{v}")).collect();
        format!("{role} | {}", details.join(", "))
    }
}

/// A thought that is on the user's mind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindSpaceItem {
    pub thought: String,
}

/// The parsed form of a single journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructuredRecord {
    #[serde(rename = "Schedule", default)]
    pub schedule: Vec<ScheduleItem>,
    #[serde(rename = "Relationships", default)]
    pub relationships: Vec<Relationship>,
    #[serde(rename = "Mind Space", default)]
    pub mind_space: Vec<MindSpaceItem>,
}

impl StructuredRecord {
    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty() && self.relationships.is_empty() && self.mind_space.is_empty()
    }

    /// Validate loosely-shaped agent JSON into a typed record.
    ///
    /// Sections may be absent or `null` (read as empty). Each schedule item needs
    /// a `task`, each relationship a `name`, each mind-space item a `thought`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| malformed("record must be a JSON object"))?;

        let schedule = section(obj, &["Schedule", "schedule"])?
            .iter()
            .enumerate()
            .map(|(i, v)| schedule_item_from_value(i, v))
            .collect::<Result<Vec<_>>>()?;

        let relationships = section(obj, &["Relationships", "relationships"])?
            .iter()
            .enumerate()
            .map(|(i, v)| relationship_from_value(i, v))
            .collect::<Result<Vec<_>>>()?;

        let mind_space = section(obj, &["Mind Space", "mind_space", "MindSpace", "Mind space"])?
            .iter()
            .enumerate()
            .map(|(i, v)| mind_space_from_value(i, v))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schedule,
            relationships,
            mind_space,
        })
    }
}

/// A committed journal entry as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// The raw text the user typed.
    pub prompt: String,
    pub structured: StructuredRecord,
    /// The day this entry is filed under.
    pub journal_date: NaiveDate,
    /// RFC 3339 write timestamp.
    pub created_at: String,
}

fn malformed(msg: impl Into<String>) -> JournalError {
    JournalError::MalformedRecord(msg.into())
}

fn section<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Result<&'a [Value]> {
    let found = names.iter().find_map(|n| obj.get(*n));
    match found {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(malformed(format!("section {} must be a list", names[0]))),
    }
}

/// Scalars become strings; `null` and empty strings become `None`.
fn scalar_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn required_string(obj: &Map<String, Value>, field: &str, at: &str) -> Result<String> {
    obj.get(field)
        .and_then(scalar_string)
        .ok_or_else(|| malformed(format!("{at}: missing {field}")))
}

fn schedule_item_from_value(index: usize, v: &Value) -> Result<ScheduleItem> {
    let at = format!("Schedule[{index}]");
    let obj = v
        .as_object()
        .ok_or_else(|| malformed(format!("{at}: expected an object")))?;
    let task = required_string(obj, "task", &at)?;

    let time = match obj.get("time").and_then(scalar_string) {
        Some(raw) => {
            let parsed = datetime::parse_time(&raw);
            if parsed.is_none() {
                tracing::warn!(task = %task, raw = %raw, "unreadable time, treating as missing");
            }
            parsed
        }
        None => None,
    };

    // The agent sometimes writes `date` instead of `event_date`.
    let raw_date = obj
        .get("event_date")
        .and_then(scalar_string)
        .or_else(|| obj.get("date").and_then(scalar_string));
    let event_date = match raw_date {
        Some(raw) => {
            let parsed = datetime::parse_date(&raw);
            if parsed.is_none() {
                tracing::warn!(task = %task, raw = %raw, "unreadable date, treating as missing");
            }
            parsed
        }
        None => None,
    };

    Ok(ScheduleItem::new(task, time, event_date))
}

fn relationship_from_value(index: usize, v: &Value) -> Result<Relationship> {
    let at = format!("Relationships[{index}]");
    let obj = v
        .as_object()
        .ok_or_else(|| malformed(format!("{at}: expected an object")))?;
    let name = required_string(obj, "name", &at)?;
    let role = obj.get("role").and_then(scalar_string);

    let mut details = BTreeMap::new();
    match obj.get("details") {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (k, v) in map {
                match v {
                    Value::Null => {}
                    Value::Array(_) | Value::Object(_) => {
                        return Err(malformed(format!("{at}: detail {k} must be a plain value")));
                    }
                    other => {
                        if let Some(s) = scalar_string(other) {
                            details.insert(k.clone(), s);
                        }
                    }
                }
            }
        }
        Some(_) => return Err(malformed(format!("{at}: details must be an object"))),
    }

    let notes = match obj.get("notes") {
        None | Some(Value::Null) => Vec::new(),
        Some(v @ Value::String(_)) => scalar_string(v).into_iter().collect(),
        Some(Value::Array(items)) => {
            let mut notes: Vec<String> = Vec::with_capacity(items.len());
            for item in items {
                if matches!(item, Value::Array(_) | Value::Object(_)) {
                    return Err(malformed(format!("{at}: notes must be strings")));
                }
                // blank notes are dropped
                if let Some(note) = scalar_string(item) {
                    if !notes.contains(&note) {
                        notes.push(note);
                    }
                }
            }
            notes
        }
        Some(_) => return Err(malformed(format!("{at}: notes must be a list"))),
    };

    Ok(Relationship {
        name,
        role,
        details,
        notes,
        person_id: None,
    })
}

fn mind_space_from_value(index: usize, v: &Value) -> Result<MindSpaceItem> {
    let at = format!("Mind Space[{index}]");
    let thought = match v {
        Value::Object(obj) => required_string(obj, "thought", &at)?,
        other => scalar_string(other).ok_or_else(|| malformed(format!("{at}: missing thought")))?,
    };
    Ok(MindSpaceItem { thought })
}
