//! Tasks and task lists as mirrored from the service.
//!
//! # Design
//! The service's payloads carry more fields than the client interprets and
//! new ones appear over time. Each model therefore keeps the raw payload map
//! alongside typed fields decoded from it. Decoding is lenient for optional
//! fields (a malformed date reads as absent) and strict only for identity.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Id and title of the synthetic inbox list.
pub const INBOX_ID: &str = "inbox";

/// A single task, owned by exactly one `TaskList`.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: String,
    title: String,
    list_id: String,
    created_at: Option<DateTime<Utc>>,
    due_date: Option<NaiveDate>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    starred: bool,
    note: Option<String>,
    raw: Map<String, Value>,
}

impl Task {
    /// Decode a task payload. `id`, `title` and `list_id` are required.
    pub fn from_payload(payload: Value) -> Result<Self, ApiError> {
        let raw = into_object(payload, "task")?;
        let id = required_id(&raw, "id", "task")?;
        let list_id = required_id(&raw, "list_id", "task")?;
        let title = required_str(&raw, "title", "task")?;

        let completed_at_raw = raw.get("completed_at").and_then(Value::as_str);
        Ok(Self {
            id,
            title,
            list_id,
            created_at: raw
                .get("created_at")
                .and_then(Value::as_str)
                .and_then(parse_timestamp),
            due_date: raw
                .get("due_date")
                .and_then(Value::as_str)
                .and_then(parse_date),
            completed: completed_at_raw.is_some_and(|s| !s.is_empty()),
            completed_at: completed_at_raw.and_then(parse_timestamp),
            starred: raw.get("starred").and_then(Value::as_i64) == Some(1),
            note: raw.get("note").and_then(Value::as_str).map(str::to_string),
            raw,
        })
    }

    /// Refresh every derived field from a newer payload of the same task.
    ///
    /// The payload must describe the same task; a reply for a different id is
    /// rejected and the task is left unchanged.
    pub(crate) fn replace_payload(&mut self, payload: Value) -> Result<(), ApiError> {
        let updated = Task::from_payload(payload)?;
        if updated.id != self.id {
            return Err(ApiError::Deserialization(format!(
                "reply for task {} does not match task {}",
                updated.id, self.id
            )));
        }
        *self = updated;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// True once the service has recorded a completion time.
    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn starred(&self) -> bool {
        self.starred
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Raw payload, including fields the client does not interpret.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }
}

/// A task list and the tasks it owns, in fetch/creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskList {
    id: String,
    title: String,
    raw: Map<String, Value>,
    pub(crate) tasks: Vec<Task>,
}

impl TaskList {
    /// Decode a list payload into an empty list.
    pub fn from_payload(payload: Value) -> Result<Self, ApiError> {
        let raw = into_object(payload, "list")?;
        Ok(Self {
            id: required_id(&raw, "id", "list")?,
            title: required_str(&raw, "title", "list")?,
            raw,
            tasks: Vec::new(),
        })
    }

    /// The synthetic list holding tasks without an explicit list.
    pub fn inbox() -> Self {
        let mut raw = Map::new();
        raw.insert("id".to_string(), Value::from(INBOX_ID));
        raw.insert("title".to_string(), Value::from(INBOX_ID));
        Self {
            id: INBOX_ID.to_string(),
            title: INBOX_ID.to_string(),
            raw,
            tasks: Vec::new(),
        }
    }

    /// Take over another record's payload while keeping id, title and tasks.
    pub(crate) fn merge_payload(&mut self, raw: Map<String, Value>) {
        self.raw = raw;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }
}

fn into_object(payload: Value, kind: &str) -> Result<Map<String, Value>, ApiError> {
    match payload {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::Deserialization(format!(
            "{kind} payload is not an object: {other}"
        ))),
    }
}

/// Ids arrive as strings or numbers; both are kept as strings.
fn required_id(raw: &Map<String, Value>, key: &str, kind: &str) -> Result<String, ApiError> {
    match raw.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ApiError::Deserialization(format!(
            "{kind} payload has no `{key}`"
        ))),
    }
}

fn required_str(raw: &Map<String, Value>, key: &str, kind: &str) -> Result<String, ApiError> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::Deserialization(format!("{kind} payload has no `{key}`")))
}

/// RFC 3339, or a zone-less ISO timestamp read as UTC.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|dt| dt.date_naive()))
}
