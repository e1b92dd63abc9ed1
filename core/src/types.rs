//! Wire DTOs for the task service.
//!
//! # Design
//! Request bodies are typed structs so optional fields can be omitted with
//! `skip_serializing_if`, the same way the service expects them. Replies that
//! the core interprets structurally (login, batch) get typed structs too;
//! task and list payloads stay as raw JSON and are decoded by `model`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Reply of `POST /login`. The user id may be numeric or a string.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginReply {
    pub token: String,
    pub id: Value,
}

/// Body of `POST /me/tasks`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTask {
    pub list_id: String,
    pub title: String,
    /// 1 when starred, 0 otherwise.
    pub starred: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteTask {
    pub completed_at: String,
    pub position: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetNote {
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetDueDate {
    pub due_date: String,
    pub recurrence_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteTask {
    pub deleted_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateList {
    pub title: String,
}

/// Body of `POST /tasks/{id}/messages` on the comments host.
#[derive(Debug, Clone, Serialize)]
pub struct CreateComment {
    pub channel_id: String,
    pub channel_type: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateReminder {
    pub task_id: String,
    pub date: String,
}

/// One embedded operation of a batch call. `url` is relative to the API host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchOp {
    pub method: String,
    pub url: String,
    pub params: Value,
}

/// Body of `POST /batch`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEnvelope {
    pub ops: Vec<BatchOp>,
    pub sequential: bool,
}

/// Reply of `POST /batch`: one result per op, in submission order.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchReply {
    pub results: Vec<BatchOpResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchOpResult {
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}

/// Input for creating a task through the client.
///
/// The target list is addressed by title and defaults to the inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub list_title: String,
    pub note: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub starred: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            list_title: crate::model::INBOX_ID.to_string(),
            note: None,
            due_date: None,
            starred: false,
        }
    }

    #[must_use]
    pub fn with_list(mut self, list_title: impl Into<String>) -> Self {
        self.list_title = list_title.into();
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn starred(mut self, starred: bool) -> Self {
        self.starred = starred;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_task_omits_absent_due_date() {
        let body = CreateTask {
            list_id: "inbox".to_string(),
            title: "Milk".to_string(),
            starred: 0,
            due_date: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("due_date").is_none());
        assert_eq!(json["starred"], 0);
    }

    #[test]
    fn batch_result_body_defaults_to_null() {
        let reply: BatchReply = serde_json::from_str(r#"{"results":[{"status":204}]}"#).unwrap();
        assert_eq!(reply.results[0].status, 204);
        assert!(reply.results[0].body.is_null());
    }

    #[test]
    fn new_task_defaults_to_inbox() {
        let task = NewTask::new("Milk");
        assert_eq!(task.list_title, "inbox");
        assert!(!task.starred);
        assert!(task.note.is_none());
    }
}
