//! Request descriptors for every call the task service supports.
//!
//! # Design
//! `RequestBuilder` holds the two base URLs and a clock. Every method is a
//! pure function of its arguments (plus the clock, for defaulted
//! timestamps) and returns an `HttpRequest`; nothing here performs I/O.
//! Only shape-level rules are applied: booleans become 0/1, absent optional
//! fields are omitted.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, SecondsFormat};
use mockable::Clock;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{
    BatchEnvelope, BatchOp, CompleteTask, CreateComment, CreateList, CreateReminder, CreateTask,
    Credentials, DeleteTask, SetDueDate, SetNote,
};

/// Builds `HttpRequest` descriptors for the API and comments hosts.
#[derive(Clone)]
pub struct RequestBuilder {
    api_url: String,
    comments_url: String,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("api_url", &self.api_url)
            .field("comments_url", &self.comments_url)
            .finish_non_exhaustive()
    }
}

impl RequestBuilder {
    pub fn new(api_url: &str, comments_url: &str, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            comments_url: comments_url.trim_end_matches('/').to_string(),
            clock,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn comments_url(&self) -> &str {
        &self.comments_url
    }

    /// Current time from the injected clock, in the service's timestamp format.
    pub fn now(&self) -> String {
        self.clock
            .utc()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn api(&self, method: HttpMethod, path: &str, body: Option<Value>) -> HttpRequest {
        HttpRequest::new(method, format!("{}{path}", self.api_url), body)
    }

    fn comments(&self, method: HttpMethod, path: &str, body: Option<Value>) -> HttpRequest {
        HttpRequest::new(method, format!("{}{path}", self.comments_url), body)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<HttpRequest, ApiError> {
        let body = to_body(&Credentials {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        Ok(self.api(HttpMethod::Post, "/login", Some(body)))
    }

    pub fn me(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me", None)
    }

    pub fn all_tasks(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me/tasks", None)
    }

    pub fn lists(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me/lists", None)
    }

    pub fn add_task(
        &self,
        title: &str,
        list_id: &str,
        due_date: Option<NaiveDate>,
        starred: bool,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_body(&CreateTask {
            list_id: list_id.to_string(),
            title: title.to_string(),
            starred: u8::from(starred),
            due_date: due_date.map(format_date),
        })?;
        Ok(self.api(HttpMethod::Post, "/me/tasks", Some(body)))
    }

    /// Mark a task completed. `completed_at` defaults to the clock's now.
    pub fn complete_task(
        &self,
        task_id: &str,
        completed_at: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_body(&CompleteTask {
            completed_at: completed_at.map_or_else(|| self.now(), str::to_string),
            position: 0,
        })?;
        Ok(self.api(HttpMethod::Put, &format!("/{task_id}"), Some(body)))
    }

    pub fn set_note(&self, task_id: &str, note: &str) -> Result<HttpRequest, ApiError> {
        let body = to_body(&SetNote {
            note: note.to_string(),
        })?;
        Ok(self.api(HttpMethod::Put, &format!("/{task_id}"), Some(body)))
    }

    pub fn set_due_date(
        &self,
        task_id: &str,
        due_date: NaiveDate,
        recurrence_count: u32,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_body(&SetDueDate {
            due_date: format_date(due_date),
            recurrence_count,
        })?;
        Ok(self.api(HttpMethod::Put, &format!("/{task_id}"), Some(body)))
    }

    /// Delete a task. `deleted_at` defaults to the clock's now.
    pub fn delete_task(
        &self,
        task_id: &str,
        deleted_at: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_body(&DeleteTask {
            deleted_at: deleted_at.map_or_else(|| self.now(), str::to_string),
        })?;
        Ok(self.api(HttpMethod::Delete, &format!("/{task_id}"), Some(body)))
    }

    pub fn add_list(&self, title: &str) -> Result<HttpRequest, ApiError> {
        let body = to_body(&CreateList {
            title: title.to_string(),
        })?;
        Ok(self.api(HttpMethod::Post, "/me/lists", Some(body)))
    }

    /// Delete a list and every task it owns.
    pub fn delete_list(&self, list_id: &str) -> HttpRequest {
        self.api(HttpMethod::Delete, &format!("/{list_id}"), None)
    }

    pub fn comments_for_task(&self, task_id: &str) -> HttpRequest {
        self.comments(HttpMethod::Get, &format!("/tasks/{task_id}/messages"), None)
    }

    pub fn add_comment(&self, task_id: &str, text: &str) -> Result<HttpRequest, ApiError> {
        let body = to_body(&CreateComment {
            channel_id: task_id.to_string(),
            channel_type: "tasks".to_string(),
            text: text.to_string(),
        })?;
        Ok(self.comments(
            HttpMethod::Post,
            &format!("/tasks/{task_id}/messages"),
            Some(body),
        ))
    }

    pub fn reminders(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me/reminders", None)
    }

    pub fn set_reminder(&self, task_id: &str, date: &str) -> Result<HttpRequest, ApiError> {
        let body = to_body(&CreateReminder {
            task_id: task_id.to_string(),
            date: date.to_string(),
        })?;
        Ok(self.api(HttpMethod::Post, "/me/reminders", Some(body)))
    }

    pub fn shares(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me/shares", None)
    }

    pub fn services(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me/services", None)
    }

    pub fn events(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me/events", None)
    }

    pub fn settings(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me/settings", None)
    }

    pub fn friends(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me/friends", None)
    }

    pub fn quota(&self) -> HttpRequest {
        self.api(HttpMethod::Get, "/me/quota", None)
    }

    /// Wrap `requests` into one sequential `POST /batch` call.
    ///
    /// Embedded URLs are made relative to the API host. An op without a body
    /// carries `{}` as its params.
    pub fn batch(&self, requests: &[HttpRequest]) -> Result<HttpRequest, ApiError> {
        let ops = requests.iter().map(|req| self.batch_op(req)).collect();
        let body = to_body(&BatchEnvelope {
            ops,
            sequential: true,
        })?;
        Ok(self.api(HttpMethod::Post, "/batch", Some(body)))
    }

    fn batch_op(&self, request: &HttpRequest) -> BatchOp {
        let url = request
            .url
            .strip_prefix(&self.api_url)
            .unwrap_or(&request.url);
        BatchOp {
            method: request.method.as_str().to_string(),
            url: url.to_string(),
            params: request
                .body
                .clone()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        }
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
