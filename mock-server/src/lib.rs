//! In-memory stand-in for the task service.
//!
//! # Design
//! Every route funnels into one synchronous `Service::handle` so that ops
//! embedded in a `POST /batch` run through exactly the same code as direct
//! calls. Batch ops execute in order and each reports its own status; the
//! envelope itself always answers 200.
//!
//! Tests can queue failures with `MockState::fail_next`: the next request
//! matching the method and path, direct or batched, gets the queued status
//! instead of being handled.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub use axum::http::{Method, StatusCode};

pub const EMAIL: &str = "test@example.com";
pub const PASSWORD: &str = "secret";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub list_id: String,
    pub created_at: String,
    pub starred: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_count: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct List {
    pub id: String,
    pub title: String,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateTask {
    pub list_id: String,
    pub title: String,
    #[serde(default)]
    pub starred: i64,
    pub due_date: Option<String>,
}

/// Partial update of a task or list; absent fields stay unchanged.
#[derive(Deserialize)]
pub struct UpdateItem {
    pub title: Option<String>,
    pub starred: Option<i64>,
    pub due_date: Option<String>,
    pub completed_at: Option<String>,
    pub note: Option<String>,
    pub recurrence_count: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreateList {
    pub title: String,
}

#[derive(Deserialize)]
pub struct CreateComment {
    pub channel_id: String,
    pub channel_type: String,
    pub text: String,
}

#[derive(Deserialize)]
pub struct CreateReminder {
    pub task_id: String,
    pub date: String,
}

#[derive(Deserialize)]
pub struct BatchOp {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    pub ops: Vec<BatchOp>,
    #[serde(default)]
    pub sequential: bool,
}

type Reply = (StatusCode, Value);

struct Fault {
    method: Method,
    path: String,
    status: StatusCode,
}

/// Service state and request handling, independent of axum.
pub struct Service {
    token: String,
    user_id: String,
    lists: Vec<List>,
    tasks: Vec<Task>,
    reminders: Vec<Value>,
    comments: HashMap<String, Vec<Value>>,
    faults: VecDeque<Fault>,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn error(status: StatusCode, message: &str) -> Reply {
    (status, json!({ "error": message }))
}

fn parse<T: for<'de> Deserialize<'de>>(body: Value) -> Result<T, Reply> {
    serde_json::from_value(body)
        .map_err(|e| error(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()))
}

fn to_json<T: Serialize>(status: StatusCode, value: &T) -> Reply {
    match serde_json::to_value(value) {
        Ok(body) => (status, body),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

impl Service {
    fn new(token: String) -> Self {
        Self {
            token,
            user_id: Uuid::new_v4().to_string(),
            lists: Vec::new(),
            tasks: Vec::new(),
            reminders: Vec::new(),
            comments: HashMap::new(),
            faults: VecDeque::new(),
        }
    }

    fn take_fault(&mut self, method: &Method, path: &str) -> Option<StatusCode> {
        let pos = self
            .faults
            .iter()
            .position(|f| f.method == method && f.path == path)?;
        self.faults.remove(pos).map(|f| f.status)
    }

    /// Handle one request, including `POST /batch`.
    pub fn handle(&mut self, method: &Method, path: &str, body: Value) -> Reply {
        if let Some(status) = self.take_fault(method, path) {
            return error(status, "injected failure");
        }
        if method == Method::POST && path == "/batch" {
            return self.batch(body);
        }
        self.route(method, path, body)
    }

    fn batch(&mut self, body: Value) -> Reply {
        let batch: BatchRequest = match parse(body) {
            Ok(batch) => batch,
            Err(reply) => return reply,
        };
        let results: Vec<Value> = batch
            .ops
            .into_iter()
            .map(|op| {
                let (status, body) = match Method::from_bytes(op.method.as_bytes()) {
                    Ok(method) if op.url != "/batch" => {
                        match self.take_fault(&method, &op.url) {
                            Some(status) => error(status, "injected failure"),
                            None => self.route(&method, &op.url, op.params),
                        }
                    }
                    _ => error(StatusCode::BAD_REQUEST, "unsupported batch op"),
                };
                json!({ "status": status.as_u16(), "body": body })
            })
            .collect();
        (StatusCode::OK, json!({ "results": results }))
    }

    fn route(&mut self, method: &Method, path: &str, body: Value) -> Reply {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let result = match (method, segments.as_slice()) {
            (&Method::POST, ["login"]) => self.login(body),
            (&Method::GET, ["me"]) => Ok((StatusCode::OK, json!({ "id": self.user_id }))),
            (&Method::GET, ["me", "tasks"]) => Ok(to_json(StatusCode::OK, &self.tasks)),
            (&Method::POST, ["me", "tasks"]) => self.create_task(body),
            (&Method::GET, ["me", "lists"]) => Ok(to_json(StatusCode::OK, &self.lists)),
            (&Method::POST, ["me", "lists"]) => self.create_list(body),
            (&Method::GET, ["me", "reminders"]) => {
                Ok((StatusCode::OK, Value::Array(self.reminders.clone())))
            }
            (&Method::POST, ["me", "reminders"]) => self.create_reminder(body),
            (&Method::GET, ["tasks", id, "messages"]) => Ok((
                StatusCode::OK,
                Value::Array(self.comments.get(*id).cloned().unwrap_or_default()),
            )),
            (&Method::POST, ["tasks", id, "messages"]) => self.create_comment(id, body),
            (&Method::PUT, [id]) => self.update_item(id, body),
            (&Method::DELETE, [id]) => self.delete_item(id),
            _ => Err(error(StatusCode::NOT_FOUND, "no such route")),
        };
        result.unwrap_or_else(|reply| reply)
    }

    fn login(&mut self, body: Value) -> Result<Reply, Reply> {
        let login: Login = parse(body)?;
        if login.email != EMAIL || login.password != PASSWORD {
            return Err(error(StatusCode::UNAUTHORIZED, "bad credentials"));
        }
        Ok((
            StatusCode::OK,
            json!({ "token": self.token, "id": self.user_id }),
        ))
    }

    fn create_task(&mut self, body: Value) -> Result<Reply, Reply> {
        let input: CreateTask = parse(body)?;
        if input.list_id != "inbox" && !self.lists.iter().any(|l| l.id == input.list_id) {
            return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "unknown list"));
        }
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            list_id: input.list_id,
            created_at: now(),
            starred: input.starred,
            due_date: input.due_date,
            completed_at: None,
            note: None,
            recurrence_count: None,
        };
        self.tasks.push(task.clone());
        Ok(to_json(StatusCode::CREATED, &task))
    }

    fn create_list(&mut self, body: Value) -> Result<Reply, Reply> {
        let input: CreateList = parse(body)?;
        let list = List {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            created_at: now(),
        };
        self.lists.push(list.clone());
        Ok(to_json(StatusCode::CREATED, &list))
    }

    fn create_reminder(&mut self, body: Value) -> Result<Reply, Reply> {
        let input: CreateReminder = parse(body)?;
        if !self.tasks.iter().any(|t| t.id == input.task_id) {
            return Err(error(StatusCode::NOT_FOUND, "no such task"));
        }
        let reminder = json!({
            "id": Uuid::new_v4().to_string(),
            "task_id": input.task_id,
            "date": input.date,
        });
        self.reminders.push(reminder.clone());
        Ok((StatusCode::CREATED, reminder))
    }

    fn create_comment(&mut self, task_id: &str, body: Value) -> Result<Reply, Reply> {
        let input: CreateComment = parse(body)?;
        if input.channel_id != task_id || input.channel_type != "tasks" {
            return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "channel mismatch"));
        }
        if !self.tasks.iter().any(|t| t.id == task_id) {
            return Err(error(StatusCode::NOT_FOUND, "no such task"));
        }
        let comment = json!({
            "id": Uuid::new_v4().to_string(),
            "task_id": task_id,
            "text": input.text,
            "created_at": now(),
        });
        self.comments
            .entry(task_id.to_string())
            .or_default()
            .push(comment.clone());
        Ok((StatusCode::CREATED, comment))
    }

    fn update_item(&mut self, id: &str, body: Value) -> Result<Reply, Reply> {
        let input: UpdateItem = parse(body)?;
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            if let Some(title) = input.title {
                task.title = title;
            }
            if let Some(starred) = input.starred {
                task.starred = starred;
            }
            if input.due_date.is_some() {
                task.due_date = input.due_date;
            }
            if input.completed_at.is_some() {
                task.completed_at = input.completed_at;
            }
            if input.note.is_some() {
                task.note = input.note;
            }
            if input.recurrence_count.is_some() {
                task.recurrence_count = input.recurrence_count;
            }
            return Ok(to_json(StatusCode::OK, &*task));
        }
        if let Some(list) = self.lists.iter_mut().find(|l| l.id == id) {
            if let Some(title) = input.title {
                list.title = title;
            }
            return Ok(to_json(StatusCode::OK, &*list));
        }
        Err(error(StatusCode::NOT_FOUND, "no such item"))
    }

    fn delete_item(&mut self, id: &str) -> Result<Reply, Reply> {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            self.tasks.remove(pos);
            self.comments.remove(id);
            return Ok((StatusCode::NO_CONTENT, Value::Null));
        }
        if let Some(pos) = self.lists.iter().position(|l| l.id == id) {
            self.lists.remove(pos);
            self.tasks.retain(|t| t.list_id != id);
            return Ok((StatusCode::NO_CONTENT, Value::Null));
        }
        Err(error(StatusCode::NOT_FOUND, "no such item"))
    }
}

/// Shared handle to the service state.
#[derive(Clone)]
pub struct MockState {
    token: String,
    inner: Arc<RwLock<Service>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    pub fn new() -> Self {
        let token = Uuid::new_v4().to_string();
        Self {
            inner: Arc::new(RwLock::new(Service::new(token.clone()))),
            token,
        }
    }

    /// Token handed out by a successful login.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Answer the next `method path` request with `status`.
    pub async fn fail_next(&self, method: Method, path: &str, status: StatusCode) {
        self.inner.write().await.faults.push_back(Fault {
            method,
            path: path.to_string(),
            status,
        });
    }

    /// Like `fail_next`, for callers outside the server's runtime.
    pub fn fail_next_blocking(&self, method: Method, path: &str, status: StatusCode) {
        self.inner.blocking_write().faults.push_back(Fault {
            method,
            path: path.to_string(),
            status,
        });
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.inner.read().await.tasks.clone()
    }

    pub async fn lists(&self) -> Vec<List> {
        self.inner.read().await.lists.clone()
    }
}

pub fn app_with_state(state: MockState) -> Router {
    Router::new()
        .route("/login", post(serve))
        .route("/batch", post(serve))
        .route("/me", get(serve))
        .route("/me/tasks", get(serve).post(serve))
        .route("/me/lists", get(serve).post(serve))
        .route("/me/reminders", get(serve).post(serve))
        .route("/tasks/{id}/messages", get(serve).post(serve))
        .route("/{id}", put(serve).delete(serve))
        .with_state(state)
}

pub async fn run_with_state(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn serve(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let (status, reply) = respond(&state, &method, &path, &headers, &body).await;
    info!(method = %method, path = %path, status = status.as_u16(), "served");
    if reply.is_null() {
        status.into_response()
    } else {
        (status, Json(reply)).into_response()
    }
}

async fn respond(
    state: &MockState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: &Bytes,
) -> Reply {
    if path != "/login" {
        let expected = format!("Bearer {}", state.token);
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected);
        if !authorized {
            return error(StatusCode::UNAUTHORIZED, "missing or invalid token");
        }
    }
    let body = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(body) {
            Ok(body) => body,
            Err(e) => return error(StatusCode::BAD_REQUEST, &e.to_string()),
        }
    };
    state.inner.write().await.handle(method, path, body)
}
