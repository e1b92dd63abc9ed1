//! Shared fixtures for unit tests: a fixed clock and a scripted transport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use serde_json::{json, Value};

use crate::client::TaskClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::model::{Task, TaskList};
use crate::requests::RequestBuilder;
use crate::transport::Transport;

/// Always reports 2024-01-02T03:04:05Z.
pub struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
    ))
}

pub fn builder() -> RequestBuilder {
    RequestBuilder::new("http://api.test", "http://comments.test", fixed_clock())
}

/// Replays canned `(status, body)` replies in order and records requests.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<(u16, String)>>,
    sent: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<(u16, String)>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            sent: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.sent.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        _timeout: Duration,
    ) -> Result<HttpResponse, ApiError> {
        self.sent.borrow_mut().push(request.clone());
        let (status, body) = self
            .replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ApiError::Transport("no scripted reply left".to_string()))?;
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body,
        })
    }
}

pub fn client(replies: Vec<(u16, String)>) -> TaskClient<ScriptedTransport> {
    let config = ClientConfig {
        api_url: "http://api.test".to_string(),
        comments_url: "http://comments.test".to_string(),
        retry_delay: Duration::ZERO,
        ..ClientConfig::default()
    };
    TaskClient::with_transport(config, ScriptedTransport::new(replies), fixed_clock())
}

/// A client whose store was filled by one sync of `tasks` and `lists`.
pub fn synced_client(
    tasks: Value,
    lists: Value,
    replies: Vec<(u16, String)>,
) -> TaskClient<ScriptedTransport> {
    let fetch = json!({"results": [
        {"status": 200, "body": tasks},
        {"status": 200, "body": lists},
    ]});
    let mut all = vec![(200, fetch.to_string())];
    all.extend(replies);
    let mut c = client(all);
    c.update_lists().unwrap();
    c
}

pub fn task(payload: Value) -> Task {
    Task::from_payload(payload).unwrap()
}

pub fn list(payload: Value) -> TaskList {
    TaskList::from_payload(payload).unwrap()
}
