//! The session-level client: auth, raw request access and the local mirror.
//!
//! # Design
//! `TaskClient` ties a `RequestBuilder`, a `Dispatcher` and the current
//! `LocalStore` snapshot together. The store is held as `Arc<LocalStore>`:
//! a sync replaces the whole reference at once and mutations copy-on-write,
//! so a snapshot obtained from `store()` never changes under its reader.
//!
//! Calls are blocking and a client runs one logical call at a time. Share a
//! client between threads by wrapping it in a `Mutex`.

use std::sync::Arc;
use std::time::Duration;

use mockable::{Clock, DefaultClock};
use serde_json::Value;
use tracing::info;

use crate::config::ClientConfig;
use crate::dispatch::{BatchResults, Dispatcher};
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::requests::RequestBuilder;
use crate::store::LocalStore;
use crate::transport::{Transport, UreqTransport};
use crate::types::LoginReply;

/// Client for the task service.
#[derive(Debug)]
pub struct TaskClient<T = UreqTransport> {
    pub(crate) config: ClientConfig,
    pub(crate) requests: RequestBuilder,
    pub(crate) dispatcher: Dispatcher<T>,
    pub(crate) store: Arc<LocalStore>,
    user_id: Option<String>,
}

impl TaskClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new(), Arc::new(DefaultClock))
    }
}

impl<T: Transport> TaskClient<T> {
    pub fn with_transport(
        config: ClientConfig,
        transport: T,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let requests = RequestBuilder::new(&config.api_url, &config.comments_url, clock);
        let dispatcher = Dispatcher::new(transport).with_retry_delay(config.retry_delay);
        Self {
            config,
            requests,
            dispatcher,
            store: Arc::new(LocalStore::default()),
            user_id: None,
        }
    }

    /// Exchange credentials for a token and use it for every later call.
    pub fn login(&mut self, email: &str, password: &str) -> Result<(), ApiError> {
        let request = self.requests.login(email, password)?;
        let reply = match self.dispatcher.send_one(&request, self.config.timeout) {
            Ok(reply) => reply,
            Err(ApiError::Http { status, .. }) if (400..500).contains(&status) => {
                return Err(ApiError::Auth { status });
            }
            Err(err) => return Err(err),
        };
        let reply: LoginReply =
            serde_json::from_value(reply).map_err(|e| ApiError::Deserialization(e.to_string()))?;

        self.dispatcher.set_token(&reply.token);
        self.user_id = Some(match reply.id {
            Value::String(s) => s,
            other => other.to_string(),
        });
        info!(user_id = self.user_id.as_deref(), "logged in");
        Ok(())
    }

    /// Use a token obtained elsewhere instead of logging in.
    pub fn set_token(&mut self, token: &str) {
        self.dispatcher.set_token(token);
    }

    pub fn token(&self) -> Option<&str> {
        self.dispatcher.token()
    }

    /// Id of the logged-in user, known only after `login`.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builder for raw request descriptors, for use with `send_request`.
    pub fn requests(&self) -> &RequestBuilder {
        &self.requests
    }

    pub fn transport(&self) -> &T {
        self.dispatcher.transport()
    }

    /// Current snapshot of the local mirror.
    pub fn store(&self) -> Arc<LocalStore> {
        Arc::clone(&self.store)
    }

    fn timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.config.timeout)
    }

    /// Send one request. `None` uses the configured timeout.
    pub fn send_request(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<Value, ApiError> {
        self.dispatcher.send_one(request, self.timeout(timeout))
    }

    /// Send `requests` as one sequential batch.
    ///
    /// The returned iterator performs no I/O until it is first advanced; the
    /// first `next()` sends the whole batch.
    pub fn send_requests(
        &self,
        requests: &[HttpRequest],
        timeout: Option<Duration>,
    ) -> Result<BatchResults<'_, T>, ApiError> {
        self.dispatcher
            .send_batch(&self.requests, requests, self.timeout(timeout))
    }
}
