//! Transaction dispatch: single calls and sequential batches.
//!
//! # Design
//! The dispatcher owns the transport and the session's bearer token. Every
//! outgoing call gets the same two headers. A 404 is retried exactly once
//! after a fixed delay because the service briefly returns 404 for objects it
//! has only just created; no other status is retried.
//!
//! A batch is one `POST /batch` whose reply lists per-op results in
//! submission order. `BatchResults` is lazy: building it sends nothing, and
//! the first `next()` transmits the whole batch. The first failing op ends
//! the sequence; results after it are never yielded.

use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::requests::RequestBuilder;
use crate::transport::Transport;
use crate::types::{BatchOpResult, BatchReply};

/// Delay before the single retry of a 404.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Sends requests with the session headers and the 404 retry policy.
#[derive(Debug)]
pub struct Dispatcher<T> {
    transport: T,
    token: Option<String>,
    retry_delay: Duration,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token: None,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Override the 404 retry delay. Only useful to keep tests fast.
    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn decorate(&self, request: &HttpRequest) -> HttpRequest {
        let mut request = request.clone();
        request.headers.retain(|(name, _)| {
            !name.eq_ignore_ascii_case("authorization") && !name.eq_ignore_ascii_case("content-type")
        });
        request
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        if let Some(token) = &self.token {
            request
                .headers
                .push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        request
    }

    /// Send one request and decode its JSON reply.
    ///
    /// A 404 is retried once after the retry delay. Any other status >= 300,
    /// or a second 404, fails with `ApiError::Http`.
    pub fn send_one(&self, request: &HttpRequest, timeout: Duration) -> Result<Value, ApiError> {
        let request = self.decorate(request);
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let mut response = self.transport.execute(&request, timeout)?;
        if response.status == 404 {
            let delay_ms = u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX);
            warn!(url = %request.url, delay_ms, "got 404, retrying once");
            thread::sleep(self.retry_delay);
            response = self.transport.execute(&request, timeout)?;
        }
        decode(response)
    }

    /// Prepare a batch of `requests`. Nothing is sent until the first `next()`.
    pub fn send_batch<'a>(
        &'a self,
        builder: &RequestBuilder,
        requests: &[HttpRequest],
        timeout: Duration,
    ) -> Result<BatchResults<'a, T>, ApiError> {
        let envelope = builder.batch(requests)?;
        Ok(BatchResults {
            dispatcher: self,
            state: BatchState::Pending {
                envelope,
                expected: requests.len(),
                timeout,
            },
        })
    }
}

fn decode(response: HttpResponse) -> Result<Value, ApiError> {
    if !response.is_success() {
        return Err(ApiError::Http {
            status: response.status,
            body: response.body,
        });
    }
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

enum BatchState {
    Pending {
        envelope: HttpRequest,
        expected: usize,
        timeout: Duration,
    },
    Yielding {
        results: std::iter::Enumerate<std::vec::IntoIter<BatchOpResult>>,
    },
    Done,
}

/// Lazy, ordered results of a batch call.
///
/// Yields one `Ok(body)` per submitted op in submission order. The envelope
/// call is made on the first `next()`. After the first `Err` the iterator is
/// exhausted.
pub struct BatchResults<'a, T> {
    dispatcher: &'a Dispatcher<T>,
    state: BatchState,
}

impl<T: Transport> BatchResults<'_, T> {
    /// Drive the batch to completion and collect every body.
    pub fn collect_all(self) -> Result<Vec<Value>, ApiError> {
        self.collect()
    }

    fn start(
        &mut self,
        envelope: &HttpRequest,
        expected: usize,
        timeout: Duration,
    ) -> Result<(), ApiError> {
        let reply = self.dispatcher.send_one(envelope, timeout)?;
        let reply: BatchReply =
            serde_json::from_value(reply).map_err(|e| ApiError::Deserialization(e.to_string()))?;
        if reply.results.len() != expected {
            return Err(ApiError::Deserialization(format!(
                "batch of {expected} ops answered with {} results",
                reply.results.len()
            )));
        }
        self.state = BatchState::Yielding {
            results: reply.results.into_iter().enumerate(),
        };
        Ok(())
    }
}

impl<T: Transport> Iterator for BatchResults<'_, T> {
    type Item = Result<Value, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, BatchState::Pending { .. }) {
            if let BatchState::Pending {
                envelope,
                expected,
                timeout,
            } = std::mem::replace(&mut self.state, BatchState::Done)
            {
                if let Err(err) = self.start(&envelope, expected, timeout) {
                    return Some(Err(err));
                }
            }
        }

        let BatchState::Yielding { results } = &mut self.state else {
            return None;
        };
        match results.next() {
            Some((_, result)) if result.status < 300 => Some(Ok(result.body)),
            Some((index, result)) => {
                warn!(index, status = result.status, "batch op failed");
                self.state = BatchState::Done;
                Some(Err(ApiError::BatchOp {
                    index,
                    status: result.status,
                }))
            }
            None => {
                self.state = BatchState::Done;
                None
            }
        }
    }
}
