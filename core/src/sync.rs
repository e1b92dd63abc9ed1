//! Full refresh of the local mirror.
//!
//! # Design
//! Tasks and lists are fetched in one batch so both views come from the
//! same server state. The new store is built completely off to the side and
//! then swapped in with a single assignment. A failed fetch or a payload
//! that does not decode leaves the previous snapshot in place.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::client::TaskClient;
use crate::error::ApiError;
use crate::model::{Task, TaskList};
use crate::store::LocalStore;
use crate::transport::Transport;

impl<T: Transport> TaskClient<T> {
    /// Replace the local mirror with the service's current lists and tasks.
    pub fn update_lists(&mut self) -> Result<(), ApiError> {
        let fetch = [self.requests.all_tasks(), self.requests.lists()];
        let mut bodies = self
            .dispatcher
            .send_batch(&self.requests, &fetch, self.config.timeout)?
            .collect_all()?
            .into_iter();

        let (Some(tasks), Some(lists)) = (bodies.next(), bodies.next()) else {
            return Err(ApiError::Deserialization(
                "batch reply is missing results".to_string(),
            ));
        };
        let tasks = decode_all(tasks, "tasks", Task::from_payload)?;
        let lists = decode_all(lists, "lists", TaskList::from_payload)?;

        let store = LocalStore::from_remote(tasks, lists);
        info!(
            lists = store.lists().len(),
            tasks = store.tasks().count(),
            "local store replaced"
        );
        self.store = Arc::new(store);
        Ok(())
    }
}

fn decode_all<M>(
    body: Value,
    what: &str,
    decode: impl Fn(Value) -> Result<M, ApiError>,
) -> Result<Vec<M>, ApiError> {
    match body {
        Value::Array(items) => items.into_iter().map(decode).collect(),
        other => Err(ApiError::Deserialization(format!(
            "{what} reply is not an array: {other}"
        ))),
    }
}
