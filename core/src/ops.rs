//! Mutations: remote call first, local mirror second.
//!
//! Targets are addressed by title and resolved against the current store,
//! so `update_lists` must have run at least once. The mirror is only changed
//! after the service accepted the request. Creating a task with a note takes
//! two calls; if the note call fails the task stays created, both remotely
//! and in the mirror, and the note error is returned.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::TaskClient;
use crate::error::ApiError;
use crate::model::{Task, TaskList};
use crate::store::LocalStore;
use crate::transport::Transport;
use crate::types::NewTask;

impl<T: Transport> TaskClient<T> {
    fn resolve_list(&self, list_title: &str) -> Result<String, ApiError> {
        self.store
            .list_with_title(list_title)
            .map(|l| l.id().to_string())
            .ok_or_else(|| ApiError::not_found("list", list_title))
    }

    /// Ids of the list and of the newest task titled `title` in it.
    fn resolve_task(&self, title: &str, list_title: &str) -> Result<(String, String), ApiError> {
        let list = self
            .store
            .list_with_title(list_title)
            .ok_or_else(|| ApiError::not_found("list", list_title))?;
        let task = list
            .task_with_title(title)
            .ok_or_else(|| ApiError::not_found("task", title))?;
        Ok((list.id().to_string(), task.id().to_string()))
    }

    fn store_mut(&mut self) -> &mut LocalStore {
        Arc::make_mut(&mut self.store)
    }

    /// Replace a cached task's payload with the service's reply.
    fn refresh_task(&mut self, list_id: &str, task_id: &str, reply: Value) -> Result<Task, ApiError> {
        let task = self
            .store_mut()
            .list_mut(list_id)
            .and_then(|l| l.task_mut(task_id))
            .ok_or_else(|| ApiError::not_found("task", task_id))?;
        if let Err(err) = task.replace_payload(reply) {
            warn!(task_id = %task_id, error = %err, "reply not applied, cached task is stale");
            return Err(err);
        }
        Ok(task.clone())
    }

    /// Create a task in the list titled `new_task.list_title`.
    pub fn add_task(&mut self, new_task: NewTask) -> Result<Task, ApiError> {
        let list_id = self.resolve_list(&new_task.list_title)?;
        let request = self.requests.add_task(
            &new_task.title,
            &list_id,
            new_task.due_date,
            new_task.starred,
        )?;
        let reply = self.dispatcher.send_one(&request, self.config.timeout)?;
        let task = Task::from_payload(reply)?;
        let task_id = task.id().to_string();
        if task.list_id() != list_id {
            warn!(task_id = %task_id, list_id = task.list_id(), "created task names another list");
            return Err(ApiError::Deserialization(format!(
                "task {task_id} was created in list {} instead of {list_id}",
                task.list_id()
            )));
        }

        self.store_mut()
            .list_mut(&list_id)
            .ok_or_else(|| ApiError::not_found("list", &new_task.list_title))?
            .add_task(task.clone());
        info!(task_id = %task_id, list_id = %list_id, "task created");

        let Some(note) = &new_task.note else {
            return Ok(task);
        };
        let request = self.requests.set_note(&task_id, note)?;
        match self.dispatcher.send_one(&request, self.config.timeout) {
            Ok(reply) => self.refresh_task(&list_id, &task_id, reply),
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "note not set, task kept");
                Err(err)
            }
        }
    }

    /// Mark the newest task titled `title` in `list_title` as completed.
    pub fn complete_task(&mut self, title: &str, list_title: &str) -> Result<Task, ApiError> {
        let (list_id, task_id) = self.resolve_task(title, list_title)?;
        let request = self.requests.complete_task(&task_id, None)?;
        let reply = self.dispatcher.send_one(&request, self.config.timeout)?;
        let task = self.refresh_task(&list_id, &task_id, reply)?;
        info!(task_id = %task_id, "task completed");
        Ok(task)
    }

    pub fn delete_task(&mut self, title: &str, list_title: &str) -> Result<(), ApiError> {
        let (list_id, task_id) = self.resolve_task(title, list_title)?;
        let request = self.requests.delete_task(&task_id, None)?;
        self.dispatcher.send_one(&request, self.config.timeout)?;

        if let Some(list) = self.store_mut().list_mut(&list_id) {
            list.remove_task(&task_id);
        }
        info!(task_id = %task_id, "task deleted");
        Ok(())
    }

    pub fn add_list(&mut self, title: &str) -> Result<TaskList, ApiError> {
        let request = self.requests.add_list(title)?;
        let reply = self.dispatcher.send_one(&request, self.config.timeout)?;
        let list = TaskList::from_payload(reply)?;
        self.store_mut().push_list(list.clone());
        info!(list_id = list.id(), "list created");
        Ok(list)
    }

    /// Delete the first list titled `title`, with all of its tasks.
    pub fn delete_list(&mut self, title: &str) -> Result<(), ApiError> {
        let list_id = self.resolve_list(title)?;
        let request = self.requests.delete_list(&list_id);
        self.dispatcher.send_one(&request, self.config.timeout)?;
        self.store_mut().remove_list(&list_id);
        info!(list_id = %list_id, "list deleted");
        Ok(())
    }

    pub fn set_task_note(
        &mut self,
        title: &str,
        list_title: &str,
        note: &str,
    ) -> Result<Task, ApiError> {
        let (list_id, task_id) = self.resolve_task(title, list_title)?;
        let request = self.requests.set_note(&task_id, note)?;
        let reply = self.dispatcher.send_one(&request, self.config.timeout)?;
        self.refresh_task(&list_id, &task_id, reply)
    }

    pub fn set_task_due_date(
        &mut self,
        title: &str,
        list_title: &str,
        due_date: NaiveDate,
    ) -> Result<Task, ApiError> {
        let (list_id, task_id) = self.resolve_task(title, list_title)?;
        let request = self.requests.set_due_date(&task_id, due_date, 1)?;
        let reply = self.dispatcher.send_one(&request, self.config.timeout)?;
        self.refresh_task(&list_id, &task_id, reply)
    }

    /// Comments on a task, as returned by the comments host.
    pub fn task_comments(&self, title: &str, list_title: &str) -> Result<Vec<Value>, ApiError> {
        let (_, task_id) = self.resolve_task(title, list_title)?;
        let request = self.requests.comments_for_task(&task_id);
        match self.dispatcher.send_one(&request, self.config.timeout)? {
            Value::Array(comments) => Ok(comments),
            Value::Null => Ok(Vec::new()),
            other => Err(ApiError::Deserialization(format!(
                "comments reply is not an array: {other}"
            ))),
        }
    }

    pub fn add_comment(
        &self,
        title: &str,
        list_title: &str,
        text: &str,
    ) -> Result<Value, ApiError> {
        let (_, task_id) = self.resolve_task(title, list_title)?;
        let request = self.requests.add_comment(&task_id, text)?;
        self.dispatcher.send_one(&request, self.config.timeout)
    }

    /// Set a reminder; `date` is an ISO timestamp.
    pub fn set_reminder(&self, title: &str, list_title: &str, date: &str) -> Result<Value, ApiError> {
        let (_, task_id) = self.resolve_task(title, list_title)?;
        let request = self.requests.set_reminder(&task_id, date)?;
        self.dispatcher.send_one(&request, self.config.timeout)
    }
}
