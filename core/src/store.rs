//! In-memory mirror of the remote lists and tasks.
//!
//! # Design
//! `LocalStore` is an ordered collection of `TaskList`s, each owning its
//! tasks. Queries are pure projections. Mutations are crate-private: only
//! the sync engine and the mutation operations change the mirror, and only
//! after the service acknowledged the change.
//!
//! Titles are not unique. `list_with_title` returns the first match in
//! store order; `task_with_title` returns the most recently created match.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::warn;

use crate::model::{Task, TaskList, INBOX_ID};

/// Ordered lists of tasks, as last seen on the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalStore {
    lists: Vec<TaskList>,
}

impl LocalStore {
    /// Build a store from a full fetch.
    ///
    /// The synthetic inbox comes first, then one list per server record in
    /// server order. Each task goes to the list named by its `list_id`.
    /// Tasks naming an unknown list, and tasks repeating an earlier id, are
    /// dropped.
    pub fn from_remote(tasks: Vec<Task>, lists: Vec<TaskList>) -> Self {
        let mut store = LocalStore {
            lists: vec![TaskList::inbox()],
        };
        for list in lists {
            if list.id() == INBOX_ID {
                store.lists[0].merge_payload(list.raw().clone());
                continue;
            }
            if store.list_with_id(list.id()).is_some() {
                warn!(list_id = list.id(), "duplicate list id in fetch, dropping");
                continue;
            }
            store.lists.push(list);
        }

        let mut seen = HashSet::new();
        for task in tasks {
            if !seen.insert(task.id().to_string()) {
                warn!(task_id = task.id(), "duplicate task id in fetch, dropping");
                continue;
            }
            match store.lists.iter_mut().find(|l| l.id() == task.list_id()) {
                Some(list) => list.add_task(task),
                None => warn!(
                    task_id = task.id(),
                    list_id = task.list_id(),
                    "task names an unknown list, dropping"
                ),
            }
        }
        store
    }

    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// First list, in store order, with the given title.
    pub fn list_with_title(&self, title: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.title() == title)
    }

    pub fn lists_with_title(&self, title: &str) -> Vec<&TaskList> {
        self.lists.iter().filter(|l| l.title() == title).collect()
    }

    pub fn list_with_id(&self, id: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.id() == id)
    }

    pub fn task_with_id(&self, id: &str) -> Option<&Task> {
        self.tasks().find(|t| t.id() == id)
    }

    /// Every task, list by list.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.lists.iter().flat_map(|l| l.tasks.iter())
    }

    pub fn tasks_due_before(&self, date: NaiveDate) -> Vec<&Task> {
        self.lists
            .iter()
            .flat_map(|l| l.tasks_due_before(date))
            .collect()
    }

    pub fn tasks_due_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.lists.iter().flat_map(|l| l.tasks_due_on(date)).collect()
    }

    pub fn incomplete_tasks(&self) -> Vec<&Task> {
        self.lists.iter().flat_map(|l| l.incomplete_tasks()).collect()
    }

    pub(crate) fn push_list(&mut self, list: TaskList) {
        self.lists.push(list);
    }

    pub(crate) fn remove_list(&mut self, id: &str) -> Option<TaskList> {
        let pos = self.lists.iter().position(|l| l.id() == id)?;
        Some(self.lists.remove(pos))
    }

    pub(crate) fn list_mut(&mut self, id: &str) -> Option<&mut TaskList> {
        self.lists.iter_mut().find(|l| l.id() == id)
    }
}

impl TaskList {
    /// Most recently created task with the given title.
    ///
    /// Tasks are stably sorted by `created_at`, newest first; among equal
    /// timestamps the earlier task in list order wins. Tasks without a
    /// creation time sort last.
    pub fn task_with_title(&self, title: &str) -> Option<&Task> {
        let mut matches = self.tasks_with_title(title);
        matches.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        matches.into_iter().next()
    }

    pub fn tasks_with_title(&self, title: &str) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.title() == title).collect()
    }

    pub fn task_with_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    pub fn tasks_due_before(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.due_date().is_some_and(|due| due < date))
            .collect()
    }

    pub fn tasks_due_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.due_date() == Some(date))
            .collect()
    }

    pub fn incomplete_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.completed()).collect()
    }

    pub(crate) fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub(crate) fn remove_task(&mut self, id: &str) -> Option<Task> {
        let pos = self.tasks.iter().position(|t| t.id() == id)?;
        Some(self.tasks.remove(pos))
    }

    pub(crate) fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{list, task};
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> LocalStore {
        LocalStore::from_remote(
            vec![
                task(json!({"id": "1", "title": "X", "list_id": "10",
                    "created_at": "2024-01-01T00:00:00Z", "due_date": "2024-02-01"})),
                task(json!({"id": "2", "title": "X", "list_id": "10",
                    "created_at": "2024-01-03T00:00:00Z", "due_date": "2024-02-10"})),
                task(json!({"id": "3", "title": "Y", "list_id": "inbox",
                    "created_at": "2024-01-02T00:00:00Z", "due_date": "2024-02-01",
                    "completed_at": "2024-01-05T00:00:00Z"})),
                task(json!({"id": "4", "title": "Z", "list_id": "11"})),
            ],
            vec![
                list(json!({"id": 10, "title": "Work"})),
                list(json!({"id": 11, "title": "Work"})),
            ],
        )
    }

    #[test]
    fn inbox_comes_first_and_owns_inbox_tasks() {
        let store = sample();
        let ids: Vec<&str> = store.lists().iter().map(TaskList::id).collect();
        assert_eq!(ids, vec!["inbox", "10", "11"]);
        let inbox = store.list_with_title("inbox").unwrap();
        assert_eq!(inbox.tasks().len(), 1);
        assert_eq!(inbox.tasks()[0].id(), "3");
    }

    #[test]
    fn every_task_resolves_to_its_list() {
        let store = sample();
        for list in store.lists() {
            for task in list.tasks() {
                assert_eq!(task.list_id(), list.id());
            }
        }
        assert_eq!(store.tasks().count(), 4);
    }

    #[test]
    fn list_with_title_is_first_match() {
        let store = sample();
        assert_eq!(store.list_with_title("Work").unwrap().id(), "10");
        assert_eq!(store.lists_with_title("Work").len(), 2);
        assert!(store.list_with_title("Home").is_none());
    }

    #[test]
    fn task_with_title_prefers_latest_created() {
        let store = sample();
        let work = store.list_with_id("10").unwrap();
        assert_eq!(work.task_with_title("X").unwrap().id(), "2");
        assert!(work.task_with_title("nope").is_none());
    }

    #[test]
    fn task_with_title_ties_keep_list_order() {
        let store = LocalStore::from_remote(
            vec![
                task(json!({"id": "a", "title": "X", "list_id": "inbox",
                    "created_at": "2024-01-01T00:00:00Z"})),
                task(json!({"id": "b", "title": "X", "list_id": "inbox",
                    "created_at": "2024-01-01T00:00:00Z"})),
                task(json!({"id": "c", "title": "X", "list_id": "inbox"})),
            ],
            vec![],
        );
        let inbox = store.list_with_id("inbox").unwrap();
        assert_eq!(inbox.task_with_title("X").unwrap().id(), "a");
    }

    #[test]
    fn due_date_projections() {
        let store = sample();
        let before: Vec<&str> = store
            .tasks_due_before(date(2024, 2, 5))
            .into_iter()
            .map(Task::id)
            .collect();
        assert_eq!(before, vec!["3", "1"]);

        let on: Vec<&str> = store
            .tasks_due_on(date(2024, 2, 10))
            .into_iter()
            .map(Task::id)
            .collect();
        assert_eq!(on, vec!["2"]);
        assert!(store.tasks_due_before(date(2024, 2, 1)).is_empty());
    }

    #[test]
    fn incomplete_tasks_skip_completed() {
        let store = sample();
        let ids: Vec<&str> = store.incomplete_tasks().into_iter().map(Task::id).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);
    }

    #[test]
    fn orphans_and_duplicates_are_dropped() {
        let store = LocalStore::from_remote(
            vec![
                task(json!({"id": "1", "title": "a", "list_id": "missing"})),
                task(json!({"id": "2", "title": "b", "list_id": "inbox"})),
                task(json!({"id": "2", "title": "c", "list_id": "inbox"})),
            ],
            vec![],
        );
        assert_eq!(store.tasks().count(), 1);
        assert_eq!(store.task_with_id("2").unwrap().title(), "b");
        assert!(store.task_with_id("1").is_none());
    }

    #[test]
    fn server_inbox_record_does_not_duplicate_inbox() {
        let store = LocalStore::from_remote(
            vec![],
            vec![list(json!({"id": "inbox", "title": "inbox", "owner": 5}))],
        );
        assert_eq!(store.lists().len(), 1);
        assert_eq!(store.lists()[0].get("owner"), Some(&json!(5)));
    }

    #[test]
    fn mutations_apply_to_owning_list() {
        let mut store = sample();
        let removed = store.list_mut("10").unwrap().remove_task("1").unwrap();
        assert_eq!(removed.id(), "1");
        assert!(store.task_with_id("1").is_none());

        store.push_list(list(json!({"id": "12", "title": "Home"})));
        assert_eq!(store.lists().last().unwrap().title(), "Home");
        assert!(store.remove_list("12").is_some());
        assert!(store.remove_list("12").is_none());
    }
}
