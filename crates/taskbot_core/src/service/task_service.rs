//! Task use-case service.
//!
//! # Responsibility
//! - Provide add / list / complete entry points for the dispatcher.
//! - Translate 1-based list positions into repository positions.
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - `complete_task` never mutates when the position is out of range.

use crate::model::task::{NewTask, Task};
use crate::repo::task_repo::{RepoResult, TaskRepository};
use log::{debug, info};

/// Use-case service wrapper for the task list.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores a new task with the given description.
    pub fn add_task(&self, description: impl Into<String>) -> RepoResult<Task> {
        let task = self.repo.create_task(NewTask::new(description))?;
        info!(
            "event=task_add module=service status=ok seq={} description_len={}",
            task.seq,
            task.description.chars().count()
        );
        Ok(task)
    }

    /// Lists every task in display order.
    pub fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let tasks = self.repo.list_tasks()?;
        debug!("event=task_list module=service status=ok count={}", tasks.len());
        Ok(tasks)
    }

    /// Completes (removes) the task shown at 1-based `position`.
    ///
    /// Returns `Ok(None)` when `position` is zero or past the end.
    pub fn complete_task(&self, position: usize) -> RepoResult<Option<Task>> {
        let Some(index) = position.checked_sub(1) else {
            return Ok(None);
        };
        let completed = self.repo.take_task_at(index)?;
        match &completed {
            Some(task) => info!(
                "event=task_done module=service status=ok position={} seq={}",
                position, task.seq
            ),
            None => debug!(
                "event=task_done module=service status=out_of_range position={}",
                position
            ),
        }
        Ok(completed)
    }
}
