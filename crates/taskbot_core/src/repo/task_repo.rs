//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create / list / delete-by-id over the `tasks` table.
//! - Provide positional take (select n-th, delete by id) as one unit.
//!
//! # Invariants
//! - Read paths reject invalid persisted rows instead of masking them.
//! - `take_task_at` never deletes anything when the position is out of range.

use crate::db::DbError;
use crate::model::task::{NewTask, Task, TaskId};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    seq,
    id,
    description,
    date_added
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
    /// The store could not be opened; every call fails with the reason.
    Unavailable(String),
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::Unavailable(reason) => write!(f, "task store unavailable: {reason}"),
            Self::LockPoisoned => write!(f, "task store connection lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::Unavailable(_) | Self::LockPoisoned => {
                None
            }
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the task collection.
pub trait TaskRepository {
    /// Persists a draft and returns it with its assigned `seq`.
    fn create_task(&self, task: NewTask) -> RepoResult<Task>;
    /// Returns every task ordered by `seq` ascending.
    fn list_tasks(&self) -> RepoResult<Vec<Task>>;
    /// Hard-deletes one task by identity.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Removes and returns the task at zero-based `position` in list order.
    ///
    /// Returns `Ok(None)` without mutating when `position` is out of range.
    fn take_task_at(&self, position: usize) -> RepoResult<Option<Task>>;
}

impl<R: TaskRepository + ?Sized> TaskRepository for Box<R> {
    fn create_task(&self, task: NewTask) -> RepoResult<Task> {
        (**self).create_task(task)
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        (**self).list_tasks()
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        (**self).delete_task(id)
    }

    fn take_task_at(&self, position: usize) -> RepoResult<Option<Task>> {
        (**self).take_task_at(position)
    }
}

impl<R: TaskRepository + ?Sized> TaskRepository for Arc<R> {
    fn create_task(&self, task: NewTask) -> RepoResult<Task> {
        (**self).create_task(task)
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        (**self).list_tasks()
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        (**self).delete_task(id)
    }

    fn take_task_at(&self, position: usize) -> RepoResult<Option<Task>> {
        (**self).take_task_at(position)
    }
}

/// SQLite-backed task repository.
///
/// Owns its connection behind a mutex so one repository can be shared
/// across threads.
pub struct SqliteTaskRepository {
    conn: Mutex<Connection>,
}

impl SqliteTaskRepository {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn create_task(&self, task: NewTask) -> RepoResult<Task> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (id, description, date_added) VALUES (?1, ?2, ?3);",
            params![
                task.id.to_string(),
                task.description.as_str(),
                task.date_added
            ],
        )?;
        let seq = conn.last_insert_rowid();
        Ok(Task::from_draft(task, seq))
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} ORDER BY seq ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();

        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        Ok(tasks)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn take_task_at(&self, position: usize) -> RepoResult<Option<Task>> {
        let Ok(offset) = i64::try_from(position) else {
            return Ok(None);
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raw = {
            let mut stmt =
                tx.prepare(&format!("{TASK_SELECT_SQL} ORDER BY seq ASC LIMIT 1 OFFSET ?1;"))?;
            let raw = stmt.query_row([offset], read_raw_row).optional()?;
            raw
        };

        let Some(raw) = raw else {
            return Ok(None);
        };
        let task = raw.into_task()?;

        let changed = tx.execute("DELETE FROM tasks WHERE id = ?1;", [task.id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(task.id));
        }
        tx.commit()?;

        Ok(Some(task))
    }
}

/// Repository used when the store could not be opened at startup.
///
/// Every call fails with `RepoError::Unavailable`, so callers keep running
/// and report per-call failures.
#[derive(Debug, Clone)]
pub struct UnavailableTaskRepository {
    reason: String,
}

impl UnavailableTaskRepository {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> RepoError {
        RepoError::Unavailable(self.reason.clone())
    }
}

impl TaskRepository for UnavailableTaskRepository {
    fn create_task(&self, _task: NewTask) -> RepoResult<Task> {
        Err(self.error())
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        Err(self.error())
    }

    fn delete_task(&self, _id: TaskId) -> RepoResult<()> {
        Err(self.error())
    }

    fn take_task_at(&self, _position: usize) -> RepoResult<Option<Task>> {
        Err(self.error())
    }
}

struct RawTaskRow {
    seq: i64,
    id: String,
    description: String,
    date_added: i64,
}

impl RawTaskRow {
    fn into_task(self) -> RepoResult<Task> {
        let id = Uuid::parse_str(&self.id).map_err(|_| {
            RepoError::InvalidData(format!("invalid id value `{}` in tasks.id", self.id))
        })?;
        Ok(Task {
            id,
            seq: self.seq,
            description: self.description,
            date_added: self.date_added,
        })
    }
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawTaskRow> {
    Ok(RawTaskRow {
        seq: row.get("seq")?,
        id: row.get("id")?,
        description: row.get("description")?,
        date_added: row.get("date_added")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    read_raw_row(row)?.into_task()
}
