//! Task domain model.
//!
//! # Responsibility
//! - Define the persisted task record and its pre-insert draft.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `seq` is assigned by the store on insert and grows monotonically.
//! - `description` is stored verbatim; no length or content validation.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier used to address one task for deletion.
pub type TaskId = Uuid;

/// Task that has not been persisted yet.
///
/// The store assigns `seq` when the draft is inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub id: TaskId,
    pub description: String,
    /// Unix epoch milliseconds.
    pub date_added: i64,
}

impl NewTask {
    /// Creates a draft with a generated id and the current time.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            date_added: now_epoch_ms(),
        }
    }
}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Store-assigned insertion sequence; list order sorts by this.
    pub seq: i64,
    pub description: String,
    /// Unix epoch milliseconds. Kept for the record, never read by commands.
    pub date_added: i64,
}

impl Task {
    /// Attaches a store-assigned sequence number to a draft.
    pub fn from_draft(draft: NewTask, seq: i64) -> Self {
        Self {
            id: draft.id,
            seq,
            description: draft.description,
            date_added: draft.date_added,
        }
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
