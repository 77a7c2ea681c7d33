//! Domain model for the task list.
//!
//! # Responsibility
//! - Define the task record shared by storage, service and dispatch layers.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Display order derives from the store-assigned `seq`, never from ids.

pub mod task;
