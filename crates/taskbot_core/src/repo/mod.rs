//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for the task collection.
//! - Isolate SQLite query details from service and dispatch code.
//!
//! # Invariants
//! - Listing order is `seq ASC` for every implementation.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod task_repo;
