//! Core domain logic for taskbot.
//! This crate owns the task list invariants and the chat command surface;
//! it knows nothing about the messaging transport or HTTP.

pub mod command;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use command::dispatcher::{
    DispatchPolicy, Dispatcher, DoneOutOfRange, InboundMessage, UnknownPolicyError,
};
pub use command::parse::{parse_command, Command};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{NewTask, Task, TaskId};
pub use repo::task_repo::{
    RepoError, RepoResult, SqliteTaskRepository, TaskRepository, UnavailableTaskRepository,
};
pub use service::task_service::TaskService;
pub use session::{PairingArtifact, SessionState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
