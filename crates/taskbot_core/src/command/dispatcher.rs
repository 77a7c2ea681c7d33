//! Inbound message dispatcher.
//!
//! # Responsibility
//! - Filter out messages that must never trigger commands.
//! - Route recognized commands to `TaskService` and build the reply.
//!
//! # Invariants
//! - A message flagged `is_bot_reply` is never handled, whatever its text.
//! - Store failures are logged and always answered with a failure reply.
//! - An out-of-range `!done` never mutates the task list.

use crate::command::parse::{parse_command, Command};
use crate::command::reply::{
    done_reply, list_reply, saved_reply, ADD_FAILED_REPLY, DONE_FAILED_REPLY,
    INVALID_NUMBER_REPLY, LIST_FAILED_REPLY,
};
use crate::repo::task_repo::TaskRepository;
use crate::service::task_service::TaskService;
use log::{debug, error};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One chat message as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    /// Sent from the account the bot runs as.
    pub from_me: bool,
    /// Out-of-band marker: this message is a reply the bot itself sent.
    pub is_bot_reply: bool,
}

impl InboundMessage {
    /// Message typed by a chat participant other than the bot account.
    pub fn from_peer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_me: false,
            is_bot_reply: false,
        }
    }

    /// Message typed by the owner into their own chat.
    pub fn from_self(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_me: true,
            is_bot_reply: false,
        }
    }

    /// Echo of a reply the bot sent.
    pub fn bot_echo(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_me: true,
            is_bot_reply: true,
        }
    }
}

/// What `!done <n>` does when `n` is not a valid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoneOutOfRange {
    /// Answer with the invalid-number message.
    #[default]
    Reply,
    /// Send nothing.
    Ignore,
}

/// Error for unknown `DoneOutOfRange` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicyError(pub String);

impl Display for UnknownPolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown out-of-range policy `{}`; expected reply|ignore", self.0)
    }
}

impl Error for UnknownPolicyError {}

impl FromStr for DoneOutOfRange {
    type Err = UnknownPolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reply" => Ok(Self::Reply),
            "ignore" => Ok(Self::Ignore),
            other => Err(UnknownPolicyError(other.to_string())),
        }
    }
}

/// Dispatcher behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub done_out_of_range: DoneOutOfRange,
    /// Handle commands the owner types into their own chat.
    pub accept_self_messages: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            done_out_of_range: DoneOutOfRange::Reply,
            accept_self_messages: true,
        }
    }
}

/// Routes chat messages to task operations.
pub struct Dispatcher<R: TaskRepository> {
    service: TaskService<R>,
    policy: DispatchPolicy,
}

impl<R: TaskRepository> Dispatcher<R> {
    pub fn new(service: TaskService<R>, policy: DispatchPolicy) -> Self {
        Self { service, policy }
    }

    /// Handles one inbound message and returns the reply to send, if any.
    pub fn handle(&self, message: &InboundMessage) -> Option<String> {
        if message.is_bot_reply {
            debug!("event=dispatch module=command status=skipped reason=bot_reply");
            return None;
        }
        if message.from_me && !self.policy.accept_self_messages {
            debug!("event=dispatch module=command status=skipped reason=self_message");
            return None;
        }

        match parse_command(&message.text)? {
            Command::Add(description) => Some(self.handle_add(description)),
            Command::List => Some(self.handle_list()),
            Command::Done(position) => self.handle_done(position),
        }
    }

    fn handle_add(&self, description: String) -> String {
        match self.service.add_task(description) {
            Ok(task) => saved_reply(&task.description),
            Err(err) => {
                error!("event=command_add module=command status=error error={err}");
                ADD_FAILED_REPLY.to_string()
            }
        }
    }

    fn handle_list(&self) -> String {
        match self.service.list_tasks() {
            Ok(tasks) => list_reply(&tasks),
            Err(err) => {
                error!("event=command_list module=command status=error error={err}");
                LIST_FAILED_REPLY.to_string()
            }
        }
    }

    fn handle_done(&self, position: Option<usize>) -> Option<String> {
        let completed = match position {
            Some(position) => match self.service.complete_task(position) {
                Ok(completed) => completed,
                Err(err) => {
                    error!("event=command_done module=command status=error error={err}");
                    return Some(DONE_FAILED_REPLY.to_string());
                }
            },
            None => None,
        };

        match completed {
            Some(task) => Some(done_reply(&task.description)),
            None => match self.policy.done_out_of_range {
                DoneOutOfRange::Reply => Some(INVALID_NUMBER_REPLY.to_string()),
                DoneOutOfRange::Ignore => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DoneOutOfRange;

    #[test]
    fn out_of_range_policy_parses_case_insensitively() {
        assert_eq!(" Reply ".parse::<DoneOutOfRange>(), Ok(DoneOutOfRange::Reply));
        assert_eq!("IGNORE".parse::<DoneOutOfRange>(), Ok(DoneOutOfRange::Ignore));
        assert!("silent".parse::<DoneOutOfRange>().is_err());
    }
}
