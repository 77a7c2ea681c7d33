//! Reply texts sent back through the chat transport.

use crate::model::task::Task;

pub const EMPTY_LIST_REPLY: &str = "📂 Empty.";
pub const INVALID_NUMBER_REPLY: &str = "❌ Invalid number. Use !list to see task numbers.";
pub const ADD_FAILED_REPLY: &str = "⚠️ Could not save the task.";
pub const LIST_FAILED_REPLY: &str = "⚠️ Could not load the task list.";
pub const DONE_FAILED_REPLY: &str = "⚠️ Could not complete the task.";

const LIST_HEADER: &str = "📝 *To-Do List:*";

pub fn saved_reply(description: &str) -> String {
    format!("💾 Saved: \"{description}\"")
}

pub fn done_reply(description: &str) -> String {
    format!("✅ Done: \"{description}\"")
}

/// Renders a 1-based numbered list, one task per line.
///
/// Returns the empty-state message when `tasks` is empty.
pub fn list_reply(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return EMPTY_LIST_REPLY.to_string();
    }

    let lines = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| format!("{}. {}", index + 1, task.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{LIST_HEADER}\n{lines}")
}
