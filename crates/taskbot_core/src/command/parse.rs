//! Command classification over trimmed message text.

const ADD_PREFIX: &str = "!add ";
const LIST_COMMAND: &str = "!list";
const DONE_PREFIX: &str = "!done ";

/// One recognized chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `!add <description>`.
    Add(String),
    /// `!list`.
    List,
    /// `!done <n>`: the first whitespace-separated token after the prefix,
    /// parsed whole as a `usize`; `None` when it does not parse (`2abc`, `-1`).
    Done(Option<usize>),
}

/// Classifies raw message text.
///
/// The text is trimmed first; anything that does not match one of the
/// three command shapes yields `None`.
pub fn parse_command(raw: &str) -> Option<Command> {
    let text = raw.trim();

    if let Some(description) = text.strip_prefix(ADD_PREFIX) {
        return Some(Command::Add(description.to_string()));
    }

    if text == LIST_COMMAND {
        return Some(Command::List);
    }

    if let Some(rest) = text.strip_prefix(DONE_PREFIX) {
        let position = rest
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<usize>().ok());
        return Some(Command::Done(position));
    }

    None
}
