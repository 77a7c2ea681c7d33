//! Chat command surface.
//!
//! # Responsibility
//! - Classify inbound chat text into `!add`, `!list` and `!done` commands.
//! - Run the matching task operation and produce exactly one reply.
//!
//! # Invariants
//! - Classification is case-sensitive and first-match-wins.
//! - Each handled command performs at most one mutation.

pub mod dispatcher;
pub mod parse;
pub mod reply;
