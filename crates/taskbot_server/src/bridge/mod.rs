//! Newline-delimited JSON bridge to the messaging gateway.
//!
//! # Responsibility
//! - Speak the gateway line protocol over one TCP connection.
//! - Correlate pairing code requests with their answers.
//! - Mark echoes of our own replies out of band (tags and sent ids).
//!
//! # Invariants
//! - Every outbound reply carries a fresh tag.
//! - Malformed inbound lines are skipped, never fatal.

mod client;
pub mod protocol;

pub use client::{connect, BridgeHandle, PAIRING_CODE_TIMEOUT};

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure talking to the gateway.
#[derive(Debug)]
pub enum BridgeError {
    Io(std::io::Error),
    Encode(serde_json::Error),
    /// The connection is gone; nothing more can be sent.
    Closed,
    Timeout,
    /// The gateway answered with an error.
    Rejected(String),
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "bridge io error: {err}"),
            Self::Encode(err) => write!(f, "bridge encode error: {err}"),
            Self::Closed => write!(f, "bridge connection closed"),
            Self::Timeout => write!(f, "bridge request timed out"),
            Self::Rejected(reason) => write!(f, "gateway rejected request: {reason}"),
        }
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Closed | Self::Timeout | Self::Rejected(_) => None,
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}
