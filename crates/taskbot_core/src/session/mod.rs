//! Messaging session state model.
//!
//! # Responsibility
//! - Describe the three mutually exclusive session states the status page
//!   projects: starting, pairing, ready.
//!
//! # Invariants
//! - Only the session bootstrap moves a session between states.

/// Artifact a user needs to link a new messaging session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingArtifact {
    /// Raw QR payload; rendered as an image by the status page.
    Qr(String),
    /// Numeric pairing code tied to the configured phone number.
    Code(String),
}

/// Current state of the messaging session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Starting,
    Pairing(PairingArtifact),
    Ready,
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn pairing_artifact(&self) -> Option<&PairingArtifact> {
        match self {
            Self::Pairing(artifact) => Some(artifact),
            Self::Starting | Self::Ready => None,
        }
    }

    /// Stable lowercase name used in log events.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Pairing(PairingArtifact::Qr(_)) => "pairing_qr",
            Self::Pairing(PairingArtifact::Code(_)) => "pairing_code",
            Self::Ready => "ready",
        }
    }
}
