//! Startup errors for the server binary.

use crate::config::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fatal error raised before the server is up.
#[derive(Debug)]
pub enum ServerError {
    Config(ConfigError),
    Logging(String),
    Bind { port: u16, source: std::io::Error },
    Http(std::io::Error),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(message) => write!(f, "failed to initialize logging: {message}"),
            Self::Bind { port, source } => write!(f, "failed to bind port {port}: {source}"),
            Self::Http(err) => write!(f, "http server failed: {err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(_) => None,
            Self::Bind { source, .. } => Some(source),
            Self::Http(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
