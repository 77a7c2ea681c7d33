//! Environment configuration.
//!
//! # Responsibility
//! - Read every runtime setting from environment variables once at startup.
//! - Reject invalid values with an error naming the variable.
//!
//! # Invariants
//! - Empty variables are treated as unset.
//! - `log_dir` is always absolute.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use taskbot_core::{default_log_level, DispatchPolicy, DoneOutOfRange};

static PHONE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{8,15}$").expect("valid phone number regex"));

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const PORT_VAR: &str = "PORT";
pub const BRIDGE_ADDR_VAR: &str = "BRIDGE_ADDR";
pub const AUTH_DIR_VAR: &str = "AUTH_DIR";
pub const PAIRING_PHONE_NUMBER_VAR: &str = "PAIRING_PHONE_NUMBER";
pub const DONE_OUT_OF_RANGE_VAR: &str = "DONE_OUT_OF_RANGE";
pub const ACCEPT_SELF_MESSAGES_VAR: &str = "ACCEPT_SELF_MESSAGES";
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "LOG_DIR";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BRIDGE_ADDR: &str = "127.0.0.1:3100";
const DEFAULT_AUTH_DIR: &str = ".taskbot_auth";
const DEFAULT_LOG_DIR_NAME: &str = "logs";

/// How a new messaging session is linked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingMode {
    /// Show the transport's QR payload.
    Qr,
    /// Request a numeric pairing code for this phone number (digits only).
    Code { phone_number: String },
}

impl PairingMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Qr => "qr",
            Self::Code { .. } => "code",
        }
    }
}

/// Configuration error naming the offending variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required environment variable {key}"),
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub bridge_addr: String,
    pub auth_dir: PathBuf,
    pub pairing: PairingMode,
    pub dispatch: DispatchPolicy,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|err| ConfigError::Invalid {
            key: LOG_DIR_VAR,
            value: String::new(),
            reason: format!("cannot resolve working directory: {err}"),
        })?;
        Self::from_lookup(|key| std::env::var(key).ok(), &cwd)
    }

    /// Reads configuration through `lookup`; relative paths resolve against
    /// `cwd`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        cwd: &Path,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let database_url = get(DATABASE_URL_VAR).ok_or(ConfigError::Missing(DATABASE_URL_VAR))?;

        let port = match get(PORT_VAR) {
            Some(value) => value.parse::<u16>().map_err(|err| ConfigError::Invalid {
                key: PORT_VAR,
                value: value.clone(),
                reason: err.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let bridge_addr = get(BRIDGE_ADDR_VAR).unwrap_or_else(|| DEFAULT_BRIDGE_ADDR.to_string());
        let auth_dir = get(AUTH_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AUTH_DIR));

        let pairing = match get(PAIRING_PHONE_NUMBER_VAR) {
            Some(phone_number) => {
                if !PHONE_NUMBER_RE.is_match(&phone_number) {
                    return Err(ConfigError::Invalid {
                        key: PAIRING_PHONE_NUMBER_VAR,
                        value: phone_number,
                        reason: "expected country code and number as 8-15 digits, no symbols"
                            .to_string(),
                    });
                }
                PairingMode::Code { phone_number }
            }
            None => PairingMode::Qr,
        };

        let done_out_of_range = match get(DONE_OUT_OF_RANGE_VAR) {
            Some(value) => value
                .parse::<DoneOutOfRange>()
                .map_err(|err| ConfigError::Invalid {
                    key: DONE_OUT_OF_RANGE_VAR,
                    value: value.clone(),
                    reason: err.to_string(),
                })?,
            None => DoneOutOfRange::default(),
        };

        let accept_self_messages = match get(ACCEPT_SELF_MESSAGES_VAR) {
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::Invalid {
                key: ACCEPT_SELF_MESSAGES_VAR,
                value: value.clone(),
                reason: "expected true|false|1|0|yes|no".to_string(),
            })?,
            None => true,
        };

        let log_level = get(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string());
        let log_dir = match get(LOG_DIR_VAR) {
            Some(value) => cwd.join(value),
            None => cwd.join(DEFAULT_LOG_DIR_NAME),
        };

        Ok(Self {
            database_url,
            port,
            bridge_addr,
            auth_dir,
            pairing,
            dispatch: DispatchPolicy {
                done_out_of_range,
                accept_self_messages,
            },
            log_level,
            log_dir,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
