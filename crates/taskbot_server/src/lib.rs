//! taskbot server: chat transport bridge, session bootstrap and status page
//! around `taskbot_core`.

pub mod app;
pub mod bootstrap;
pub mod bridge;
pub mod config;
pub mod error;
pub mod session_loop;
pub mod status_page;
pub mod transport;

pub use app::run;
pub use config::{ConfigError, PairingMode, ServerConfig};
pub use error::ServerError;
