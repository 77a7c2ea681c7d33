//! taskbot entry point.

use std::process::ExitCode;
use taskbot_server::{run, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("taskbot: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=server_stop module=main status=error error={err}");
            eprintln!("taskbot: {err}");
            ExitCode::FAILURE
        }
    }
}
