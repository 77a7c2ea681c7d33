//! Process wiring: logging, store, status page and session loop.

use crate::bootstrap::SessionBootstrap;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::session_loop::{run_bridge_session, BridgeSettings};
use crate::status_page;
use log::{error, info};
use std::sync::Arc;
use taskbot_core::db::open_db_url;
use taskbot_core::{
    core_version, init_logging, Dispatcher, SqliteTaskRepository, TaskRepository, TaskService,
    UnavailableTaskRepository,
};
use tokio::net::TcpListener;

/// Repository type shared by every message task.
pub type SharedRepository = Box<dyn TaskRepository + Send + Sync>;

/// Opens the task store; on failure returns a repository that reports the
/// failure on every call so the rest of the process keeps running.
pub fn open_repository(database_url: &str) -> SharedRepository {
    match open_db_url(database_url) {
        Ok(conn) => {
            info!("event=store_ready module=app status=ok");
            Box::new(SqliteTaskRepository::new(conn))
        }
        Err(err) => {
            error!("event=store_ready module=app status=error error={err}");
            Box::new(UnavailableTaskRepository::new(err.to_string()))
        }
    }
}

/// Runs the server until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let log_dir = config.log_dir.display().to_string();
    init_logging(&config.log_level, &log_dir).map_err(ServerError::Logging)?;
    info!(
        "event=server_start module=app status=start version={} port={} bridge_addr={} pairing={}",
        core_version(),
        config.port,
        config.bridge_addr,
        config.pairing.label()
    );

    let dispatcher = Arc::new(Dispatcher::new(
        TaskService::new(open_repository(&config.database_url)),
        config.dispatch,
    ));
    let (bootstrap, status_rx) = SessionBootstrap::new(config.pairing.clone());

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .map_err(|source| ServerError::Bind {
            port: config.port,
            source,
        })?;
    info!("event=http_listen module=app status=ok port={}", config.port);

    let http = async move {
        axum::serve(listener, status_page::router(status_rx))
            .with_graceful_shutdown(shutdown_signal())
            .await
    };
    let session = run_bridge_session(
        BridgeSettings {
            addr: config.bridge_addr.clone(),
            auth_dir: config.auth_dir.clone(),
        },
        bootstrap,
        dispatcher,
    );

    tokio::select! {
        result = http => result.map_err(ServerError::Http)?,
        () = session => {}
    }

    info!("event=server_stop module=app status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("event=shutdown_signal module=app status=error error={err}");
        std::future::pending::<()>().await;
    }
    info!("event=shutdown_signal module=app status=ok");
}

#[cfg(test)]
mod tests {
    use super::open_repository;
    use taskbot_core::{NewTask, RepoError, TaskRepository};

    #[test]
    fn open_repository_uses_sqlite_when_available() {
        let repo = open_repository(":memory:");
        repo.create_task(NewTask::new("x")).expect("create task");
        assert_eq!(repo.list_tasks().expect("list tasks").len(), 1);
    }

    #[test]
    fn open_repository_degrades_when_store_fails() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let missing = dir.path().join("no_such_dir").join("tasks.db");

        let repo = open_repository(&missing.display().to_string());
        assert!(matches!(
            repo.list_tasks().expect_err("store unavailable"),
            RepoError::Unavailable(_)
        ));
    }
}
