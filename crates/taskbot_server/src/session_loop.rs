//! Session event loop.
//!
//! # Responsibility
//! - Keep a bridge connection open, reconnecting after a fixed delay.
//! - Route session events to the bootstrap and chat messages to the
//!   dispatcher, one task per message.
//!
//! # Invariants
//! - Messages received before the session is ready are dropped.
//! - Store calls never run on the async worker threads.

use crate::bootstrap::SessionBootstrap;
use crate::bridge;
use crate::transport::{ChatMessage, Transport, TransportEvent};
use log::{debug, error, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use taskbot_core::{Dispatcher, TaskRepository};
use tokio::sync::mpsc;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Where and how to reach the messaging gateway.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub addr: String,
    pub auth_dir: PathBuf,
}

/// Runs the bridge session forever, reconnecting on failure.
pub async fn run_bridge_session<R>(
    settings: BridgeSettings,
    bootstrap: SessionBootstrap,
    dispatcher: Arc<Dispatcher<R>>,
) where
    R: TaskRepository + Send + Sync + 'static,
{
    loop {
        match bridge::connect(&settings.addr, &settings.auth_dir).await {
            Ok((handle, events)) => {
                drive_session(handle, events, &bootstrap, Arc::clone(&dispatcher)).await;
            }
            Err(err) => {
                warn!(
                    "event=bridge_connect module=session status=error addr={} error={}",
                    settings.addr, err
                );
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// Processes events from one transport connection until it ends.
pub async fn drive_session<T, R>(
    transport: T,
    mut events: mpsc::Receiver<TransportEvent>,
    bootstrap: &SessionBootstrap,
    dispatcher: Arc<Dispatcher<R>>,
) where
    T: Transport,
    R: TaskRepository + Send + Sync + 'static,
{
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Qr(payload) => bootstrap.on_qr(&transport, payload),
            TransportEvent::Ready => bootstrap.on_ready(),
            TransportEvent::Disconnected(reason) => {
                bootstrap.on_disconnected(&reason);
                return;
            }
            TransportEvent::Message(message) => {
                if !bootstrap.is_ready() {
                    debug!("event=message_drop module=session status=skipped reason=not_ready");
                    continue;
                }
                tokio::spawn(handle_message(
                    transport.clone(),
                    Arc::clone(&dispatcher),
                    message,
                ));
            }
        }
    }
    bootstrap.on_disconnected("event stream ended");
}

async fn handle_message<T, R>(transport: T, dispatcher: Arc<Dispatcher<R>>, message: ChatMessage)
where
    T: Transport,
    R: TaskRepository + Send + Sync + 'static,
{
    let ChatMessage {
        id,
        chat_id,
        inbound,
    } = message;

    let reply = match tokio::task::spawn_blocking(move || dispatcher.handle(&inbound)).await {
        Ok(reply) => reply,
        Err(err) => {
            error!("event=message_handle module=session status=error error_code=dispatch_panicked error={err}");
            return;
        }
    };

    let Some(reply) = reply else {
        return;
    };

    if let Err(err) = transport.send_reply(&chat_id, &id, &reply).await {
        error!("event=reply_send module=session status=error error={err}");
    }
}

#[cfg(test)]
mod tests {
    use super::drive_session;
    use crate::bootstrap::tests::FakeTransport;
    use crate::bootstrap::SessionBootstrap;
    use crate::config::PairingMode;
    use crate::transport::{ChatMessage, TransportEvent};
    use std::sync::Arc;
    use std::time::Duration;
    use taskbot_core::db::open_db_in_memory;
    use taskbot_core::{
        DispatchPolicy, Dispatcher, InboundMessage, SessionState, SqliteTaskRepository,
        TaskService,
    };
    use tokio::sync::mpsc;

    fn message(id: &str, inbound: InboundMessage) -> TransportEvent {
        TransportEvent::Message(ChatMessage {
            id: id.to_string(),
            chat_id: "owner@c.us".to_string(),
            inbound,
        })
    }

    async fn wait_for_replies(transport: &FakeTransport, expected: usize) {
        for _ in 0..200 {
            if transport.replies().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {expected} replies");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn commands_are_answered_only_after_ready() {
        let repo = SqliteTaskRepository::new(open_db_in_memory().expect("open in-memory db"));
        let dispatcher = Arc::new(Dispatcher::new(
            TaskService::new(repo),
            DispatchPolicy::default(),
        ));
        let (bootstrap, receiver) = SessionBootstrap::new(PairingMode::Qr);
        let transport = FakeTransport::default();
        let (events_tx, events_rx) = mpsc::channel(16);

        let session = {
            let transport = transport.clone();
            let bootstrap = bootstrap.clone();
            tokio::spawn(async move {
                drive_session(transport, events_rx, &bootstrap, dispatcher).await;
            })
        };

        events_tx
            .send(message("m0", InboundMessage::from_self("!add too early")))
            .await
            .expect("session loop listening");
        events_tx.send(TransportEvent::Ready).await.expect("session loop listening");
        events_tx
            .send(message("m1", InboundMessage::from_self("!add buy milk")))
            .await
            .expect("session loop listening");
        wait_for_replies(&transport, 1).await;

        events_tx
            .send(message("m2", InboundMessage::bot_echo("💾 Saved: \"buy milk\"")))
            .await
            .expect("session loop listening");
        events_tx
            .send(message("m3", InboundMessage::from_self("!list")))
            .await
            .expect("session loop listening");
        wait_for_replies(&transport, 2).await;

        events_tx
            .send(TransportEvent::Disconnected("bye".to_string()))
            .await
            .expect("session loop listening");
        session.await.expect("session task");

        let replies = transport.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(
            replies[0],
            (
                "owner@c.us".to_string(),
                "m1".to_string(),
                "💾 Saved: \"buy milk\"".to_string()
            )
        );
        assert_eq!(replies[1].1, "m3");
        assert_eq!(replies[1].2, "📝 *To-Do List:*\n1. buy milk");
        assert_eq!(*receiver.borrow(), SessionState::Starting);
    }
}
