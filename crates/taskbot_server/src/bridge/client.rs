//! TCP client side of the gateway bridge.

use super::protocol::{BridgeCommand, BridgeEvent};
use super::BridgeError;
use crate::transport::{ChatMessage, Transport, TransportEvent};
use log::{debug, info, warn};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use taskbot_core::InboundMessage;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

pub const PAIRING_CODE_TIMEOUT: Duration = Duration::from_secs(30);

const COMMAND_CHANNEL_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 256;
/// Reply tags and sent message ids remembered for echo detection.
const SENT_ID_CAPACITY: usize = 256;

type PendingCode = oneshot::Sender<Result<String, String>>;

struct Shared {
    pending_codes: Mutex<HashMap<u64, PendingCode>>,
    /// Least recently recorded ids are evicted first.
    sent: Mutex<LruCache<String, ()>>,
    next_request_id: AtomicU64,
}

impl Default for Shared {
    fn default() -> Self {
        Self::with_sent_capacity(NonZeroUsize::new(SENT_ID_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl Shared {
    fn with_sent_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            pending_codes: Mutex::new(HashMap::new()),
            sent: Mutex::new(LruCache::new(capacity)),
            next_request_id: AtomicU64::new(0),
        }
    }

    fn pending_codes(&self) -> MutexGuard<'_, HashMap<u64, PendingCode>> {
        self.pending_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sent(&self) -> MutexGuard<'_, LruCache<String, ()>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_sent(&self, id: String) {
        self.sent().put(id, ());
    }
}

/// Cloneable handle for sending commands over one bridge connection.
#[derive(Clone)]
pub struct BridgeHandle {
    commands: mpsc::Sender<BridgeCommand>,
    shared: Arc<Shared>,
    pairing_code_timeout: Duration,
}

/// Connects to the gateway and opens the session from `auth_dir`.
///
/// Returns the command handle and the stream of session events. The event
/// stream ends with `TransportEvent::Disconnected` when the socket closes.
pub async fn connect(
    addr: &str,
    auth_dir: &Path,
) -> Result<(BridgeHandle, mpsc::Receiver<TransportEvent>), BridgeError> {
    let stream = TcpStream::connect(addr).await?;
    let (read_half, write_half) = stream.into_split();
    info!("event=bridge_connect module=bridge status=ok addr={addr}");

    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let shared = Arc::new(Shared::default());

    tokio::spawn(write_loop(write_half, command_rx));
    tokio::spawn(read_loop(read_half, Arc::clone(&shared), event_tx));

    let handle = BridgeHandle {
        commands: command_tx,
        shared,
        pairing_code_timeout: PAIRING_CODE_TIMEOUT,
    };
    handle
        .send_command(BridgeCommand::Init {
            auth_dir: auth_dir.display().to_string(),
        })
        .await?;

    Ok((handle, event_rx))
}

impl BridgeHandle {
    /// Overrides how long a pairing code request may stay unanswered.
    pub fn with_pairing_code_timeout(mut self, timeout: Duration) -> Self {
        self.pairing_code_timeout = timeout;
        self
    }

    async fn send_command(&self, command: BridgeCommand) -> Result<(), BridgeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| BridgeError::Closed)
    }
}

impl Transport for BridgeHandle {
    async fn request_pairing_code(&self, phone_number: &str) -> Result<String, BridgeError> {
        let request_id = self.shared.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (answer_tx, answer_rx) = oneshot::channel();
        self.shared.pending_codes().insert(request_id, answer_tx);

        if let Err(err) = self
            .send_command(BridgeCommand::RequestPairingCode {
                request_id,
                phone_number: phone_number.to_string(),
            })
            .await
        {
            self.shared.pending_codes().remove(&request_id);
            return Err(err);
        }

        match tokio::time::timeout(self.pairing_code_timeout, answer_rx).await {
            Ok(Ok(Ok(code))) => Ok(code),
            Ok(Ok(Err(reason))) => Err(BridgeError::Rejected(reason)),
            Ok(Err(_)) => Err(BridgeError::Closed),
            Err(_) => {
                self.shared.pending_codes().remove(&request_id);
                Err(BridgeError::Timeout)
            }
        }
    }

    async fn send_reply(
        &self,
        chat_id: &str,
        quoted_message_id: &str,
        body: &str,
    ) -> Result<(), BridgeError> {
        let tag = Uuid::new_v4().to_string();
        self.shared.record_sent(tag.clone());
        self.send_command(BridgeCommand::Send {
            chat_id: chat_id.to_string(),
            quoted_message_id: Some(quoted_message_id.to_string()).filter(|id| !id.is_empty()),
            body: body.to_string(),
            tag,
        })
        .await
    }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut commands: mpsc::Receiver<BridgeCommand>) {
    while let Some(command) = commands.recv().await {
        let mut line = match serde_json::to_string(&command) {
            Ok(line) => line,
            Err(err) => {
                warn!("event=bridge_write module=bridge status=error error_code=encode_failed error={err}");
                continue;
            }
        };
        line.push('\n');

        if let Err(err) = writer.write_all(line.as_bytes()).await {
            warn!("event=bridge_write module=bridge status=error error_code=io_failed error={err}");
            break;
        }
    }
    debug!("event=bridge_write module=bridge status=stopped");
}

async fn read_loop(
    reader: OwnedReadHalf,
    shared: Arc<Shared>,
    events: mpsc::Sender<TransportEvent>,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let reason = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break "bridge closed by gateway".to_string(),
            Ok(_) => {
                let line = match std::str::from_utf8(&buf) {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("event=bridge_read module=bridge status=skipped error_code=invalid_utf8 error={err}");
                        continue;
                    }
                };
                let Some(event) = decode_line(&shared, line) else {
                    continue;
                };
                let closing = matches!(event, TransportEvent::Disconnected(_));
                if events.send(event).await.is_err() || closing {
                    fail_pending(&shared);
                    return;
                }
            }
            Err(err) => break format!("bridge read failed: {err}"),
        }
    };

    warn!("event=bridge_read module=bridge status=closed reason={reason}");
    fail_pending(&shared);
    let _ = events.send(TransportEvent::Disconnected(reason)).await;
}

fn fail_pending(shared: &Shared) {
    // Dropping the senders resolves waiting requests with `Closed`.
    shared.pending_codes().clear();
}

/// Decodes one gateway line; bridge-internal events are consumed here.
fn decode_line(shared: &Shared, line: &str) -> Option<TransportEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let event = match serde_json::from_str::<BridgeEvent>(trimmed) {
        Ok(event) => event,
        Err(err) => {
            warn!("event=bridge_read module=bridge status=skipped error_code=decode_failed error={err}");
            return None;
        }
    };

    match event {
        BridgeEvent::Qr { payload } => Some(TransportEvent::Qr(payload)),
        BridgeEvent::Ready => Some(TransportEvent::Ready),
        BridgeEvent::Disconnected { reason } => Some(TransportEvent::Disconnected(reason)),
        BridgeEvent::PairingCode { request_id, code } => {
            resolve_pending(shared, request_id, Ok(code));
            None
        }
        BridgeEvent::PairingCodeFailed { request_id, error } => {
            resolve_pending(shared, request_id, Err(error));
            None
        }
        BridgeEvent::Sent { tag, message_id } => {
            let mut sent = shared.sent();
            sent.put(tag, ());
            if let Some(message_id) = message_id {
                sent.put(message_id, ());
            }
            None
        }
        BridgeEvent::Message {
            id,
            chat_id,
            body,
            from_me,
            tag,
        } => {
            let is_bot_reply = from_me && {
                let sent = shared.sent();
                tag.as_deref().is_some_and(|tag| sent.contains(tag)) || sent.contains(&id)
            };
            Some(TransportEvent::Message(ChatMessage {
                id,
                chat_id,
                inbound: InboundMessage {
                    text: body,
                    from_me,
                    is_bot_reply,
                },
            }))
        }
    }
}

fn resolve_pending(shared: &Shared, request_id: u64, answer: Result<String, String>) {
    match shared.pending_codes().remove(&request_id) {
        Some(waiter) => {
            let _ = waiter.send(answer);
        }
        None => debug!(
            "event=bridge_read module=bridge status=skipped reason=unknown_request request_id={request_id}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{connect, decode_line, Shared};
    use crate::bridge::BridgeError;
    use crate::transport::{Transport, TransportEvent};
    use std::num::NonZeroUsize;
    use std::path::Path;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn tagged_self_message_is_marked_as_bot_reply() {
        let shared = Shared::default();
        shared.record_sent("tag-1".to_string());

        let event = decode_line(
            &shared,
            r#"{"event":"message","id":"m9","chat_id":"c","body":"💾 Saved: \"x\"","from_me":true,"tag":"tag-1"}"#,
        );
        let Some(TransportEvent::Message(message)) = event else {
            panic!("expected message event");
        };
        assert!(message.inbound.is_bot_reply);
    }

    #[test]
    fn sent_ack_marks_message_id_as_bot_reply() {
        let shared = Shared::default();
        assert!(decode_line(&shared, r#"{"event":"sent","tag":"t","message_id":"m1"}"#).is_none());

        let Some(TransportEvent::Message(echo)) = decode_line(
            &shared,
            r#"{"event":"message","id":"m1","chat_id":"c","body":"✅ Done: \"x\"","from_me":true}"#,
        ) else {
            panic!("expected message event");
        };
        assert!(echo.inbound.is_bot_reply);
    }

    #[test]
    fn untagged_self_message_is_a_command() {
        let shared = Shared::default();
        let Some(TransportEvent::Message(message)) = decode_line(
            &shared,
            r#"{"event":"message","id":"m2","chat_id":"c","body":"✅ not ours","from_me":true}"#,
        ) else {
            panic!("expected message event");
        };
        assert!(message.inbound.from_me);
        assert!(!message.inbound.is_bot_reply);
    }

    #[test]
    fn sent_ids_evict_least_recently_recorded() {
        let shared = Shared::with_sent_capacity(NonZeroUsize::new(2).expect("non-zero capacity"));
        shared.record_sent("a".to_string());
        shared.record_sent("b".to_string());
        shared.record_sent("a".to_string());
        shared.record_sent("c".to_string());

        let sent = shared.sent();
        assert!(sent.contains("a"));
        assert!(!sent.contains("b"));
        assert!(sent.contains("c"));
        assert_eq!(sent.len(), 2);
    }

    #[test]
    fn evicted_tag_is_no_longer_a_bot_reply() {
        let shared = Shared::with_sent_capacity(NonZeroUsize::new(1).expect("non-zero capacity"));
        shared.record_sent("old".to_string());
        shared.record_sent("new".to_string());

        let Some(TransportEvent::Message(message)) = decode_line(
            &shared,
            r#"{"event":"message","id":"m3","chat_id":"c","body":"x","from_me":true,"tag":"old"}"#,
        ) else {
            panic!("expected message event");
        };
        assert!(!message.inbound.is_bot_reply);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let shared = Shared::default();
        assert!(decode_line(&shared, "not json").is_none());
        assert!(decode_line(&shared, "   ").is_none());
    }

    #[tokio::test]
    async fn pairing_code_round_trip_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener addr").to_string();

        let gateway = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept bridge client");
            let (read_half, mut write_half) = socket.into_split();
            let mut lines = BufReader::new(read_half).lines();

            let init = lines
                .next_line()
                .await
                .expect("read init")
                .expect("init line");
            assert!(init.contains(r#""op":"init""#));
            write_half
                .write_all(b"{\"event\":\"ready\"}\n")
                .await
                .expect("write ready");

            let request = lines
                .next_line()
                .await
                .expect("read request")
                .expect("request line");
            let request: serde_json::Value =
                serde_json::from_str(&request).expect("request is json");
            assert_eq!(request["op"], "request_pairing_code");
            assert_eq!(request["phone_number"], "5511987654321");
            let answer = format!(
                "{{\"event\":\"pairing_code\",\"request_id\":{},\"code\":\"ABCD-1234\"}}\n",
                request["request_id"]
            );
            write_half
                .write_all(answer.as_bytes())
                .await
                .expect("write pairing code");

            let send = lines
                .next_line()
                .await
                .expect("read send")
                .expect("send line");
            let send: serde_json::Value = serde_json::from_str(&send).expect("send is json");
            assert_eq!(send["op"], "send");
            assert_eq!(send["body"], "📂 Empty.");
            assert!(send["tag"].as_str().is_some_and(|tag| !tag.is_empty()));
        });

        let (handle, mut events) = connect(&addr, Path::new("/tmp/auth"))
            .await
            .expect("connect to gateway");
        assert_eq!(events.recv().await, Some(TransportEvent::Ready));

        let code = handle
            .request_pairing_code("5511987654321")
            .await
            .expect("pairing code answered");
        assert_eq!(code, "ABCD-1234");

        handle
            .send_reply("chat", "m1", "📂 Empty.")
            .await
            .expect("reply queued");
        gateway.await.expect("gateway task");

        assert!(matches!(
            events.recv().await,
            Some(TransportEvent::Disconnected(_))
        ));
    }

    #[tokio::test]
    async fn non_utf8_line_is_skipped_without_disconnecting() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener addr").to_string();

        let gateway = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept bridge client");
            socket
                .write_all(b"\xff\xfe garbage\n{\"event\":\"ready\"}\n")
                .await
                .expect("write lines");
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        let (_handle, mut events) = connect(&addr, Path::new("/tmp/auth"))
            .await
            .expect("connect to gateway");
        assert_eq!(events.recv().await, Some(TransportEvent::Ready));
        gateway.await.expect("gateway task");
    }

    #[tokio::test]
    async fn pairing_code_request_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener addr").to_string();
        let _gateway = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept bridge client");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let (handle, _events) = connect(&addr, Path::new("/tmp/auth"))
            .await
            .expect("connect to gateway");
        let handle = handle.with_pairing_code_timeout(Duration::from_millis(50));

        let err = handle
            .request_pairing_code("5511987654321")
            .await
            .expect_err("no answer within the timeout");
        assert!(matches!(err, BridgeError::Timeout));
    }
}
