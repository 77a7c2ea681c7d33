//! Messaging transport seam.
//!
//! The session loop only needs three things from a transport: a stream of
//! session events, a way to request a pairing code and a way to reply.

use crate::bridge::BridgeError;
use std::future::Future;
use taskbot_core::InboundMessage;

/// Event delivered by a messaging transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A fresh QR payload for linking the session.
    Qr(String),
    /// The session is authenticated and delivers messages.
    Ready,
    /// The transport dropped the session.
    Disconnected(String),
    Message(ChatMessage),
}

/// One chat message with its addressing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Transport message id; replies quote it.
    pub id: String,
    pub chat_id: String,
    pub inbound: InboundMessage,
}

/// Outbound operations the session loop performs on a transport.
pub trait Transport: Clone + Send + Sync + 'static {
    /// Asks the transport for a numeric pairing code bound to `phone_number`.
    fn request_pairing_code(
        &self,
        phone_number: &str,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send;

    /// Sends `body` to `chat_id` quoting `quoted_message_id`, tagged as a bot
    /// reply.
    fn send_reply(
        &self,
        chat_id: &str,
        quoted_message_id: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}
