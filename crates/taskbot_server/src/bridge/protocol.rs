//! Wire shapes for the gateway line protocol.

use serde::{Deserialize, Serialize};

/// Line sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeCommand {
    /// Opens (or resumes) the session from the persisted auth profile.
    Init { auth_dir: String },
    RequestPairingCode {
        request_id: u64,
        phone_number: String,
    },
    Send {
        chat_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        quoted_message_id: Option<String>,
        body: String,
        tag: String,
    },
}

/// Line received from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    Qr {
        payload: String,
    },
    PairingCode {
        request_id: u64,
        code: String,
    },
    PairingCodeFailed {
        request_id: u64,
        #[serde(default)]
        error: String,
    },
    Ready,
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    /// Acknowledges a `send` and reports the id the message got.
    Sent {
        tag: String,
        #[serde(default)]
        message_id: Option<String>,
    },
    Message {
        id: String,
        chat_id: String,
        #[serde(default)]
        body: String,
        #[serde(default)]
        from_me: bool,
        /// Tag of the `send` that produced this message, when it was ours.
        #[serde(default)]
        tag: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::{BridgeCommand, BridgeEvent};

    #[test]
    fn send_command_serializes_with_op_tag() {
        let command = BridgeCommand::Send {
            chat_id: "123@c.us".to_string(),
            quoted_message_id: Some("m1".to_string()),
            body: "📂 Empty.".to_string(),
            tag: "t1".to_string(),
        };
        let json = serde_json::to_value(&command).expect("serialize to json");
        assert_eq!(json["op"], "send");
        assert_eq!(json["quoted_message_id"], "m1");
        assert_eq!(json["tag"], "t1");
    }

    #[test]
    fn message_event_defaults_optional_fields() {
        let event: BridgeEvent =
            serde_json::from_str(r#"{"event":"message","id":"m1","chat_id":"c1","body":"!list"}"#)
                .expect("message event decodes");
        assert_eq!(
            event,
            BridgeEvent::Message {
                id: "m1".to_string(),
                chat_id: "c1".to_string(),
                body: "!list".to_string(),
                from_me: false,
                tag: None,
            }
        );
    }

    #[test]
    fn unit_and_unknown_events() {
        let ready: BridgeEvent = serde_json::from_str(r#"{"event":"ready"}"#).expect("ready event decodes");
        assert_eq!(ready, BridgeEvent::Ready);
        assert!(serde_json::from_str::<BridgeEvent>(r#"{"event":"typing"}"#).is_err());
    }
}
