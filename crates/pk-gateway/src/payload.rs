//! Gateway payload encoding.
//!
//! Every frame on the gateway socket is a JSON object of the form
//! `{"op": <opcode>, "d": <data>, "s": <sequence>, "t": <event name>}`.
//! `s` and `t` are only set on dispatches (op 0).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use pk_core::MessageEvent;

/// Gateway opcodes.
pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Dispatch event names the client decodes.
pub mod event {
    pub const READY: &str = "READY";
    pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";
}

/// A gateway frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayPayload {
    fn new(op: u8, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    /// Builds an `IDENTIFY` payload.
    pub fn identify(token: &str, intents: u64) -> Self {
        Self::new(
            opcode::IDENTIFY,
            json!({
                "token": token,
                "intents": intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "pluralkit",
                    "device": "pluralkit",
                },
            }),
        )
    }

    /// Builds a heartbeat carrying the last dispatch sequence number.
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self::new(opcode::HEARTBEAT, json!(sequence))
    }

    /// Decodes a text frame.
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Encodes the payload for sending.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Returns the heartbeat interval of a `HELLO` payload.
    pub fn heartbeat_interval(&self) -> Option<u64> {
        if self.op != opcode::HELLO {
            return None;
        }
        self.d.get("heartbeat_interval").and_then(Value::as_u64)
    }
}

/// The account the bot is logged in as, from the `READY` dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
}

impl CurrentUser {
    /// Decodes the `user` field of a `READY` payload.
    pub fn from_ready(data: &Value) -> serde_json::Result<Self> {
        Self::deserialize(data.get("user").unwrap_or(&Value::Null))
    }
}

/// Decodes a `MESSAGE_CREATE` payload.
pub fn parse_message(data: Value) -> serde_json::Result<MessageEvent> {
    serde_json::from_value(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hello() {
        let hello = GatewayPayload::decode(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#).unwrap();
        assert_eq!(hello.heartbeat_interval(), Some(41250));
        assert_eq!(hello.s, None);
    }

    #[test]
    fn test_heartbeat_carries_sequence() {
        let encoded = GatewayPayload::heartbeat(Some(42)).encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["op"], 1);
        assert_eq!(value["d"], 42);

        let first = GatewayPayload::heartbeat(None);
        assert_eq!(first.d, Value::Null);
    }

    #[test]
    fn test_identify_contains_token_and_intents() {
        let identify = GatewayPayload::identify("abc", 513);
        assert_eq!(identify.op, opcode::IDENTIFY);
        assert_eq!(identify.d["token"], "abc");
        assert_eq!(identify.d["intents"], 513);
    }

    #[test]
    fn test_ready_user() {
        let ready = GatewayPayload::decode(
            r#"{"op":0,"s":1,"t":"READY","d":{"v":10,"user":{"id":"466378653216014359","username":"PluralKit","discriminator":"4020"}}}"#,
        )
        .unwrap();

        assert_eq!(ready.t.as_deref(), Some(event::READY));
        let user = CurrentUser::from_ready(&ready.d).unwrap();
        assert_eq!(user.username, "PluralKit");
        assert_eq!(user.discriminator.as_deref(), Some("4020"));
    }

    #[test]
    fn test_parse_message_create() {
        let payload = GatewayPayload::decode(
            r#"{"op":0,"s":5,"t":"MESSAGE_CREATE","d":{"id":"10","channel_id":"20","guild_id":"30","content":"pk;help","author":{"id":"1","username":"alice","bot":false}}}"#,
        )
        .unwrap();

        let message = parse_message(payload.d).unwrap();
        assert_eq!(message.message_id, "10");
        assert_eq!(message.guild_id.as_deref(), Some("30"));
        assert_eq!(message.content, "pk;help");
        assert!(!message.is_from_bot());
    }

    #[test]
    fn test_parse_message_from_webhook() {
        let data = serde_json::json!({
            "id": "11", "channel_id": "20", "content": "proxied",
            "author": { "id": "2", "username": "Member", "bot": true }
        });
        assert!(parse_message(data).unwrap().is_from_bot());
    }
}
