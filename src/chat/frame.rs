use serde::{Deserialize, Serialize};

use crate::error::{self, Error};

/// Frames a client sends over its socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    Auth {
        #[serde(default)]
        id: String,
    },
    Message {
        #[serde(default)]
        to: String,
        #[serde(default)]
        text: String,
    },
}

impl ClientFrame {
    pub fn parse(raw: &str) -> error::Result<ClientFrame> {
        serde_json::from_str(raw).map_err(|err| Error::validation(format!("malformed frame: {err}")))
    }
}

/// Frames the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Message { from: String, text: String },
    Error { message: String },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error { message: message.into() }
    }

    pub fn to_json(&self) -> String {
        // both variants are plain string fields
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auth() {
        assert_eq!(
            ClientFrame::parse(r#"{"type":"auth","id":"u1"}"#).unwrap(),
            ClientFrame::Auth { id: "u1".to_owned() }
        );
    }

    #[test]
    fn parses_message_with_missing_fields_as_empty() {
        assert_eq!(
            ClientFrame::parse(r#"{"type":"message","text":"hi"}"#).unwrap(),
            ClientFrame::Message { to: String::new(), text: "hi".to_owned() }
        );
    }

    #[test]
    fn rejects_unknown_type_and_garbage() {
        assert!(matches!(ClientFrame::parse(r#"{"type":"typing"}"#), Err(Error::Validation(_))));
        assert!(matches!(ClientFrame::parse("not json"), Err(Error::Validation(_))));
        assert!(matches!(ClientFrame::parse(r#"{"to":"u2","text":"x"}"#), Err(Error::Validation(_))));
    }

    #[test]
    fn outbound_message_shape() {
        let frame = ServerFrame::Message { from: "u1".to_owned(), text: "hello".to_owned() };
        let value: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "message", "from": "u1", "text": "hello"}));
    }

    #[test]
    fn outbound_error_shape() {
        let value: serde_json::Value = serde_json::from_str(&ServerFrame::error("nope").to_json()).unwrap();
        assert_eq!(value, serde_json::json!({"type": "error", "message": "nope"}));
    }
}
