//! Chat message records consumed by the rendering pipeline.
//!
//! Messages are owned by the caller's chat history store; the pipeline only
//! reads them.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Whether the message was written by the user (selects bubble styling).
    pub fn is_user(self) -> bool {
        matches!(self, Sender::User)
    }

    /// CSS class suffix used by the HTML writer.
    pub fn css_class(self) -> &'static str {
        match self {
            Sender::User => "message-user",
            Sender::Assistant => "message-assistant",
        }
    }
}

/// A received chat message. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: Sender,
    /// Untrusted user- or model-generated text.
    pub raw_text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Message {
    pub fn new(sender: Sender, raw_text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            sender,
            raw_text: raw_text.into(),
            timestamp,
        }
    }

    /// Parse a transcript: a JSON array of `{sender, rawText, timestamp}` records.
    pub fn parse_transcript(json: &str) -> Result<Vec<Message>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_camel_case() {
        let json = r#"[
            {"sender": "user", "rawText": "hi", "timestamp": 1700000000000},
            {"sender": "assistant", "rawText": "**hello**", "timestamp": 1700000001000}
        ]"#;
        let messages = Message::parse_transcript(json).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].raw_text, "**hello**");
        assert_eq!(messages[1].timestamp, 1_700_000_001_000);
    }

    #[test]
    fn test_parse_transcript_rejects_unknown_sender() {
        let json = r#"[{"sender": "system", "rawText": "x", "timestamp": 0}]"#;
        assert!(Message::parse_transcript(json).is_err());
    }

    #[test]
    fn test_sender_helpers() {
        assert!(Sender::User.is_user());
        assert!(!Sender::Assistant.is_user());
        assert_eq!(Sender::Assistant.css_class(), "message-assistant");
    }
}
