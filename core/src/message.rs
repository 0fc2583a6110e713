//! Push envelope parsing and validation.
//!
//! Every payload arriving over the live channel goes through
//! [`SyncMessage::parse`] before anything else sees it. The channel is
//! untrusted: frames may be truncated, duplicated, reordered, or simply
//! not JSON. Validation happens here, at the transport boundary, so the
//! store only ever receives well-formed envelopes.

use crate::{error::Result, Error, Timestamp};
use serde::{Deserialize, Serialize};

/// A single chat-log entry, the payload shape of the canonical use case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    /// Who authored the entry ("admin", "support", "user", ...)
    pub sender: String,
    /// The message body
    pub content: String,
    /// When the entry was authored (milliseconds since epoch)
    pub timestamp: Timestamp,
    /// Server-assigned identity, when the backend provides one.
    /// Used for de-duplication during reconciliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChatEntry {
    /// Create an entry without a server identity.
    pub fn new(
        sender: impl Into<String>,
        content: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp,
            id: None,
        }
    }

    /// Create an entry carrying a server identity.
    pub fn with_id(
        id: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp,
            id: Some(id.into()),
        }
    }

    /// Two entries describe the same logical message if sender and
    /// content match. Used to pair an optimistic record with its
    /// confirmation when the server assigns no identity.
    pub fn same_content(&self, other: &ChatEntry) -> bool {
        self.sender == other.sender && self.content == other.content
    }
}

/// The kind of a push envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// A chat-log entry was appended on the server.
    ChatUpdated,
    /// Any kind this client does not interpret. Preserved so sessions
    /// can log what they skipped.
    Other(String),
}

impl MessageKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "chatUpdated" => MessageKind::ChatUpdated,
            other => MessageKind::Other(other.to_string()),
        }
    }
}

/// A validated push envelope.
///
/// Wire shape: `{ "type": <tag>, "message": <payload>, ... }`. The
/// payload field is also accepted under the name `payload`. Delivery
/// order is not guaranteed; the store handles duplicates and reordering.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncMessage {
    /// Envelope tag
    pub kind: MessageKind,
    /// The raw payload, already known to be a JSON object
    pub payload: serde_json::Value,
    /// Envelope timestamp (top-level when present, else the payload's)
    pub timestamp: Timestamp,
}

impl SyncMessage {
    /// Parse and validate a raw channel frame.
    ///
    /// Rejects frames that are not JSON objects, lack a string `type`
    /// tag, or (for kinds this client interprets) carry a payload that
    /// fails shape validation.
    pub fn parse(raw: &str) -> Result<SyncMessage> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| Error::MalformedMessage(e.to_string()))?;

        let obj = value.as_object().ok_or(Error::TypeMismatch {
            field: "envelope",
            expected: "object",
        })?;

        let tag = obj
            .get("type")
            .ok_or(Error::MissingField("type"))?
            .as_str()
            .ok_or(Error::TypeMismatch {
                field: "type",
                expected: "string",
            })?;
        let kind = MessageKind::from_tag(tag);

        let payload = obj
            .get("message")
            .or_else(|| obj.get("payload"))
            .cloned()
            .ok_or(Error::MissingField("message"))?;
        if !payload.is_object() {
            return Err(Error::TypeMismatch {
                field: "message",
                expected: "object",
            });
        }

        let timestamp = obj
            .get("timestamp")
            .or_else(|| payload.get("timestamp"))
            .and_then(|v| v.as_u64())
            .ok_or(Error::MissingField("timestamp"))?;

        let message = SyncMessage {
            kind,
            payload,
            timestamp,
        };

        // Shape-check payloads we interpret, so downstream code can
        // deserialize without failure paths.
        if message.kind == MessageKind::ChatUpdated {
            message.chat_entry()?;
        }

        Ok(message)
    }

    /// Deserialize the payload as a chat-log entry.
    pub fn chat_entry(&self) -> Result<ChatEntry> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| Error::MalformedMessage(e.to_string()))
    }

    /// The payload's identity key, when the backend assigns one.
    pub fn identity(&self) -> Option<&str> {
        self.payload.get("id").and_then(|v| v.as_str())
    }
}
