//! Inbound message type delivered to replies and subscriptions
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// A message received from the broker
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Subject the message was published on
    pub subject: String,

    /// Reply subject, present when the sender expects a response
    pub reply: Option<String>,

    /// Raw message body
    pub payload: Bytes,

    /// When the message was handed to this process
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a new inbound message stamped with the current time
    pub fn new(subject: impl Into<String>, reply: Option<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            reply,
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }

    /// Message body as text, replacing invalid UTF-8
    pub fn body(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_body_as_text() {
        let msg = InboundMessage::new("greet", None, "pong");
        assert_eq!(msg.body(), "pong");
        assert_eq!(msg.subject, "greet");
        assert!(msg.reply.is_none());
    }

    #[test]
    fn test_body_replaces_invalid_utf8() {
        let msg = InboundMessage::new("raw", None, Bytes::from_static(&[0x66, 0xff, 0x6f]));
        assert_eq!(msg.body(), "f\u{fffd}o");
    }

    #[test]
    fn test_json_body() {
        let msg = InboundMessage::new("orders", Some("_INBOX.1".to_string()), r#"{"id":3}"#);
        let value: Value = msg.json().unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(msg.reply.as_deref(), Some("_INBOX.1"));
    }
}
