//! Error types for connector operations
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


use thiserror::Error;

/// Errors that can occur in message bus operations
#[derive(Error, Debug)]
pub enum MessageBusError {
    #[error("No connection with a NATS server")]
    NoConnection,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("No responders for subject: {0}")]
    NoResponders(String),

    #[error("Subscribe error: {0}")]
    Subscribe(String),

    #[error("Flush error: {0}")]
    Flush(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout error")]
    Timeout,

    #[error("Invalid subject: {0}")]
    InvalidSubject(String),
}

impl MessageBusError {
    /// True for failures of the messaging backend itself, which a hosting
    /// service should report as an internal server error.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, MessageBusError::Publish(_))
    }

    /// HTTP-style status a hosting service can map this error to
    pub fn status_code(&self) -> u16 {
        match self {
            MessageBusError::InvalidSubject(_) | MessageBusError::Serialization(_) => 400,
            MessageBusError::Timeout => 504,
            MessageBusError::NoConnection
            | MessageBusError::Connection(_)
            | MessageBusError::NoResponders(_) => 503,
            _ => 500,
        }
    }

    /// Stable translation key for user-facing error messages
    pub fn error_key(&self) -> &'static str {
        match self {
            MessageBusError::NoConnection | MessageBusError::Connection(_) => "errors.nats_wrapper_no_connection",
            MessageBusError::Publish(_) => "errors.nats_wrapper_publish_failed",
            MessageBusError::Request(_) | MessageBusError::NoResponders(_) => "errors.nats_wrapper_request_failed",
            MessageBusError::Subscribe(_) => "errors.nats_wrapper_subscribe_failed",
            MessageBusError::Flush(_) => "errors.nats_wrapper_flush_failed",
            MessageBusError::Serialization(_) => "errors.nats_wrapper_serialization_failed",
            MessageBusError::Timeout => "errors.nats_wrapper_timeout",
            MessageBusError::InvalidSubject(_) => "errors.nats_wrapper_invalid_subject",
        }
    }
}

pub type Result<T> = std::result::Result<T, MessageBusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_failure_is_backend_failure() {
        let err = MessageBusError::Publish("broken pipe".to_string());
        assert!(err.is_backend_failure());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_key(), "errors.nats_wrapper_publish_failed");
    }

    #[test]
    fn test_no_connection_is_recoverable() {
        let err = MessageBusError::NoConnection;
        assert!(!err.is_backend_failure());
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.to_string(), "No connection with a NATS server");
    }
}
