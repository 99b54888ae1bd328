//! Traits for broker connections
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


use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use natsbridge_types::InboundMessage;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::options::ConnectOptions;

/// Stream of messages delivered to one subscription.
/// Dropping it cancels the subscription.
pub type MessageStream = Pin<Box<dyn Stream<Item = InboundMessage> + Send>>;

/// A live broker session
#[async_trait]
pub trait Connection: Send + Sync {
    /// Publish a message, no reply expected
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()>;

    /// Send a request and wait for exactly one reply.
    /// `None` waits for as long as the reply takes.
    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Option<Duration>,
    ) -> Result<InboundMessage>;

    /// Register interest in a subject (wildcards allowed)
    async fn subscribe(&self, subject: &str) -> Result<MessageStream>;

    /// Wait until buffered messages have been written to the broker
    async fn flush(&self) -> Result<()>;

    /// Check if the connection is up
    fn is_connected(&self) -> bool;

    /// Get the connection type name
    fn client_type(&self) -> &str;
}

/// Creates connections for a connector
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self, options: &ConnectOptions) -> Result<Arc<dyn Connection>>;
}
