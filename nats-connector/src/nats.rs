//! NATS implementation of the broker connection
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


use async_nats::connection::State;
use async_nats::client::{Request, RequestErrorKind};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use natsbridge_types::InboundMessage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{MessageBusError, Result};
use crate::options::ConnectOptions;
use crate::traits::{Connection, ConnectionFactory, MessageStream};

/// Broker connection backed by an `async_nats::Client`
pub struct NatsConnection {
    client: async_nats::Client,
}

impl NatsConnection {
    /// Connect to the NATS server described by `options`
    pub async fn connect(options: &ConnectOptions) -> Result<Self> {
        let url = options.url();
        info!(url = %url, user = ?options.user, "Connecting to NATS server");

        let mut connect_options = async_nats::ConnectOptions::new();
        match options.credentials() {
            Some((user, pass)) => {
                connect_options = connect_options.user_and_password(user, pass);
            }
            None if options.pass.is_some() => {
                warn!(url = %url, "Password configured without a user, connecting without credentials");
            }
            None => {}
        }
        if let Some(name) = &options.name {
            connect_options = connect_options.name(name);
        }

        let client = connect_options
            .connect(url.as_str())
            .await
            .map_err(|e| MessageBusError::Connection(e.to_string()))?;

        info!(url = %url, "NATS connection established");

        Ok(Self { client })
    }
}

fn to_inbound(message: async_nats::Message) -> InboundMessage {
    InboundMessage::new(
        message.subject.to_string(),
        message.reply.map(|reply| reply.to_string()),
        message.payload,
    )
}

#[async_trait]
impl Connection for NatsConnection {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| MessageBusError::Publish(e.to_string()))?;

        debug!(subject = subject, "Message published");

        Ok(())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Option<Duration>,
    ) -> Result<InboundMessage> {
        let request = Request::new().payload(payload).timeout(timeout);

        let reply = self
            .client
            .send_request(subject.to_string(), request)
            .await
            .map_err(|e| match e.kind() {
                RequestErrorKind::TimedOut => MessageBusError::Timeout,
                RequestErrorKind::NoResponders => MessageBusError::NoResponders(subject.to_string()),
                _ => MessageBusError::Request(e.to_string()),
            })?;

        debug!(subject = subject, "Reply received");

        Ok(to_inbound(reply))
    }

    async fn subscribe(&self, subject: &str) -> Result<MessageStream> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| MessageBusError::Subscribe(e.to_string()))?;

        info!(subject = subject, "Subscription created");

        Ok(Box::pin(subscriber.map(to_inbound)))
    }

    async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| MessageBusError::Flush(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        matches!(self.client.connection_state(), State::Connected)
    }

    fn client_type(&self) -> &str {
        "nats"
    }
}

/// Factory dialing real NATS servers
#[derive(Debug, Clone, Copy, Default)]
pub struct NatsConnectionFactory;

#[async_trait]
impl ConnectionFactory for NatsConnectionFactory {
    async fn connect(&self, options: &ConnectOptions) -> Result<Arc<dyn Connection>> {
        let connection = NatsConnection::connect(options).await?;
        Ok(Arc::new(connection))
    }
}
