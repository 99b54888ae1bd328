//! Lazily connected facade over a broker connection
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
use futures::StreamExt;
use natsbridge_config::NatsConfig;
use natsbridge_types::{InboundMessage, Payload};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

use crate::error::{MessageBusError, Result};
use crate::nats::NatsConnectionFactory;
use crate::options::{ConnectOptions, Overrides};
use crate::subject::validate_subject;
use crate::subscription::{PendingReply, SubscriptionHandle};
use crate::traits::{Connection, ConnectionFactory, MessageStream};

/// Owns the broker configuration and at most one connection, created on
/// first use. Share it behind an `Arc`.
pub struct Connector {
    config: NatsConfig,
    enabled: AtomicBool,
    overrides: Mutex<Overrides>,
    request_timeout: Mutex<Option<Duration>>,
    factory: Arc<dyn ConnectionFactory>,
    connection: AsyncMutex<Option<Arc<dyn Connection>>>,
}

impl Connector {
    /// Connector dialing real NATS servers
    pub fn new(config: NatsConfig) -> Self {
        Self::with_factory(config, Arc::new(NatsConnectionFactory))
    }

    /// Connector creating its connection through `factory`
    pub fn with_factory(config: NatsConfig, factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            enabled: AtomicBool::new(config.enabled),
            request_timeout: Mutex::new(config.request_timeout()),
            config,
            overrides: Mutex::new(Overrides::default()),
            factory,
            connection: AsyncMutex::new(None),
        }
    }

    fn overrides(&self) -> MutexGuard<'_, Overrides> {
        self.overrides.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the broker host used when the connection is created
    pub fn set_server(&self, server: impl Into<String>) -> &Self {
        self.overrides().server = Some(server.into());
        self
    }

    /// Set the broker port used when the connection is created
    pub fn set_port(&self, port: impl Into<String>) -> &Self {
        self.overrides().port = Some(port.into());
        self
    }

    /// Set the username used when the connection is created
    pub fn set_user(&self, user: impl Into<String>) -> &Self {
        self.overrides().user = Some(user.into());
        self
    }

    /// Set the password used when the connection is created
    pub fn set_pass(&self, pass: impl Into<String>) -> &Self {
        self.overrides().pass = Some(pass.into());
        self
    }

    /// Switch messaging on or off. Turning it off drops the connection on next use.
    pub fn set_enabled(&self, enabled: bool) -> &Self {
        self.enabled.store(enabled, Ordering::SeqCst);
        self
    }

    /// Limit how long requests wait for a reply; `None` waits indefinitely
    pub fn set_request_timeout(&self, timeout: Option<Duration>) -> &Self {
        *self
            .request_timeout
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = timeout;
        self
    }

    fn request_timeout(&self) -> Option<Duration> {
        *self
            .request_timeout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Return the cached connection, creating it if needed.
    ///
    /// Returns `None` when messaging is disabled (dropping any cached
    /// connection) or when the connection cannot be established.
    pub async fn ensure_connection(&self) -> Option<Arc<dyn Connection>> {
        let mut slot = self.connection.lock().await;

        if !self.is_enabled() {
            if slot.take().is_some() {
                info!("Messaging disabled, connection dropped");
            }
            return None;
        }

        if let Some(connection) = slot.as_ref() {
            return Some(Arc::clone(connection));
        }

        let options = ConnectOptions::resolve(&self.overrides(), &self.config);

        match self.factory.connect(&options).await {
            Ok(connection) => {
                info!(
                    url = %options.url(),
                    client_type = connection.client_type(),
                    "Connected to message bus"
                );
                *slot = Some(Arc::clone(&connection));
                Some(connection)
            }
            Err(e) => {
                error!(url = %options.url(), error = %e, "Failed to connect to message bus");
                None
            }
        }
    }

    async fn connection(&self) -> Result<Arc<dyn Connection>> {
        self.ensure_connection()
            .await
            .ok_or(MessageBusError::NoConnection)
    }

    /// Send `payload` as-is and return the body of the single reply
    pub async fn request(&self, channel: &str, payload: impl Into<Bytes>) -> Result<String> {
        let reply = self.request_message(channel, payload).await?;
        Ok(reply.body().into_owned())
    }

    /// Like [`Connector::request`], returning the whole reply message
    pub async fn request_message(
        &self,
        channel: &str,
        payload: impl Into<Bytes>,
    ) -> Result<InboundMessage> {
        validate_subject(channel)?;
        let connection = self.connection().await?;

        debug!(subject = channel, "Sending request");

        connection
            .request(channel, payload.into(), self.request_timeout())
            .await
    }

    /// Issue a request in the background; the reply resolves the returned handle
    pub async fn request_deferred(
        &self,
        channel: &str,
        payload: impl Into<Bytes>,
    ) -> Result<PendingReply> {
        validate_subject(channel)?;
        let connection = self.connection().await?;

        let (tx, rx) = oneshot::channel();
        let subject = channel.to_string();
        let payload = payload.into();
        let timeout = self.request_timeout();

        let task_subject = subject.clone();
        tokio::spawn(async move {
            let result = connection.request(&task_subject, payload, timeout).await;
            let _ = tx.send(result);
        });

        Ok(PendingReply::new(subject, rx))
    }

    /// Issue a request and return immediately; `on_reply` runs once when the
    /// reply arrives. A failed request is logged and the callback is skipped.
    pub async fn request_with_callback<F>(
        &self,
        channel: &str,
        payload: impl Into<Bytes>,
        on_reply: F,
    ) -> Result<()>
    where
        F: FnOnce(InboundMessage) + Send + 'static,
    {
        let pending = self.request_deferred(channel, payload).await?;

        tokio::spawn(async move {
            let subject = pending.subject().to_string();
            match pending.wait().await {
                Ok(reply) => on_reply(reply),
                Err(e) => warn!(subject = %subject, error = %e, "Request failed, reply callback skipped"),
            }
        });

        Ok(())
    }

    /// Encode `payload` and publish it on `channel`.
    ///
    /// Backend failures are logged and returned as [`MessageBusError::Publish`],
    /// which reports itself as a backend failure (status 500).
    pub async fn publish(&self, channel: &str, payload: impl Into<Payload>) -> Result<()> {
        validate_subject(channel)?;
        let connection = self.connection().await?;

        let payload: Payload = payload.into();
        let encoded = payload.encode();

        if let Err(e) = connection.publish(channel, Bytes::from(encoded)).await {
            error!(
                subject = channel,
                error = %e,
                "Something went wrong submitting data to NATS"
            );
            return Err(match e {
                MessageBusError::Publish(_) => e,
                other => MessageBusError::Publish(other.to_string()),
            });
        }

        Ok(())
    }

    /// Serialize `value` to JSON and publish it
    pub async fn publish_json<T: Serialize + ?Sized>(&self, channel: &str, value: &T) -> Result<()> {
        let payload = Payload::json(value)?;
        self.publish(channel, payload).await
    }

    /// Wait until published messages have reached the broker
    pub async fn flush(&self) -> Result<()> {
        self.connection().await?.flush().await
    }

    /// Run `on_message` for every message on `channel` until unsubscribed.
    ///
    /// The registration is in place when this returns. Messages are handed to
    /// the callback one at a time in arrival order.
    pub async fn subscribe<F>(&self, channel: &str, mut on_message: F) -> Result<SubscriptionHandle>
    where
        F: FnMut(InboundMessage) + Send + 'static,
    {
        let mut stream = self.subscribe_stream(channel).await?;

        let subject = channel.to_string();
        let task_subject = subject.clone();
        let task = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                on_message(message);
            }
            debug!(subject = %task_subject, "Subscription stream ended");
        });

        let handle = SubscriptionHandle::new(subject, task);
        info!(
            subscription_id = %handle.id(),
            subject = channel,
            "Subscribed"
        );

        Ok(handle)
    }

    /// Subscribe and receive messages as a stream; dropping it unsubscribes
    pub async fn subscribe_stream(&self, channel: &str) -> Result<MessageStream> {
        validate_subject(channel)?;
        let connection = self.connection().await?;

        connection.subscribe(channel).await
    }

    /// Whether a connection exists and reports itself connected.
    /// Reports false while a connection attempt is in flight.
    pub fn is_connected(&self) -> bool {
        match self.connection.try_lock() {
            Ok(slot) => slot
                .as_ref()
                .map(|connection| connection.is_connected())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Drop the cached connection; the next operation connects again
    pub async fn disconnect(&self) {
        if self.connection.lock().await.take().is_some() {
            info!("Message bus connection dropped");
        }
    }
}
