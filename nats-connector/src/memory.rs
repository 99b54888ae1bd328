//! In-process broker connection for tests and offline development
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
use futures::{Stream, StreamExt};
use natsbridge_types::InboundMessage;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;
use uuid::Uuid;

use crate::error::{MessageBusError, Result};
use crate::options::ConnectOptions;
use crate::subject::subject_matches;
use crate::traits::{Connection, ConnectionFactory, MessageStream};

struct Registration {
    id: u64,
    pattern: String,
    tx: mpsc::UnboundedSender<InboundMessage>,
}

#[derive(Default)]
struct BrokerState {
    next_id: AtomicU64,
    registrations: Mutex<Vec<Registration>>,
}

impl BrokerState {
    fn registrations(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.registrations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64) {
        self.registrations().retain(|r| r.id != id);
    }
}

/// A process-local broker. Clones share the same subject space.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<BrokerState>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection to this broker
    pub fn connect(&self) -> MemoryConnection {
        MemoryConnection {
            broker: self.clone(),
            open: AtomicBool::new(true),
        }
    }

    /// Number of live subscriptions, inboxes included
    pub fn subscription_count(&self) -> usize {
        let mut registrations = self.state.registrations();
        registrations.retain(|r| !r.tx.is_closed());
        registrations.len()
    }

    /// Drop every registration; open subscription streams end
    pub fn shutdown(&self) {
        self.state.registrations().clear();
    }

    fn register(&self, pattern: &str) -> MemorySubscription {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.state.registrations().push(Registration {
            id,
            pattern: pattern.to_string(),
            tx,
        });

        MemorySubscription {
            id,
            inner: UnboundedReceiverStream::new(rx),
            broker: Arc::downgrade(&self.state),
        }
    }

    /// Deliver to every matching subscription; returns how many received it
    fn deliver(&self, subject: &str, reply: Option<String>, payload: Bytes) -> usize {
        let mut registrations = self.state.registrations();
        registrations.retain(|r| !r.tx.is_closed());

        registrations
            .iter()
            .filter(|r| subject_matches(&r.pattern, subject))
            .filter(|r| {
                r.tx
                    .send(InboundMessage::new(subject, reply.clone(), payload.clone()))
                    .is_ok()
            })
            .count()
    }
}

/// Subscription stream that deregisters itself when dropped
struct MemorySubscription {
    id: u64,
    inner: UnboundedReceiverStream<InboundMessage>,
    broker: Weak<BrokerState>,
}

impl Stream for MemorySubscription {
    type Item = InboundMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        if let Some(state) = self.broker.upgrade() {
            state.remove(self.id);
        }
    }
}

/// Connection to a [`MemoryBroker`]
pub struct MemoryConnection {
    broker: MemoryBroker,
    open: AtomicBool,
}

impl MemoryConnection {
    /// Simulate losing the broker: every later operation fails
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn ensure_open(&self, error: fn(String) -> MessageBusError) -> Result<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(error("connection closed".to_string()))
        }
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<()> {
        self.ensure_open(MessageBusError::Publish)?;

        let delivered = self.broker.deliver(subject, None, payload);
        debug!(subject = subject, delivered = delivered, "Message published");

        Ok(())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Option<Duration>,
    ) -> Result<InboundMessage> {
        self.ensure_open(MessageBusError::Request)?;

        let inbox = format!("_INBOX.{}", Uuid::new_v4().simple());
        let mut replies = self.broker.register(&inbox);

        if self.broker.deliver(subject, Some(inbox), payload) == 0 {
            return Err(MessageBusError::NoResponders(subject.to_string()));
        }

        let reply = match timeout {
            Some(limit) => tokio::time::timeout(limit, replies.next())
                .await
                .map_err(|_| MessageBusError::Timeout)?,
            None => replies.next().await,
        };

        reply.ok_or_else(|| MessageBusError::Request("reply inbox closed".to_string()))
    }

    async fn subscribe(&self, subject: &str) -> Result<MessageStream> {
        self.ensure_open(MessageBusError::Subscribe)?;

        Ok(Box::pin(self.broker.register(subject)))
    }

    async fn flush(&self) -> Result<()> {
        self.ensure_open(MessageBusError::Flush)
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn client_type(&self) -> &str {
        "memory"
    }
}

/// Factory handing out [`MemoryConnection`]s, recording how it was used
#[derive(Default)]
pub struct MemoryConnectionFactory {
    broker: MemoryBroker,
    connect_delay: Option<Duration>,
    refuse: AtomicBool,
    connects: AtomicUsize,
    last_options: Mutex<Option<ConnectOptions>>,
    last_connection: Mutex<Option<Arc<MemoryConnection>>>,
}

impl MemoryConnectionFactory {
    pub fn new(broker: MemoryBroker) -> Self {
        Self {
            broker,
            ..Self::default()
        }
    }

    /// Sleep this long inside every connect call
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Make subsequent connect calls fail
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Number of connections created so far
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Options passed to the latest connect call
    pub fn last_options(&self) -> Option<ConnectOptions> {
        self.last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recently created connection
    pub fn last_connection(&self) -> Option<Arc<MemoryConnection>> {
        self.last_connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn broker(&self) -> &MemoryBroker {
        &self.broker
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    async fn connect(&self, options: &ConnectOptions) -> Result<Arc<dyn Connection>> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }

        *self.last_options.lock().unwrap_or_else(PoisonError::into_inner) = Some(options.clone());

        if self.refuse.load(Ordering::SeqCst) {
            return Err(MessageBusError::Connection(format!(
                "connection refused: {}",
                options.url()
            )));
        }

        self.connects.fetch_add(1, Ordering::SeqCst);
        let connection = Arc::new(self.broker.connect());
        *self
            .last_connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&connection));

        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wildcard_delivery() {
        let broker = MemoryBroker::new();
        let connection = broker.connect();

        let mut all = connection.subscribe("topic.*").await.unwrap();
        let mut other = connection.subscribe("elsewhere").await.unwrap();

        connection.publish("topic.news", Bytes::from_static(b"1")).await.unwrap();
        connection.publish("topic.sport", Bytes::from_static(b"2")).await.unwrap();

        assert_eq!(all.next().await.unwrap().body(), "1");
        assert_eq!(all.next().await.unwrap().subject, "topic.sport");

        connection.publish("elsewhere", Bytes::from_static(b"3")).await.unwrap();
        assert_eq!(other.next().await.unwrap().body(), "3");
    }

    #[tokio::test]
    async fn test_dropping_stream_deregisters() {
        let broker = MemoryBroker::new();
        let connection = broker.connect();

        let stream = connection.subscribe("a.b").await.unwrap();
        assert_eq!(broker.subscription_count(), 1);

        drop(stream);
        assert_eq!(broker.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_ends_streams() {
        let broker = MemoryBroker::new();
        let connection = broker.connect();

        let mut stream = connection.subscribe("a.*").await.unwrap();
        broker.shutdown();

        assert!(stream.next().await.is_none());
        assert_eq!(broker.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_request_reply() {
        let broker = MemoryBroker::new();
        let responder = broker.connect();
        let requester = broker.connect();

        let mut requests = responder.subscribe("ping").await.unwrap();
        tokio::spawn(async move {
            while let Some(msg) = requests.next().await {
                if let Some(reply) = msg.reply {
                    responder.publish(&reply, Bytes::from_static(b"pong")).await.unwrap();
                }
            }
        });

        let reply = requester
            .request("ping", Bytes::from_static(b"hi"), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(reply.body(), "pong");
        assert!(reply.subject.starts_with("_INBOX."));
    }

    #[tokio::test]
    async fn test_request_without_responders() {
        let broker = MemoryBroker::new();
        let connection = broker.connect();

        let result = connection.request("nobody", Bytes::new(), None).await;
        assert!(matches!(result, Err(MessageBusError::NoResponders(s)) if s == "nobody"));
        assert_eq!(broker.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let broker = MemoryBroker::new();
        let connection = broker.connect();
        let _silent = connection.subscribe("slow").await.unwrap();

        let result = connection
            .request("slow", Bytes::new(), Some(Duration::from_millis(20)))
            .await;
        assert!(matches!(result, Err(MessageBusError::Timeout)));
    }

    #[tokio::test]
    async fn test_closed_connection_fails() {
        let broker = MemoryBroker::new();
        let connection = broker.connect();
        connection.close();

        assert!(!connection.is_connected());
        assert!(matches!(
            connection.publish("x", Bytes::new()).await,
            Err(MessageBusError::Publish(_))
        ));
        assert!(matches!(
            connection.subscribe("x").await,
            Err(MessageBusError::Subscribe(_))
        ));
    }
}
