//! Handles returned by asynchronous connector operations
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


use natsbridge_types::InboundMessage;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::error::{MessageBusError, Result};

/// Token for a callback subscription.
///
/// The registration stays alive until [`SubscriptionHandle::unsubscribe`] is
/// called; dropping the handle leaves the callback running.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: Uuid,
    subject: String,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub(crate) fn new(subject: String, task: JoinHandle<()>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject,
            task,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Subject (or wildcard pattern) this subscription was registered on
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Whether messages are still being delivered to the callback
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the registration. No callback runs after this returns.
    pub async fn unsubscribe(self) {
        self.task.abort();
        let _ = self.task.await;

        info!(
            subscription_id = %self.id,
            subject = %self.subject,
            "Unsubscribed"
        );
    }
}

/// A request in flight, resolved exactly once with its reply
#[derive(Debug)]
pub struct PendingReply {
    subject: String,
    rx: oneshot::Receiver<Result<InboundMessage>>,
}

impl PendingReply {
    pub(crate) fn new(subject: String, rx: oneshot::Receiver<Result<InboundMessage>>) -> Self {
        Self { subject, rx }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Wait for the reply
    pub async fn wait(self) -> Result<InboundMessage> {
        self.rx.await.map_err(|_| {
            MessageBusError::Request(format!("request on {} was dropped before a reply", self.subject))
        })?
    }
}
