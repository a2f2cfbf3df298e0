/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{instrument, trace};

use crate::common::types::MessageSender;
use crate::common::CONFIG;
use crate::message::{Identity, Message, RuntimeError};

/// An external reference to a running (or starting) service.
///
/// The handle is the only way code outside a service's two tasks interacts
/// with it: enqueue messages, inspect identity and state, stop it. Cloning
/// the handle is cheap; all clones address the same instance.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    identity: Identity,
    type_name: String,
    inbox: MessageSender,
    cancel: CancellationToken,
    tracker: TaskTracker,
    running: Arc<AtomicBool>,
    creation_order: usize,
    /// Sender identity stamped on handle-originated messages.
    node_identity: Identity,
}

impl PartialEq for ServiceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for ServiceHandle {}

impl Hash for ServiceHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl ServiceHandle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        identity: Identity,
        type_name: String,
        inbox: MessageSender,
        cancel: CancellationToken,
        tracker: TaskTracker,
        creation_order: usize,
        node_identity: Identity,
    ) -> Self {
        ServiceHandle {
            identity,
            type_name,
            inbox,
            cancel,
            tracker,
            running: Arc::new(AtomicBool::new(false)),
            creation_order,
            node_identity,
        }
    }

    /// The service's name within its process.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The service's type name, as declared by its model.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Index in process-wide creation order.
    pub fn creation_order(&self) -> usize {
        self.creation_order
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Enqueues a fire-and-forget invocation on the service's inbox.
    pub fn send(&self, method: &str, data: Vec<Value>) -> Result<(), RuntimeError> {
        self.accept(Message::oneway(
            self.node_identity.clone(),
            self.identity.name.clone(),
            method,
            data,
        ))
    }

    /// Puts a message directly on the service's inbox. Never blocks the
    /// producer. Messages addressed to another service are relayed by the
    /// runtime loop rather than dispatched here.
    pub fn accept(&self, msg: Message) -> Result<(), RuntimeError> {
        self.inbox.send(msg).map_err(RuntimeError::from)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Stops the service: interrupts the runtime loop's current wait and
    /// waits for both of its tasks to finish, within the configured
    /// shutdown timeout.
    #[instrument(skip(self), fields(service = %self.identity))]
    pub async fn stop(&self) -> anyhow::Result<()> {
        trace!("requesting stop");
        self.cancel.cancel();
        timeout(CONFIG.shutdown_timeout(), self.tracker.wait())
            .await
            .map_err(|_| anyhow!("shutdown timed out for {}", self.identity))?;
        trace!("service stopped");
        Ok(())
    }
}
