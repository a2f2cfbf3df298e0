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

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace, warn};

use crate::common::types::{ListenerMap, MessageReceiver, MessageSender};
use crate::common::Node;
use crate::message::{Identity, ListenerBinding, Message, MessageStatus};

/// The per-service delivery engine.
///
/// The outbox owns the service's subscription registry and an internal
/// queue of outgoing messages, serviced by its own delivery task. Messages
/// addressed to the owning service fan out to the registered listeners of
/// their method; messages addressed elsewhere are relayed verbatim; RETURN
/// messages complete the node's pending-call table.
///
/// Stop policy is *drain*: the delivery task keeps servicing the queue
/// until the last producer handle is dropped, then exits, so nothing queued
/// before a stop is silently discarded.
#[derive(Debug, Clone)]
pub struct Outbox {
    owner: Identity,
    tx: MessageSender,
    listeners: ListenerMap,
}

impl Outbox {
    /// Creates the outbox and its delivery queue. The returned receiver is
    /// handed to [`Outbox::deliver_loop`] when the service starts.
    pub(crate) fn new(owner: Identity) -> (Self, MessageReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Outbox {
                owner,
                tx,
                listeners: Arc::new(DashMap::new()),
            },
            rx,
        )
    }

    /// Enqueues a message for asynchronous delivery. Never blocks the
    /// producer.
    pub fn add(&self, msg: Message) {
        if self.tx.send(msg).is_err() {
            warn!(owner = %self.owner, "outbox queue closed, dropping message");
        }
    }

    /// Registers a listener binding. Duplicate triples are rejected;
    /// returns whether the binding was inserted.
    pub fn add_listener(&self, binding: ListenerBinding) -> bool {
        let mut bindings = self
            .listeners
            .entry(binding.topic_method.clone())
            .or_default();
        if bindings.contains(&binding) {
            debug!(owner = %self.owner, ?binding, "ignoring duplicate listener");
            return false;
        }
        debug!(
            owner = %self.owner,
            topic = %binding.topic_method,
            callback = %binding.callback_name,
            "adding listener"
        );
        bindings.push(binding);
        true
    }

    /// Removes a binding by value equality. Removing a binding that does
    /// not exist is a reported no-op, not an error.
    pub fn remove_listener(&self, binding: &ListenerBinding) -> bool {
        match self.listeners.get_mut(&binding.topic_method) {
            Some(mut bindings) => {
                let before = bindings.len();
                bindings.retain(|b| b != binding);
                let removed = bindings.len() != before;
                if !removed {
                    info!(owner = %self.owner, ?binding, "remove_listener: no matching binding");
                }
                removed
            }
            None => {
                info!(owner = %self.owner, topic = %binding.topic_method, "remove_listener: topic has no listeners");
                false
            }
        }
    }

    /// Bindings currently registered for a topic, in fan-out order.
    pub fn listeners_of(&self, topic_method: &str) -> Vec<ListenerBinding> {
        self.listeners
            .get(topic_method)
            .map(|bindings| bindings.clone())
            .unwrap_or_default()
    }

    /// Topics with at least one binding.
    pub fn topics(&self) -> Vec<String> {
        self.listeners
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Removes every binding from the registry.
    pub fn remove_all_listeners(&self) {
        self.listeners.clear();
    }

    pub(crate) fn listener_map(&self) -> ListenerMap {
        self.listeners.clone()
    }

    /// The delivery task. Holds no producer handle itself, so it drains and
    /// exits once the owning service has dropped its clones.
    #[instrument(skip(rx, node, listeners), fields(owner = %owner))]
    pub(crate) async fn deliver_loop(
        mut rx: MessageReceiver,
        node: Node,
        owner: Identity,
        listeners: ListenerMap,
    ) {
        trace!("outbox delivery started");
        while let Some(msg) = rx.recv().await {
            Self::deliver(&node, &owner, &listeners, msg).await;
        }
        trace!("outbox drained and stopped");
    }

    async fn deliver(node: &Node, owner: &Identity, listeners: &DashMap<String, Vec<ListenerBinding>>, msg: Message) {
        // Replies complete a locally waiting caller; a late reply with no
        // waiter is dropped. Remote callers are reached through their
        // gateway like any other remote destination.
        if msg.status == MessageStatus::Return {
            match msg.dest_process() {
                Some(process) if process != node.process_id() => Self::route(node, msg).await,
                _ => {
                    node.complete_pending(&msg);
                }
            }
            return;
        }

        let destination = msg.dest_name();
        if destination.is_empty() || destination == owner.name {
            // A publish event: fan out to every binding of the topic, in
            // registration order.
            let bindings = listeners
                .get(&msg.method)
                .map(|b| b.clone())
                .unwrap_or_default();
            if bindings.is_empty() {
                trace!(topic = %msg.method, "no listeners, dropping publish");
                return;
            }
            for binding in bindings {
                let fan_out = Message::oneway(
                    owner.clone(),
                    binding.callback_name,
                    binding.callback_method,
                    msg.data.clone(),
                );
                Self::route(node, fan_out).await;
            }
        } else {
            // Pure relay: not a publish event.
            trace!(destination, "relaying");
            Self::route(node, msg).await;
        }
    }

    async fn route(node: &Node, msg: Message) {
        if let Err(e) = node.route(msg).await {
            warn!(error = %e, "delivery failed");
        }
    }
}
