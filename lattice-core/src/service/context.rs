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

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::common::{MessageSender, Node, Outbox};
use crate::message::{callback_topic_name, Identity, Message, RuntimeError};
use crate::service::TaskScheduler;

/// A service's view of its own runtime, handed to every method handler.
///
/// The context is the in-loop counterpart of a [`ServiceHandle`]: it sends
/// and publishes on behalf of the owning service, manages its subscriptions
/// and scheduled tasks, and reaches the node for blocking calls and peer
/// lookups. It is cheap to clone, which is how asynchronous handler tails
/// take it with them.
///
/// [`ServiceHandle`]: crate::common::ServiceHandle
#[derive(Debug, Clone)]
pub struct ServiceContext {
    identity: Identity,
    node: Node,
    outbox: Outbox,
    scheduler: TaskScheduler,
}

impl ServiceContext {
    pub(crate) fn new(
        identity: Identity,
        node: Node,
        outbox: Outbox,
        inbox: MessageSender,
    ) -> Self {
        let scheduler = TaskScheduler::new(identity.clone(), inbox);
        ServiceContext {
            identity,
            node,
            outbox,
            scheduler,
        }
    }

    /// The owning service's name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Sends a fire-and-forget invocation to another service. The message
    /// leaves through this service's outbox as a relay.
    pub fn send(&self, destination: &str, method: &str, data: Vec<Value>) {
        self.outbox.add(Message::oneway(
            self.identity.clone(),
            destination,
            method,
            data,
        ));
    }

    /// Performs a blocking call on behalf of this service. May be awaited
    /// from a handler's asynchronous tail or any other task.
    pub async fn send_blocking(
        &self,
        destination: &str,
        method: &str,
        data: Vec<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, RuntimeError> {
        self.node
            .send_blocking_from(self.identity.clone(), destination, method, data, timeout)
            .await
    }

    /// Publishes a payload on one of this service's own topics, fanning out
    /// to its subscribers.
    pub fn publish(&self, topic_method: &str, data: Vec<Value>) {
        self.outbox.add(Message::oneway(
            self.identity.clone(),
            self.identity.name.clone(),
            topic_method,
            data,
        ));
    }

    /// Subscribes this service to a topic, deriving the conventional
    /// callback method (`angle` → `on_angle`).
    pub fn subscribe(&self, topic_name: &str, topic_method: &str) {
        self.subscribe_as(
            topic_name,
            topic_method,
            self.name(),
            &callback_topic_name(topic_method),
        );
    }

    /// Subscribes an arbitrary callback to a topic.
    ///
    /// Subscription is itself a message-passing operation: an
    /// `add_listener` control message is sent to the topic service, which
    /// works unchanged when the topic service is remote. A `*` topic name
    /// expands over the currently known service names; a `*` topic method
    /// expands over the topic type's declared methods, each expansion with
    /// its own derived callback.
    pub fn subscribe_as(
        &self,
        topic_name: &str,
        topic_method: &str,
        callback_name: &str,
        callback_method: &str,
    ) {
        debug!(
            subscriber = %self.identity,
            topic = %format!("{topic_name}.{topic_method}"),
            callback = %format!("{callback_name}.{callback_method}"),
            "subscribe"
        );
        if topic_name.contains('*') {
            for name in self.node.list_names(topic_name) {
                self.send_listener_op("add_listener", &name, topic_method, callback_name, callback_method);
            }
        } else if topic_method.contains('*') {
            for method in self.node.methods_of(topic_name) {
                let callback = callback_topic_name(&method);
                self.send_listener_op("add_listener", topic_name, &method, callback_name, &callback);
            }
        } else {
            self.send_listener_op("add_listener", topic_name, topic_method, callback_name, callback_method);
        }
    }

    /// Removes this service's derived subscription to a topic.
    pub fn unsubscribe(&self, topic_name: &str, topic_method: &str) {
        self.unsubscribe_as(
            topic_name,
            topic_method,
            self.name(),
            &callback_topic_name(topic_method),
        );
    }

    /// Removes an arbitrary subscription, mirroring [`subscribe_as`].
    ///
    /// [`subscribe_as`]: Self::subscribe_as
    pub fn unsubscribe_as(
        &self,
        topic_name: &str,
        topic_method: &str,
        callback_name: &str,
        callback_method: &str,
    ) {
        debug!(
            subscriber = %self.identity,
            topic = %format!("{topic_name}.{topic_method}"),
            "unsubscribe"
        );
        if topic_name.contains('*') {
            for name in self.node.list_names(topic_name) {
                self.send_listener_op("remove_listener", &name, topic_method, callback_name, callback_method);
            }
        } else if topic_method.contains('*') {
            for method in self.node.methods_of(topic_name) {
                let callback = callback_topic_name(&method);
                self.send_listener_op("remove_listener", topic_name, &method, callback_name, &callback);
            }
        } else {
            self.send_listener_op("remove_listener", topic_name, topic_method, callback_name, callback_method);
        }
    }

    fn send_listener_op(
        &self,
        op: &str,
        topic_name: &str,
        topic_method: &str,
        callback_name: &str,
        callback_method: &str,
    ) {
        self.send(
            topic_name,
            op,
            vec![json!(topic_method), json!(callback_name), json!(callback_method)],
        );
    }

    /// Registers a named recurring task; see [`TaskScheduler::add_task`].
    pub fn add_task(
        &self,
        name: &str,
        interval: Duration,
        delay: Duration,
        method: &str,
        data: Vec<Value>,
    ) -> Result<(), RuntimeError> {
        self.scheduler.add_task(name, interval, delay, method, data)
    }

    /// Registers a named one-shot task; see [`TaskScheduler::add_one_shot`].
    pub fn add_one_shot(
        &self,
        name: &str,
        delay: Duration,
        method: &str,
        data: Vec<Value>,
    ) -> Result<(), RuntimeError> {
        self.scheduler.add_one_shot(name, delay, method, data)
    }

    pub fn purge_task(&self, name: &str) {
        self.scheduler.purge_task(name);
    }

    pub fn purge_tasks(&self) {
        self.scheduler.purge_tasks();
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.scheduler.contains(name)
    }

    /// Resolves the actual instance name of one of this service's declared
    /// peers.
    pub fn peer_name(&self, peer_key: &str) -> Option<String> {
        self.node
            .composition()
            .actual_name(&format!("{}.{}", self.name(), peer_key))
    }

    /// Sends a fire-and-forget invocation to a declared peer by key.
    pub fn send_to_peer(&self, peer_key: &str, method: &str, data: Vec<Value>) {
        match self.peer_name(peer_key) {
            Some(name) => self.send(&name, method, data),
            None => warn!(
                owner = %self.identity,
                peer_key,
                "no reservation for peer, dropping send"
            ),
        }
    }
}
