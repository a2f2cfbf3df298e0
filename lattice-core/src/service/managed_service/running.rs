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

use std::path::PathBuf;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::common::CONFIG;
use crate::dispatch::MethodTable;
use crate::message::{ListenerBinding, Message, MessageStatus, RuntimeError, Status, StatusLevel};
use crate::service::managed_service::ManagedService;
use crate::traits::ServiceModel;

/// Type-state marker for a service whose runtime loop is processing
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Running;

impl<M: ServiceModel> ManagedService<Running, M> {
    /// The runtime loop. One iteration takes a message from the inbox,
    /// runs the veto hooks, relays messages addressed elsewhere, and
    /// dispatches the rest against the model. The loop only ends on
    /// cancellation or when the inbox closes; dispatch failures become
    /// status broadcasts, never loop exits.
    #[instrument(skip(self), fields(service = %self.handle.identity()))]
    pub(crate) async fn run(mut self) {
        let table = self.node.dispatch().table_for::<M>();
        let cancel = self.handle.cancel_token();
        trace!("service loop started");

        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => {
                    trace!("cancellation requested");
                    break;
                }
                incoming = self.inbox.recv() => match incoming {
                    Some(msg) => msg,
                    None => break,
                },
            };

            if !(self.pre_routing)(&mut self.model, &msg) {
                trace!(method = %msg.method, "vetoed by pre_routing");
                continue;
            }

            // Messages for another unit in this process are relayed, not
            // processed; the sender does not need to know the topology.
            if !msg.dest_name().is_empty() && msg.dest_name() != self.ctx.name() {
                trace!(destination = msg.dest_name(), "relaying mis-routed message");
                self.outbox.add(msg);
                continue;
            }

            if !(self.pre_process)(&mut self.model, &msg) {
                trace!(method = %msg.method, "vetoed by pre_process");
                continue;
            }

            self.process(&table, msg).await;
        }

        trace!("service loop finished");
        self.handle.set_running(false);
        self.fail_queued_blocking();
        self.ctx.purge_tasks();
        (self.after_stop)(&mut self.model, &self.ctx);
        self.node.unregister(self.ctx.name());
    }

    /// Dispatches one message and deals with its results: the return value
    /// is published on the method's topic, blocking requests get their
    /// reply, and errors become status broadcasts.
    async fn process(&mut self, table: &MethodTable<M>, msg: Message) {
        trace!(method = %msg.method, args = msg.data.len(), "dispatching");
        let result = match self.builtin(&msg) {
            Some(result) => result,
            None => match table.resolve(&msg.method, msg.data.len()) {
                Ok(handler) => handler(&mut self.model, &self.ctx, &msg.data).await,
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(value) => {
                self.outbox.add(Message::oneway(
                    self.ctx.identity().clone(),
                    self.ctx.name().to_string(),
                    msg.method.clone(),
                    vec![value.clone()],
                ));
                if msg.status == MessageStatus::Blocking {
                    self.outbox.add(Message::reply(
                        self.ctx.identity().clone(),
                        &msg.sender,
                        msg.method,
                        value,
                        msg.msg_id,
                    ));
                }
            }
            Err(e) => {
                self.broadcast_status(Status::error(e.to_string()));
                if msg.status == MessageStatus::Blocking {
                    // The caller still gets its reply; failure reads as null.
                    self.outbox.add(Message::reply(
                        self.ctx.identity().clone(),
                        &msg.sender,
                        msg.method,
                        Value::Null,
                        msg.msg_id,
                    ));
                }
            }
        }
    }

    /// Framework-level methods every service understands, resolved before
    /// the type's own table.
    fn builtin(&mut self, msg: &Message) -> Option<Result<Value, RuntimeError>> {
        match (msg.method.as_str(), msg.data.len()) {
            ("add_listener", 3) => Some(self.listener_from(&msg.method, &msg.data).map(|b| {
                self.outbox.add_listener(b);
                Value::Null
            })),
            ("remove_listener", 3) => Some(self.listener_from(&msg.method, &msg.data).map(|b| {
                self.outbox.remove_listener(&b);
                Value::Null
            })),
            ("publish_state", 0) => {
                Some(Ok(serde_json::to_value(&self.model).unwrap_or(Value::Null)))
            }
            ("get_last_error", 0) => Some(Ok(self
                .last_error
                .as_ref()
                .and_then(|s| serde_json::to_value(s).ok())
                .unwrap_or(Value::Null))),
            ("clear_last_error", 0) => {
                let previous = self
                    .last_error
                    .take()
                    .and_then(|s| serde_json::to_value(s).ok())
                    .unwrap_or(Value::Null);
                Some(Ok(previous))
            }
            ("save", 0 | 1) => Some(Ok(Value::Bool(self.save_model(msg.data.first())))),
            ("load", 0 | 1) => Some(Ok(Value::Bool(self.load_model(msg.data.first())))),
            _ => None,
        }
    }

    fn listener_from(&self, method: &str, data: &[Value]) -> Result<ListenerBinding, RuntimeError> {
        let topic = data.first().and_then(Value::as_str);
        let name = data.get(1).and_then(Value::as_str);
        let callback = data.get(2).and_then(Value::as_str);
        match (topic, name, callback) {
            (Some(topic), Some(name), Some(callback)) => Ok(ListenerBinding::new(
                topic.to_string(),
                name.to_string(),
                callback.to_string(),
            )),
            _ => Err(RuntimeError::Dispatch {
                type_name: M::type_name().to_string(),
                method: method.to_string(),
                arity: data.len(),
            }),
        }
    }

    /// Converts a failure into a status broadcast on the status topic.
    ///
    /// Broadcasts are rate limited: an identical report within the
    /// configured window is suppressed. The status is always logged, even
    /// when nobody subscribed.
    pub(crate) fn broadcast_status(&mut self, mut status: Status) {
        if status.name.is_none() {
            status.name = Some(self.ctx.name().to_string());
        }

        let now = Instant::now();
        if let Some((last, at)) = &self.last_status {
            if last.same_report(&status)
                && now.duration_since(*at) < CONFIG.status_broadcast_limit()
            {
                trace!(%status, "suppressing duplicate status");
                return;
            }
        }

        match status.level {
            StatusLevel::Error => error!("{status}"),
            StatusLevel::Warn => warn!("{status}"),
            StatusLevel::Info => info!("{status}"),
        }

        let payload = serde_json::to_value(&status).unwrap_or(Value::Null);
        self.ctx.publish("publish_status", vec![payload.clone()]);
        if status.is_error() {
            self.ctx.publish("publish_error", vec![payload]);
            self.last_error = Some(status.clone());
        }
        self.last_status = Some((status, now));
    }

    /// Answers every blocking request still queued in the inbox with a
    /// null reply, so callers of a stopping service fail fast instead of
    /// hanging until their deadline.
    fn fail_queued_blocking(&mut self) {
        while let Ok(msg) = self.inbox.try_recv() {
            if msg.status == MessageStatus::Blocking {
                debug!(method = %msg.method, "failing queued blocking call on stop");
                self.outbox.add(Message::reply(
                    self.ctx.identity().clone(),
                    &msg.sender,
                    msg.method,
                    Value::Null,
                    msg.msg_id,
                ));
            }
        }
    }

    fn state_path(&self, arg: Option<&Value>) -> PathBuf {
        arg.and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(|| CONFIG.state_file(M::type_name(), self.ctx.name()))
    }

    /// Persists the model document. Transient runtime state lives outside
    /// the model, so a snapshot can never capture queues or tasks.
    fn save_model(&self, path_arg: Option<&Value>) -> bool {
        let path = self.state_path(path_arg);
        let json = match serde_json::to_string_pretty(&self.model) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "could not serialize state");
                return false;
            }
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!(path = %path.display(), error = %e, "could not create state directory");
                return false;
            }
        }
        match std::fs::write(&path, json) {
            Ok(()) => {
                debug!(path = %path.display(), "state saved");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "save failed");
                false
            }
        }
    }

    /// Restores the model document and re-publishes the loaded state.
    fn load_model(&mut self, path_arg: Option<&Value>) -> bool {
        let path = self.state_path(path_arg);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                info!(path = %path.display(), error = %e, "no state to load");
                return false;
            }
        };
        match serde_json::from_str::<M>(&raw) {
            Ok(model) => {
                self.model = model;
                let state = serde_json::to_value(&self.model).unwrap_or(Value::Null);
                self.ctx.publish("publish_state", vec![state]);
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "load failed");
                false
            }
        }
    }
}
