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

use std::marker::PhantomData;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{instrument, trace, warn};

use crate::common::{Node, Outbox, ServiceHandle};
use crate::message::{Identity, Message};
use crate::service::managed_service::{ManagedService, Running};
use crate::service::ServiceContext;
use crate::traits::ServiceModel;

/// Type-state marker for a service that has been created but whose runtime
/// loop is not yet processing messages. Hooks are configured in this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stopped;

impl<M: ServiceModel> ManagedService<Stopped, M> {
    #[instrument(skip(node))]
    pub(crate) fn create(node: Node, name: String) -> Self {
        let identity = Identity::new(name, node.process_id().to_string());
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (outbox, outbox_rx) = Outbox::new(identity.clone());
        let handle = ServiceHandle::new(
            identity.clone(),
            M::type_name().to_string(),
            inbox_tx.clone(),
            CancellationToken::new(),
            TaskTracker::new(),
            node.next_creation_index(),
            node.identity().clone(),
        );
        let ctx = ServiceContext::new(identity, node.clone(), outbox.clone(), inbox_tx);

        trace!(service = %handle.identity(), "created service");
        ManagedService::<Stopped, M> {
            handle,
            model: M::default(),
            node,
            inbox,
            outbox,
            outbox_rx: Some(outbox_rx),
            ctx,
            pre_routing: Box::new(|_, _| true),
            pre_process: Box::new(|_, _| true),
            before_start: Box::new(|_, _| {}),
            after_stop: Box::new(|_, _| {}),
            last_status: None,
            last_error: None,
            _state: PhantomData,
        }
    }

    /// Sets the pre-routing veto hook. Returning `false` discards the
    /// message before any routing decision is made.
    pub fn pre_routing<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut M, &Message) -> bool + Send + Sync + 'static,
    {
        self.pre_routing = Box::new(hook);
        self
    }

    /// Sets the pre-process veto hook. Returning `false` discards the
    /// message after routing but before dispatch.
    pub fn pre_process<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut M, &Message) -> bool + Send + Sync + 'static,
    {
        self.pre_process = Box::new(hook);
        self
    }

    /// Sets the hook run just before the loop begins.
    pub fn before_start<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut M, &ServiceContext) + Send + Sync + 'static,
    {
        self.before_start = Box::new(hook);
        self
    }

    /// Sets the hook run once the loop has finished.
    pub fn after_stop<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut M, &ServiceContext) + Send + Sync + 'static,
    {
        self.after_stop = Box::new(hook);
        self
    }

    /// Starts the service: registers it with the node, spawns the outbox
    /// delivery task and the runtime loop, then auto-starts its declared
    /// peers.
    ///
    /// Starting a name that is already registered is idempotent and
    /// returns the existing handle.
    #[instrument(skip(self), fields(service = %self.handle.identity()))]
    pub async fn start(mut self) -> anyhow::Result<ServiceHandle> {
        let name = self.handle.name().to_string();
        if let Some(existing) = self.node.resolve(&name) {
            warn!(service = %name, "already registered, returning existing handle");
            return Ok(existing);
        }

        (self.before_start)(&mut self.model, &self.ctx);
        self.node.register(self.handle.clone());

        let outbox_rx = self
            .outbox_rx
            .take()
            .expect("outbox delivery queue consumed twice");
        let tracker = self.handle.tracker().clone();
        tracker.spawn(Outbox::deliver_loop(
            outbox_rx,
            self.node.clone(),
            self.handle.identity().clone(),
            self.outbox.listener_map(),
        ));

        let node = self.node.clone();
        let handle = self.handle.clone();
        handle.set_running(true);
        let running: ManagedService<Running, M> = self.into();
        tracker.spawn(running.run());
        tracker.close();

        start_declared_peers::<M>(&node, &name).await;

        Ok(handle)
    }
}

/// Instantiates the auto-start peers a composite declared, from the
/// reservations planned when the composite was created. Peers that are
/// planned-only, already live, or fail to start never abort the composite.
async fn start_declared_peers<M: ServiceModel>(node: &Node, owner: &str) {
    for template in M::peers() {
        let full_key = format!("{owner}.{}", template.key);
        let Some(reservation) = node.composition().get(&full_key) else {
            warn!(key = %full_key, "declared peer has no reservation, skipping");
            continue;
        };
        if !reservation.auto_start {
            trace!(key = %full_key, "peer planned but not auto-started");
            continue;
        }
        let actual = reservation.resolved_name().to_string();
        if node.resolve(&actual).is_some() {
            trace!(peer = %actual, "peer already live, leaving untouched");
            continue;
        }
        let type_name = reservation
            .type_name
            .clone()
            .unwrap_or_else(|| template.type_name.clone());
        if let Err(e) = node.spawn_reserved(&type_name, &actual).await {
            warn!(peer = %actual, error = %e, "could not start peer");
        }
    }
}
