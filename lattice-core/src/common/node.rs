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

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, instrument, trace, warn};
use wildmatch::WildMatch;

use crate::common::{ServiceHandle, TypeRegistry, CONFIG};
use crate::compose::CompositionContext;
use crate::dispatch::DispatchCache;
use crate::message::{Identity, Message, RuntimeError};
use crate::service::{ManagedService, Stopped};
use crate::traits::{Gateway, ServiceModel};

/// The process-level runtime: directory, factory, and shared planning state
/// for every service hosted by this process.
///
/// A `Node` is cheap to clone; all clones share the same inner state. The
/// composition context and dispatch cache are the only resources shared
/// across services, and both support concurrent merge-or-insert access from
/// many construction paths.
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

pub(crate) struct NodeInner {
    identity: Identity,
    registry: DashMap<String, ServiceHandle>,
    types: TypeRegistry,
    dispatch: DispatchCache,
    composition: CompositionContext,
    pending: DashMap<u64, oneshot::Sender<Value>>,
    gateways: DashMap<String, Arc<dyn Gateway>>,
    msg_id: AtomicU64,
    creation_order: AtomicUsize,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("process_id", &self.0.identity.process_id)
            .field("services", &self.0.registry.len())
            .field("pending_calls", &self.0.pending.len())
            .finish()
    }
}

impl Node {
    /// Launches the process runtime with the configured (or derived)
    /// process id.
    pub fn launch() -> Self {
        let process_id = CONFIG.process_id();
        debug!(process_id, "launching node");
        Node(Arc::new(NodeInner {
            identity: Identity::new("node".to_string(), process_id),
            registry: DashMap::new(),
            types: TypeRegistry::default(),
            dispatch: DispatchCache::default(),
            composition: CompositionContext::default(),
            pending: DashMap::new(),
            gateways: DashMap::new(),
            msg_id: AtomicU64::new(1),
            creation_order: AtomicUsize::new(0),
        }))
    }

    /// Id of this process; services with another process id are remote.
    pub fn process_id(&self) -> &str {
        &self.0.identity.process_id
    }

    pub(crate) fn identity(&self) -> &Identity {
        &self.0.identity
    }

    /// Registers a model type with the type registry and dispatch cache.
    pub fn register_type<M: ServiceModel>(&self) {
        self.0.types.register::<M>(&self.0.dispatch);
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.0.types
    }

    pub fn dispatch(&self) -> &DispatchCache {
        &self.0.dispatch
    }

    /// The process-wide composition context (reservation pool).
    pub fn composition(&self) -> &CompositionContext {
        &self.0.composition
    }

    /// A process-unique correlation id.
    pub fn unique_msg_id(&self) -> u64 {
        self.0.msg_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_creation_index(&self) -> usize {
        self.0.creation_order.fetch_add(1, Ordering::Relaxed)
    }

    /// Resolves a service name to its handle.
    pub fn resolve(&self, name: &str) -> Option<ServiceHandle> {
        self.0.registry.get(name).map(|h| h.clone())
    }

    /// Names of registered services matching a `*` pattern, sorted.
    pub fn list_names(&self, pattern: &str) -> Vec<String> {
        let matcher = WildMatch::new(pattern);
        let mut names: Vec<String> = self
            .0
            .registry
            .iter()
            .filter(|entry| matcher.matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Declared method names of a registered service, by service name.
    pub fn methods_of(&self, service_name: &str) -> Vec<String> {
        self.resolve(service_name)
            .map(|handle| self.0.types.methods_of(handle.type_name()))
            .unwrap_or_default()
    }

    pub fn service_count(&self) -> usize {
        self.0.registry.len()
    }

    pub(crate) fn register(&self, handle: ServiceHandle) {
        trace!(service = %handle.identity(), "registering service");
        self.0.registry.insert(handle.name().to_string(), handle);
    }

    pub fn unregister(&self, name: &str) -> bool {
        trace!(service = name, "unregistering service");
        self.0.registry.remove(name).is_some()
    }

    /// Registers a gateway carrying traffic for a remote process id.
    pub fn register_gateway(&self, process_id: &str, gateway: Arc<dyn Gateway>) {
        self.0.gateways.insert(process_id.to_string(), gateway);
    }

    /// The gateway responsible for a remote process, when one is attached.
    pub fn gateway_for(&self, process_id: &str) -> Option<Arc<dyn Gateway>> {
        self.0.gateways.get(process_id).map(|g| g.clone())
    }

    /// Creates a service in the [`Stopped`] state.
    ///
    /// Planning happens here, before instantiation: the type's declared
    /// peer tree is merged into the reservation pool under the requested
    /// name, and the name itself is exchanged for its reserved actual name
    /// when an operator has customized it.
    pub fn new_service<M: ServiceModel>(&self, name: &str) -> ManagedService<Stopped, M> {
        self.register_type::<M>();
        self.0.composition.merge_tree(name, M::type_name(), &self.0.types);
        let actual = self
            .0
            .composition
            .actual_name(name)
            .unwrap_or_else(|| name.to_string());
        if actual != name {
            debug!(reserved = name, actual, "exchanging reserved name for actual name");
        }
        ManagedService::create(self.clone(), actual)
    }

    /// Creates and starts a service, returning its handle.
    pub async fn spawn<M: ServiceModel>(&self, name: &str) -> anyhow::Result<ServiceHandle> {
        self.new_service::<M>(name).start().await
    }

    /// Starts a planned reservation through the type factory.
    pub(crate) async fn spawn_reserved(
        &self,
        type_name: &str,
        name: &str,
    ) -> anyhow::Result<ServiceHandle> {
        self.0.types.spawn(self.clone(), type_name, name).await
    }

    /// Sends a fire-and-forget invocation to a service by name (local or
    /// `name@process`).
    pub async fn send(
        &self,
        destination: &str,
        method: &str,
        data: Vec<Value>,
    ) -> Result<(), RuntimeError> {
        let msg = Message::oneway(self.0.identity.clone(), destination, method, data);
        self.route(msg).await
    }

    /// Performs a blocking call and waits for the reply.
    ///
    /// `timeout` defaults to the configured deadline. On expiry the waiter
    /// is withdrawn and a [`RuntimeError::RemoteTimeout`] is returned; the
    /// callee is unaffected and its late reply, if any, is dropped.
    pub async fn send_blocking(
        &self,
        destination: &str,
        method: &str,
        data: Vec<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, RuntimeError> {
        self.send_blocking_from(self.0.identity.clone(), destination, method, data, timeout)
            .await
    }

    #[instrument(skip(self, sender, data), fields(sender = %sender))]
    pub(crate) async fn send_blocking_from(
        &self,
        sender: Identity,
        destination: &str,
        method: &str,
        data: Vec<Value>,
        deadline: Option<Duration>,
    ) -> Result<Value, RuntimeError> {
        let deadline = deadline.unwrap_or_else(|| CONFIG.send_blocking_timeout());
        let msg_id = self.unique_msg_id();
        let msg = Message::blocking(sender, destination, method, data, msg_id);

        // Remote destinations block through the gateway directly.
        if let Some(process) = msg.dest_process() {
            if process != self.process_id() {
                let gateway = self.gateway_for(process).ok_or_else(|| {
                    RuntimeError::Routing {
                        destination: destination.to_string(),
                    }
                })?;
                return gateway.send_blocking_remote(msg, deadline).await;
            }
        }

        let handle = self
            .resolve(msg.dest_name())
            .ok_or_else(|| RuntimeError::Routing {
                destination: destination.to_string(),
            })?;

        let (tx, rx) = oneshot::channel();
        self.0.pending.insert(msg_id, tx);
        if let Err(e) = handle.accept(msg) {
            self.0.pending.remove(&msg_id);
            return Err(e);
        }

        match timeout(deadline, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(RuntimeError::Send("reply channel dropped".into())),
            Err(_) => {
                self.0.pending.remove(&msg_id);
                Err(RuntimeError::RemoteTimeout {
                    destination: destination.to_string(),
                    timeout: deadline,
                })
            }
        }
    }

    /// Completes the waiter for a reply, when one is still pending. A late
    /// reply with no waiter is dropped and reported as such.
    pub(crate) fn complete_pending(&self, msg: &Message) -> bool {
        match self.0.pending.remove(&msg.msg_id) {
            Some((_, tx)) => {
                let value = msg.data.first().cloned().unwrap_or(Value::Null);
                let _ = tx.send(value);
                true
            }
            None => {
                trace!(msg_id = msg.msg_id, "no pending waiter, dropping late reply");
                false
            }
        }
    }

    /// Routes a message to its destination: local inbox, or gateway when
    /// the destination lives in another process.
    pub(crate) async fn route(&self, msg: Message) -> Result<(), RuntimeError> {
        if let Some(process) = msg.dest_process() {
            if process != self.process_id() {
                return match self.gateway_for(process) {
                    Some(gateway) => gateway.send_remote(msg).await,
                    None => Err(RuntimeError::Routing {
                        destination: msg.name.clone(),
                    }),
                };
            }
        }
        match self.resolve(msg.dest_name()) {
            Some(handle) => handle.accept(msg),
            None => Err(RuntimeError::Routing {
                destination: msg.name.clone(),
            }),
        }
    }

    /// Stops every registered service and clears the directory.
    pub async fn shutdown_all(&self) -> anyhow::Result<()> {
        let handles: Vec<ServiceHandle> = self
            .0
            .registry
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let results = join_all(handles.iter().map(|handle| handle.stop())).await;
        for result in results {
            if let Err(e) = result {
                warn!(error = %e, "service did not stop cleanly");
            }
        }
        self.0.registry.clear();
        Ok(())
    }
}
