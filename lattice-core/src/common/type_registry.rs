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

//! Service type metadata registry.
//!
//! Before a type name can appear in a peer declaration or a reservation,
//! the concrete model type must be registered here. Registration captures
//! the type's peer declarations, its declared method names (consumed by
//! wildcard subscription), and a factory closure the runtime uses to start
//! reserved peers by type name alone.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::common::{Node, ServiceHandle};
use crate::compose::PeerTemplate;
use crate::dispatch::DispatchCache;
use crate::message::RuntimeError;
use crate::traits::ServiceModel;

/// Factory closure starting an instance of a registered type by name.
type SpawnFn = Arc<
    dyn Fn(Node, String) -> Pin<Box<dyn Future<Output = anyhow::Result<ServiceHandle>> + Send>>
        + Send
        + Sync,
>;

/// Metadata captured for one registered service type.
pub struct ServiceTypeEntry {
    /// Stable type name.
    pub type_name: String,
    /// Statically declared peers.
    pub peers: Vec<PeerTemplate>,
    /// Declared method names, sorted.
    pub methods: Vec<String>,
    spawn: SpawnFn,
}

impl fmt::Debug for ServiceTypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTypeEntry")
            .field("type_name", &self.type_name)
            .field("peers", &self.peers.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Registry mapping type names to [`ServiceTypeEntry`].
#[derive(Default)]
pub struct TypeRegistry {
    entries: DashMap<String, ServiceTypeEntry>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("registered_types", &self.entries.len())
            .finish()
    }
}

impl TypeRegistry {
    /// Registers a model type, building (or reusing) its method table from
    /// the dispatch cache. Registration is idempotent.
    pub fn register<M: ServiceModel>(&self, cache: &DispatchCache) {
        if self.entries.contains_key(M::type_name()) {
            return;
        }
        trace!(type_name = M::type_name(), "registering service type");
        let methods = cache.table_for::<M>().method_names();
        let spawn: SpawnFn = Arc::new(|node: Node, name: String| {
            Box::pin(async move { node.spawn::<M>(name.as_str()).await })
        });
        self.entries.insert(
            M::type_name().to_string(),
            ServiceTypeEntry {
                type_name: M::type_name().to_string(),
                peers: M::peers(),
                methods,
                spawn,
            },
        );
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Declared peers of a type; `None` when the type is unregistered.
    pub fn peers_of(&self, type_name: &str) -> Option<Vec<PeerTemplate>> {
        self.entries.get(type_name).map(|e| e.peers.clone())
    }

    /// Declared method names of a type; empty when unregistered.
    pub fn methods_of(&self, type_name: &str) -> Vec<String> {
        self.entries
            .get(type_name)
            .map(|e| e.methods.clone())
            .unwrap_or_default()
    }

    /// Registered type names, unordered.
    pub fn type_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Starts an instance of a registered type through its factory.
    pub(crate) async fn spawn(
        &self,
        node: Node,
        type_name: &str,
        name: &str,
    ) -> anyhow::Result<ServiceHandle> {
        let spawn = self
            .entries
            .get(type_name)
            .map(|e| e.spawn.clone())
            .ok_or_else(|| RuntimeError::Composition {
                type_name: type_name.to_string(),
                detail: "type is not registered".to_string(),
            })?;
        spawn(node, name.to_string()).await
    }
}
