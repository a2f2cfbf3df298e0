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

//! Name-based method dispatch.
//!
//! Every service type registers its invocable methods once, into a
//! [`MethodTable`] keyed by `(method name, arity)`. Tables are memoized
//! process-wide in the [`DispatchCache`], so repeated dispatch against the
//! same type costs a single map lookup rather than re-resolution.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{trace, warn};

use crate::message::RuntimeError;
use crate::service::ServiceContext;
use crate::traits::ServiceModel;

/// Arity wildcard: an entry registered under `VARIADIC` accepts any argument
/// count for which no exact-arity entry exists.
pub const VARIADIC: usize = usize::MAX;

/// A pinned, boxed future resolving to a dispatch result. This is the
/// return type of every method handler; synchronous handlers are wrapped
/// into an immediately ready future.
pub type MethodFuture = Pin<Box<dyn Future<Output = Result<Value, RuntimeError>> + Send + 'static>>;

/// An invocable method target: synchronous access to the service model and
/// context, followed by an owned future for any asynchronous tail work.
pub type MethodFn<M> =
    Box<dyn Fn(&mut M, &ServiceContext, &[Value]) -> MethodFuture + Send + Sync + 'static>;

/// Per-type registration table mapping `(method name, arity)` to an
/// invocable target.
///
/// The table entry *is* the memo required by the dispatch contract: once
/// built, resolving `(name, arity)` is a hash lookup, and an exact arity
/// match always wins over a [`VARIADIC`] entry (most specific first).
pub struct MethodTable<M> {
    type_name: &'static str,
    entries: HashMap<(String, usize), MethodFn<M>>,
    names: BTreeSet<String>,
}

impl<M> fmt::Debug for MethodTable<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("type_name", &self.type_name)
            .field("methods", &self.entries.len())
            .finish()
    }
}

impl<M> MethodTable<M> {
    pub(crate) fn with_type_name(type_name: &'static str) -> Self {
        MethodTable {
            type_name,
            entries: HashMap::new(),
            names: BTreeSet::new(),
        }
    }

    /// Registers a synchronous method handler.
    pub fn on<F>(&mut self, name: &str, arity: usize, handler: F) -> &mut Self
    where
        F: Fn(&mut M, &ServiceContext, &[Value]) -> Result<Value, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.on_async(name, arity, move |model, ctx, args| {
            Box::pin(std::future::ready(handler(model, ctx, args)))
        })
    }

    /// Registers a method handler with an asynchronous tail.
    ///
    /// The handler's synchronous part runs with exclusive access to the
    /// model; the returned future must own everything it needs (clone the
    /// context into it), mirroring how the runtime loop awaits it without
    /// holding the model borrow.
    pub fn on_async<F>(&mut self, name: &str, arity: usize, handler: F) -> &mut Self
    where
        F: Fn(&mut M, &ServiceContext, &[Value]) -> MethodFuture + Send + Sync + 'static,
    {
        trace!(type_name = self.type_name, method = name, arity, "registering method");
        if self
            .entries
            .insert((name.to_string(), arity), Box::new(handler))
            .is_some()
        {
            warn!(type_name = self.type_name, method = name, arity, "method redefined");
        }
        self.names.insert(name.to_string());
        self
    }

    /// Resolves a method by name and argument count.
    pub fn resolve(&self, method: &str, arity: usize) -> Result<&MethodFn<M>, RuntimeError> {
        self.entries
            .get(&(method.to_string(), arity))
            .or_else(|| self.entries.get(&(method.to_string(), VARIADIC)))
            .ok_or_else(|| RuntimeError::Dispatch {
                type_name: self.type_name.to_string(),
                method: method.to_string(),
                arity,
            })
    }

    /// True when a method of this name is declared under any arity.
    pub fn contains(&self, method: &str) -> bool {
        self.names.contains(method)
    }

    /// Declared method names, sorted; wildcard subscription expands over
    /// this set.
    pub fn method_names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl<M: ServiceModel> MethodTable<M> {
    pub(crate) fn build() -> Self {
        let mut table = MethodTable::with_type_name(M::type_name());
        M::register_methods(&mut table);
        table
    }
}

/// Process-wide cache of method tables, keyed by the concrete model type.
///
/// Safe for concurrent resolution from many services' construction paths;
/// the first resolver of a type builds its table, every later one shares it.
#[derive(Default)]
pub struct DispatchCache {
    tables: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for DispatchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchCache")
            .field("types", &self.tables.len())
            .finish()
    }
}

impl DispatchCache {
    /// Returns the memoized method table for `M`, building it on first use.
    pub fn table_for<M: ServiceModel>(&self) -> Arc<MethodTable<M>> {
        let entry = self
            .tables
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Arc::new(MethodTable::<M>::build()) as Arc<dyn Any + Send + Sync>);
        entry
            .value()
            .clone()
            .downcast::<MethodTable<M>>()
            .expect("dispatch cache entry keyed by the wrong type")
    }

    /// Number of cached types.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Dial {
        value: f64,
    }

    impl ServiceModel for Dial {
        fn type_name() -> &'static str {
            "dial"
        }

        fn register_methods(table: &mut MethodTable<Self>) {
            table
                .on("set", 1, |model, _ctx, args| {
                    model.value = args[0].as_f64().unwrap_or_default();
                    Ok(Value::Null)
                })
                .on("get", 0, |model, _ctx, _args| Ok(json!(model.value)))
                .on("log", VARIADIC, |_model, _ctx, args| Ok(json!(args.len())));
        }
    }

    #[test]
    fn test_resolve_by_name_and_arity() {
        let table = MethodTable::<Dial>::build();
        assert!(table.resolve("set", 1).is_ok());
        assert!(table.resolve("get", 0).is_ok());
        assert!(matches!(
            table.resolve("get", 2),
            Err(RuntimeError::Dispatch { .. })
        ));
        assert!(matches!(
            table.resolve("missing", 0),
            Err(RuntimeError::Dispatch { .. })
        ));
    }

    #[test]
    fn test_variadic_fallback() {
        let table = MethodTable::<Dial>::build();
        // No exact entry for ("log", 3); the variadic entry matches.
        assert!(table.resolve("log", 3).is_ok());
    }

    #[test]
    fn test_cache_memoizes_tables() {
        let cache = DispatchCache::default();
        let first = cache.table_for::<Dial>();
        let second = cache.table_for::<Dial>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_method_names_sorted() {
        let table = MethodTable::<Dial>::build();
        assert_eq!(table.method_names(), vec!["get", "log", "set"]);
    }
}
