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

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::compose::PeerTemplate;
use crate::dispatch::MethodTable;

/// The static description of a service type: its state, its invocable
/// methods, and the peers it is composed of.
///
/// The model is the service's complete externally visible state — the
/// serialization bound is the "syncable fields" contract. Queues, tasks,
/// and other transient runtime machinery live in the managed wrapper, so a
/// snapshot round-trip can never disturb them.
pub trait ServiceModel:
    Default + Debug + Serialize + DeserializeOwned + Send + 'static
{
    /// Stable type name, used for reservations, metadata lookup, and
    /// persisted state files.
    fn type_name() -> &'static str;

    /// Registers the type's invocable methods; called once per process,
    /// when the dispatch cache first resolves this type.
    fn register_methods(table: &mut MethodTable<Self>);

    /// The statically declared peers this type is built from. Consumed only
    /// by the composition engine; the default is a leaf service.
    fn peers() -> Vec<PeerTemplate> {
        Vec::new()
    }
}
