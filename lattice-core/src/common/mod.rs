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

pub use config::LatticeConfig;
pub(crate) use config::CONFIG;
pub use node::Node;
pub use outbox::Outbox;
pub use service_handle::ServiceHandle;
pub use type_registry::{ServiceTypeEntry, TypeRegistry};
pub(crate) use types::*;

mod config;
mod node;
mod outbox;
mod service_handle;
mod type_registry;
mod types;
