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

#![forbid(unsafe_code)]

//! # Lattice
//!
//! Lattice is a service runtime for control systems, built on top of Tokio.
//! Many heterogeneous components — sensors, actuators, drivers, composite
//! behaviors — run concurrently as named services, addressable across
//! process boundaries, communicating exclusively through asynchronous
//! messages.
//!
//! ## Key Concepts
//!
//! - **Services (`ManagedService`)**: independently scheduled units wrapping
//!   a user-defined model, each with its own inbox and outbox.
//! - **Handles (`ServiceHandle`)**: external references for interacting with
//!   services (sending messages, stopping).
//! - **Messaging**: string-named method invocation with JSON arguments, so
//!   any service can address any other without compile-time coupling.
//! - **Publish/subscribe**: every method name is a topic; return values fan
//!   out to registered listeners in registration order.
//! - **Peers**: a service type declares the sub-services it is composed of;
//!   the node plans the whole tree in a process-wide reservation pool
//!   before anything starts, and operators can rename or re-bind peers
//!   without losing the default structure.
//! - **Node (`Node`)**: the process runtime: directory, type registry,
//!   dispatch cache, composition context, and gateways to other processes.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lattice::prelude::*;
//!
//! let node = Node::launch();
//! node.register_type::<Servo>();
//! let pan = node.spawn::<Servo>("pan").await?;
//! pan.send("move_to", vec![json!(90.0)])?;
//! ```

/// A prelude module for conveniently importing the most commonly used items.
pub mod prelude {
    pub use lattice_core::prelude::*;
}
