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

//! Defines common internal type aliases used within `lattice-core`.
//!
//! This module centralizes type definitions for channels, hook closures, and
//! other implementation details to improve code readability.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::message::{ListenerBinding, Message};
use crate::service::ServiceContext;

/// Crate-internal: producer half of a service queue (inbox or outbox).
pub(crate) type MessageSender = UnboundedSender<Message>;

/// Crate-internal: consumer half of a service queue.
pub(crate) type MessageReceiver = UnboundedReceiver<Message>;

/// Crate-internal: the subscription registry held by an outbox, keyed by
/// topic method; vector order is registration order and therefore fan-out
/// order.
pub(crate) type ListenerMap = Arc<DashMap<String, Vec<ListenerBinding>>>;

/// Crate-internal: a message veto hook (`pre_routing` / `pre_process`).
/// Returning `false` discards the message.
pub(crate) type MessageHook<M> = Box<dyn Fn(&mut M, &Message) -> bool + Send + Sync + 'static>;

/// Crate-internal: a lifecycle hook run around the service loop.
pub(crate) type LifecycleHook<M> =
    Box<dyn Fn(&mut M, &ServiceContext) + Send + Sync + 'static>;
